//! Span helpers for estimate operations.

use tracing::Span;

/// Span around one estimate service call, tagged with the project it runs in.
///
/// # Example
/// ```
/// use pts_telemetry::estimate_operation_span;
/// let span = estimate_operation_span("estimate.delete_point", "acme", "4c1d", Some("7f0c"));
/// let _enter = span.enter();
/// ```
pub fn estimate_operation_span(
    operation: &'static str,
    workspace_slug: &str,
    project_id: &str,
    estimate_id: Option<&str>,
) -> Span {
    tracing::info_span!(
        "estimate.operation",
        operation = operation,
        estimate.id = estimate_id.unwrap_or(""),
        project.id = project_id,
        workspace.slug = workspace_slug,
        otel.kind = "internal"
    )
}

/// Span around a project or issue store call.
pub fn store_operation_span(operation: &'static str) -> Span {
    tracing::debug_span!("store.operation", operation = operation, otel.kind = "internal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::{Layer, Registry};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<HashMap<String, String>>>);

    impl Visit for Captured {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.lock().unwrap().insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            self.0.lock().unwrap().insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Captured {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            attrs.record(&mut self.clone());
        }
    }

    #[test]
    fn test_estimate_span_carries_project() {
        let captured = Captured::default();
        let subscriber = Registry::default().with(captured.clone());

        tracing::subscriber::with_default(subscriber, || {
            let _span = estimate_operation_span("estimate.update", "acme", "4c1d", Some("7f0c"));
        });

        let fields = captured.0.lock().unwrap();
        assert_eq!(fields.get("operation").map(String::as_str), Some("estimate.update"));
        assert_eq!(fields.get("workspace.slug").map(String::as_str), Some("acme"));
        assert_eq!(fields.get("project.id").map(String::as_str), Some("4c1d"));
        assert_eq!(fields.get("estimate.id").map(String::as_str), Some("7f0c"));
    }
}
