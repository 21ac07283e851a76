//! # pts-telemetry
//!
//! Structured logging and distributed tracing for Pointscale.
//!
//! - `tracing` subscriber with `RUST_LOG` filtering, text or JSON output
//! - optional OTLP span export through OpenTelemetry
//! - span helpers for estimate operations
//!
//! ```rust
//! use pts_telemetry::{LogFormat, init_telemetry};
//!
//! init_telemetry("pointscale", LogFormat::Text).expect("telemetry");
//! let span = pts_telemetry::estimate_operation_span("estimate.list", "acme", "4c1d", None);
//! let _enter = span.enter();
//! ```

pub mod init;
pub mod spans;

pub use tracing::{Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{LogFormat, TelemetryError, init_telemetry, init_with_otlp, shutdown_telemetry};
