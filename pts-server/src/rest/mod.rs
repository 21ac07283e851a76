pub mod controllers;

pub use controllers::{EstimateController, IssueController, ProjectController};

use crate::ServerConfig;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, patch, post},
};
use controllers::{estimates, issues, projects};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Build CORS layer based on security configuration
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.security.allowed_origins.is_empty() {
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> =
            config.security.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

/// Build the `/api` router with the middleware stack applied.
pub fn create_app(config: ServerConfig) -> Router {
    let expose = config.security.expose_error_details;
    let estimate_controller = EstimateController::new(config.estimate_service.clone(), expose);
    let project_controller = ProjectController::new(config.project_store.clone(), expose);
    let issue_controller = IssueController::new(config.issue_store.clone(), expose);

    let project_path = "/workspaces/{slug}/projects/{project_id}";

    let api_router = Router::new()
        .route("/health", get(health_check))
        .route("/workspaces/", post(projects::create_workspace))
        .route("/workspaces/{slug}/projects/", post(projects::create_project))
        .route(
            &format!("{project_path}/"),
            get(projects::get_project).patch(projects::update_project),
        )
        .with_state(project_controller)
        .route(&format!("{project_path}/estimate-points/"), get(estimates::list_estimate_points))
        .route(
            &format!("{project_path}/estimates/"),
            get(estimates::list_estimates).post(estimates::create_estimate),
        )
        .route(
            &format!("{project_path}/estimates/{{estimate_id}}/"),
            get(estimates::get_estimate)
                .patch(estimates::update_estimate)
                .delete(estimates::delete_estimate),
        )
        .route(
            &format!("{project_path}/estimates/{{estimate_id}}/points/{{point_id}}/"),
            patch(estimates::delete_estimate_point),
        )
        .with_state(estimate_controller)
        .route(
            &format!("{project_path}/issues/"),
            get(issues::list_issues).post(issues::create_issue),
        )
        .route(&format!("{project_path}/issues/{{issue_id}}/"), get(issues::get_issue))
        .with_state(issue_controller);

    let cors_layer = build_cors_layer(&config);

    Router::new().nest("/api", api_router).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                axum::http::StatusCode::REQUEST_TIMEOUT,
                config.security.request_timeout,
            ))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(cors_layer)
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            )),
    )
}

async fn health_check() -> &'static str {
    "OK"
}
