use crate::error::ApiError;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use pts_core::{Estimate, EstimatePoint, ProjectRef, PtsError};
use pts_estimate::{
    CreateRequest, DeletePointRequest, DeleteRequest, EstimateService, GetRequest, ListRequest,
    UpdateRequest, validation,
};
use pts_telemetry::estimate_operation_span;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, Span};
use uuid::Uuid;

#[derive(Clone)]
pub struct EstimateController {
    estimate_service: Arc<dyn EstimateService>,
    expose_error_details: bool,
}

impl EstimateController {
    pub fn new(estimate_service: Arc<dyn EstimateService>, expose_error_details: bool) -> Self {
        Self { estimate_service, expose_error_details }
    }

    fn error(&self, error: PtsError) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

#[derive(Serialize, Deserialize)]
pub struct CreateEstimateResponse {
    pub estimate: Estimate,
    pub estimate_points: Vec<EstimatePoint>,
}

#[derive(Serialize, Deserialize)]
pub struct EstimatePointsResponse {
    pub estimate_points: Vec<EstimatePoint>,
}

fn operation_span(
    operation: &'static str,
    project: &ProjectRef,
    estimate_id: Option<Uuid>,
) -> Span {
    let estimate_id = estimate_id.map(|id| id.to_string());
    estimate_operation_span(
        operation,
        &project.workspace_slug,
        &project.project_id.to_string(),
        estimate_id.as_deref(),
    )
}

pub async fn list_estimate_points(
    State(controller): State<EstimateController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<EstimatePoint>>, ApiError> {
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.list_points", &project, None);
    controller
        .estimate_service
        .list_points(ListRequest { project })
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

pub async fn list_estimates(
    State(controller): State<EstimateController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Estimate>>, ApiError> {
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.list", &project, None);
    controller
        .estimate_service
        .list(ListRequest { project })
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

/// Takes the raw body so point errors can be reported per item.
pub async fn create_estimate(
    State(controller): State<EstimateController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateEstimateResponse>, ApiError> {
    let Json(body) = body?;
    let points =
        validation::parse_points(body.get("estimate_points")).map_err(|e| controller.error(e))?;
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.create", &project, None);

    let estimate = controller
        .estimate_service
        .create(CreateRequest { project, points })
        .instrument(span)
        .await
        .map_err(|e| controller.error(e))?;

    Ok(Json(CreateEstimateResponse { estimate_points: estimate.points.clone(), estimate }))
}

pub async fn get_estimate(
    State(controller): State<EstimateController>,
    Path((slug, project_id, estimate_id)): Path<(String, Uuid, Uuid)>,
) -> Result<Json<Estimate>, ApiError> {
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.get", &project, Some(estimate_id));
    controller
        .estimate_service
        .get(GetRequest { project, estimate_id })
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

pub async fn update_estimate(
    State(controller): State<EstimateController>,
    Path((slug, project_id, estimate_id)): Path<(String, Uuid, Uuid)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<EstimatePointsResponse>, ApiError> {
    let Json(body) = body?;
    let points =
        validation::parse_updates(body.get("estimate_points")).map_err(|e| controller.error(e))?;
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.update", &project, Some(estimate_id));

    let estimate_points = controller
        .estimate_service
        .update(UpdateRequest { project, estimate_id, points })
        .instrument(span)
        .await
        .map_err(|e| controller.error(e))?;

    Ok(Json(EstimatePointsResponse { estimate_points }))
}

pub async fn delete_estimate(
    State(controller): State<EstimateController>,
    Path((slug, project_id, estimate_id)): Path<(String, Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.delete", &project, Some(estimate_id));
    controller
        .estimate_service
        .delete(DeleteRequest { project, estimate_id })
        .instrument(span)
        .await
        .map_err(|e| controller.error(e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Removes one point and closes the key gap. The body is optional, so it is
/// read raw: an empty body means no replacement point.
pub async fn delete_estimate_point(
    State(controller): State<EstimateController>,
    Path((slug, project_id, estimate_id, point_id)): Path<(String, Uuid, Uuid, Uuid)>,
    body: Bytes,
) -> Result<Json<Vec<EstimatePoint>>, ApiError> {
    let new_estimate_point_id = replacement_from(&body).map_err(|e| controller.error(e))?;
    let project = ProjectRef::new(slug, project_id);
    let span = operation_span("estimate.delete_point", &project, Some(estimate_id));

    controller
        .estimate_service
        .delete_point(DeletePointRequest { project, estimate_id, point_id, new_estimate_point_id })
        .instrument(span)
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

fn replacement_from(body: &[u8]) -> Result<Option<Uuid>, PtsError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let body: Value = serde_json::from_slice(body).map_err(|e| {
        PtsError::BadRequest(format!("Failed to parse the request body as JSON: {e}"))
    })?;
    validation::parse_replacement(&body)
}
