use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use pts_core::{Issue, ProjectRef, PtsError};
use pts_estimate::{CreateIssueRequest, IssueStore};
use pts_telemetry::store_operation_span;
use serde::Deserialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct IssueController {
    issue_store: Arc<dyn IssueStore>,
    expose_error_details: bool,
}

impl IssueController {
    pub fn new(issue_store: Arc<dyn IssueStore>, expose_error_details: bool) -> Self {
        Self { issue_store, expose_error_details }
    }

    fn error(&self, error: PtsError) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

#[derive(Deserialize)]
pub struct CreateIssueBody {
    pub name: String,
    #[serde(default)]
    pub estimate_point: Option<Uuid>,
}

pub async fn list_issues(
    State(controller): State<IssueController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Issue>>, ApiError> {
    controller
        .issue_store
        .list_issues(ProjectRef::new(slug, project_id))
        .instrument(store_operation_span("issue.list"))
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

pub async fn create_issue(
    State(controller): State<IssueController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
    body: Result<Json<CreateIssueBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    let Json(body) = body?;
    if body.name.trim().is_empty() {
        return Err(controller.error(PtsError::BadRequest("name may not be blank".into())));
    }

    let issue = controller
        .issue_store
        .create_issue(CreateIssueRequest {
            project: ProjectRef::new(slug, project_id),
            name: body.name,
            estimate_point_ref: body.estimate_point,
        })
        .instrument(store_operation_span("issue.create"))
        .await
        .map_err(|e| controller.error(e))?;

    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn get_issue(
    State(controller): State<IssueController>,
    Path((slug, project_id, issue_id)): Path<(String, Uuid, Uuid)>,
) -> Result<Json<Issue>, ApiError> {
    controller
        .issue_store
        .get_issue(ProjectRef::new(slug, project_id), issue_id)
        .instrument(store_operation_span("issue.get"))
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}
