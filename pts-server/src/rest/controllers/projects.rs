use crate::error::ApiError;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use pts_core::{Project, ProjectRef, PtsError, Workspace};
use pts_estimate::{CreateProjectRequest, CreateWorkspaceRequest, ProjectStore};
use pts_telemetry::store_operation_span;
use serde::Deserialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectController {
    project_store: Arc<dyn ProjectStore>,
    expose_error_details: bool,
}

impl ProjectController {
    pub fn new(project_store: Arc<dyn ProjectStore>, expose_error_details: bool) -> Self {
        Self { project_store, expose_error_details }
    }

    fn error(&self, error: PtsError) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

#[derive(Deserialize)]
pub struct CreateWorkspaceBody {
    pub slug: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: String,
    pub identifier: String,
}

/// `{"estimate": null}` or a missing field clears the active estimate.
#[derive(Deserialize)]
pub struct UpdateProjectBody {
    #[serde(default)]
    pub estimate: Option<Uuid>,
}

fn require(field: &str, value: &str) -> Result<(), PtsError> {
    if value.trim().is_empty() {
        return Err(PtsError::BadRequest(format!("{field} may not be blank")));
    }
    Ok(())
}

pub async fn create_workspace(
    State(controller): State<ProjectController>,
    body: Result<Json<CreateWorkspaceBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Workspace>), ApiError> {
    let Json(body) = body?;
    require("slug", &body.slug).map_err(|e| controller.error(e))?;
    require("name", &body.name).map_err(|e| controller.error(e))?;

    let workspace = controller
        .project_store
        .create_workspace(CreateWorkspaceRequest { slug: body.slug, name: body.name })
        .instrument(store_operation_span("workspace.create"))
        .await
        .map_err(|e| controller.error(e))?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn create_project(
    State(controller): State<ProjectController>,
    Path(slug): Path<String>,
    body: Result<Json<CreateProjectBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let Json(body) = body?;
    require("name", &body.name).map_err(|e| controller.error(e))?;
    require("identifier", &body.identifier).map_err(|e| controller.error(e))?;

    let project = controller
        .project_store
        .create_project(CreateProjectRequest {
            workspace_slug: slug,
            name: body.name,
            identifier: body.identifier,
        })
        .instrument(store_operation_span("project.create"))
        .await
        .map_err(|e| controller.error(e))?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(controller): State<ProjectController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
) -> Result<Json<Project>, ApiError> {
    controller
        .project_store
        .get_project(ProjectRef::new(slug, project_id))
        .instrument(store_operation_span("project.get"))
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}

pub async fn update_project(
    State(controller): State<ProjectController>,
    Path((slug, project_id)): Path<(String, Uuid)>,
    body: Result<Json<UpdateProjectBody>, JsonRejection>,
) -> Result<Json<Project>, ApiError> {
    let Json(body) = body?;
    controller
        .project_store
        .set_active_estimate(ProjectRef::new(slug, project_id), body.estimate)
        .instrument(store_operation_span("project.set_active_estimate"))
        .await
        .map(Json)
        .map_err(|e| controller.error(e))
}
