use async_trait::async_trait;
use pts_core::{
    Estimate, EstimatePoint, Issue, NewEstimatePoint, Project, ProjectRef, Result, Workspace,
};
use uuid::Uuid;

/// Points are written to storage in groups of this size.
pub const BATCH_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct ListRequest {
    pub project: ProjectRef,
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub project: ProjectRef,
    pub points: Vec<NewEstimatePoint>,
}

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub project: ProjectRef,
    pub estimate_id: Uuid,
}

/// New label for an existing point. `None` keeps the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointValueUpdate {
    pub id: Uuid,
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub project: ProjectRef,
    pub estimate_id: Uuid,
    pub points: Vec<PointValueUpdate>,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub project: ProjectRef,
    pub estimate_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct DeletePointRequest {
    pub project: ProjectRef,
    pub estimate_id: Uuid,
    pub point_id: Uuid,
    /// Point that issues assigned to `point_id` move to.
    pub new_estimate_point_id: Option<Uuid>,
}

/// CRUD over a project's estimate scales.
///
/// Conflict policy: on `create`, a point whose key repeats an earlier point of
/// the same request is dropped, not reported. On `update`, ids that do not
/// belong to the estimate are ignored.
#[async_trait]
pub trait EstimateService: Send + Sync {
    /// Points of the project's active estimate, ordered by key. Empty when the
    /// project has no active estimate.
    async fn list_points(&self, req: ListRequest) -> Result<Vec<EstimatePoint>>;
    async fn list(&self, req: ListRequest) -> Result<Vec<Estimate>>;
    async fn create(&self, req: CreateRequest) -> Result<Estimate>;
    async fn get(&self, req: GetRequest) -> Result<Estimate>;
    /// Returns the points that matched a supplied id, after the update.
    async fn update(&self, req: UpdateRequest) -> Result<Vec<EstimatePoint>>;
    async fn delete(&self, req: DeleteRequest) -> Result<()>;
    /// Removes one point, closes the key gap it leaves and moves its issues.
    /// Returns the points whose key changed.
    async fn delete_point(&self, req: DeletePointRequest) -> Result<Vec<EstimatePoint>>;
}

#[derive(Debug, Clone)]
pub struct CreateWorkspaceRequest {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub workspace_slug: String,
    pub name: String,
    pub identifier: String,
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn create_workspace(&self, req: CreateWorkspaceRequest) -> Result<Workspace>;
    async fn create_project(&self, req: CreateProjectRequest) -> Result<Project>;
    async fn get_project(&self, project: ProjectRef) -> Result<Project>;
    /// Selects the scale the project uses. `None` clears it.
    async fn set_active_estimate(
        &self,
        project: ProjectRef,
        estimate_id: Option<Uuid>,
    ) -> Result<Project>;
}

#[derive(Debug, Clone)]
pub struct CreateIssueRequest {
    pub project: ProjectRef,
    pub name: String,
    pub estimate_point_ref: Option<Uuid>,
}

#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn create_issue(&self, req: CreateIssueRequest) -> Result<Issue>;
    async fn get_issue(&self, project: ProjectRef, issue_id: Uuid) -> Result<Issue>;
    async fn list_issues(&self, project: ProjectRef) -> Result<Vec<Issue>>;
}
