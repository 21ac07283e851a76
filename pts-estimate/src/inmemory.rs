use crate::name::generate_estimate_name;
use crate::renumber::shift_down_after;
use crate::service::{
    CreateIssueRequest, CreateProjectRequest, CreateRequest, CreateWorkspaceRequest,
    DeletePointRequest, DeleteRequest, EstimateService, GetRequest, IssueStore, ListRequest,
    ProjectStore, UpdateRequest,
};
use crate::validation::{check_points, check_updates};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pts_core::{
    Estimate, EstimatePoint, Issue, Project, ProjectRef, PtsError, Result, Workspace,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
struct EstimateRow {
    id: Uuid,
    name: String,
    description: String,
    project_id: Uuid,
    workspace_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    workspaces: HashMap<Uuid, Workspace>,
    projects: HashMap<Uuid, Project>,
    estimates: HashMap<Uuid, EstimateRow>,
    points: HashMap<Uuid, EstimatePoint>,
    issues: HashMap<Uuid, Issue>,
}

impl Tables {
    fn project(&self, project: &ProjectRef) -> Result<&Project> {
        let workspace = self
            .workspaces
            .values()
            .find(|w| w.slug == project.workspace_slug)
            .ok_or_else(|| PtsError::not_found("workspace", &project.workspace_slug))?;
        self.projects
            .get(&project.project_id)
            .filter(|p| p.workspace_id == workspace.id)
            .ok_or_else(|| PtsError::not_found("project", project.project_id))
    }

    fn estimate(&self, project: &Project, estimate_id: Uuid) -> Result<&EstimateRow> {
        self.estimates
            .get(&estimate_id)
            .filter(|e| e.project_id == project.id)
            .ok_or_else(|| PtsError::not_found("estimate", estimate_id))
    }

    fn point(&self, estimate_id: Uuid, point_id: Uuid) -> Result<&EstimatePoint> {
        self.points
            .get(&point_id)
            .filter(|p| p.estimate_id == estimate_id)
            .ok_or_else(|| PtsError::not_found("estimate point", point_id))
    }

    fn points_of(&self, estimate_id: Uuid) -> Vec<EstimatePoint> {
        let mut points: Vec<_> =
            self.points.values().filter(|p| p.estimate_id == estimate_id).cloned().collect();
        points.sort_by_key(|p| p.key);
        points
    }

    fn assemble(&self, row: &EstimateRow) -> Estimate {
        Estimate {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            project_id: row.project_id,
            workspace_id: row.workspace_id,
            points: self.points_of(row.id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Process-local backend. All checks of a mutation run before its first write,
/// under one write lock, so a failed call leaves the tables untouched.
pub struct InMemoryEstimateService {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryEstimateService {
    pub fn new() -> Self {
        Self { tables: Arc::new(RwLock::new(Tables::default())) }
    }
}

impl Default for InMemoryEstimateService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EstimateService for InMemoryEstimateService {
    async fn list_points(&self, req: ListRequest) -> Result<Vec<EstimatePoint>> {
        let tables = self.tables.read().await;
        let project = tables.project(&req.project)?;
        Ok(project.estimate_id.map(|id| tables.points_of(id)).unwrap_or_default())
    }

    async fn list(&self, req: ListRequest) -> Result<Vec<Estimate>> {
        let tables = self.tables.read().await;
        let project = tables.project(&req.project)?;

        let mut rows: Vec<_> =
            tables.estimates.values().filter(|e| e.project_id == project.id).collect();
        rows.sort_by_key(|e| (e.created_at, e.id));
        Ok(rows.into_iter().map(|row| tables.assemble(row)).collect())
    }

    async fn create(&self, req: CreateRequest) -> Result<Estimate> {
        check_points(&req.points)?;

        let mut tables = self.tables.write().await;
        let project = tables.project(&req.project)?.clone();

        let name = generate_estimate_name();
        if tables.estimates.values().any(|e| e.project_id == project.id && e.name == name) {
            return Err(PtsError::Conflict(format!("estimate name {name} is already in use")));
        }

        let now = Utc::now();
        let row = EstimateRow {
            id: Uuid::new_v4(),
            name,
            description: String::new(),
            project_id: project.id,
            workspace_id: project.workspace_id,
            created_at: now,
            updated_at: now,
        };

        let mut seen_keys = HashSet::new();
        for point in req.points {
            if !seen_keys.insert(point.key) {
                tracing::debug!(
                    estimate.id = %row.id,
                    key = point.key,
                    "skipping duplicate point key"
                );
                continue;
            }
            let point = EstimatePoint {
                id: Uuid::new_v4(),
                estimate_id: row.id,
                key: point.key,
                value: point.value,
                description: point.description,
                project_id: project.id,
                workspace_id: project.workspace_id,
                created_at: now,
                updated_at: now,
            };
            tables.points.insert(point.id, point);
        }

        let estimate = tables.assemble(&row);
        tables.estimates.insert(row.id, row);

        tracing::info!(
            estimate.id = %estimate.id,
            project.id = %project.id,
            points = estimate.points.len(),
            "estimate created"
        );
        Ok(estimate)
    }

    async fn get(&self, req: GetRequest) -> Result<Estimate> {
        let tables = self.tables.read().await;
        let project = tables.project(&req.project)?;
        let row = tables.estimate(project, req.estimate_id)?;
        Ok(tables.assemble(row))
    }

    async fn update(&self, req: UpdateRequest) -> Result<Vec<EstimatePoint>> {
        check_updates(&req.points)?;

        let mut tables = self.tables.write().await;
        let project = tables.project(&req.project)?.clone();
        let estimate_id = tables.estimate(&project, req.estimate_id)?.id;

        let wanted: HashSet<Uuid> = req.points.iter().map(|p| p.id).collect();
        let now = Utc::now();
        let mut matched = Vec::new();

        for point in tables.points.values_mut() {
            if point.estimate_id != estimate_id || !wanted.contains(&point.id) {
                continue;
            }
            let supplied = req.points.iter().find(|p| p.id == point.id);
            if let Some(value) = supplied.and_then(|p| p.value.clone()) {
                point.value = value;
                point.updated_at = now;
            }
            matched.push(point.clone());
        }
        matched.sort_by_key(|p| p.key);

        tracing::info!(
            estimate.id = %estimate_id,
            updated = matched.len(),
            "estimate points updated"
        );
        Ok(matched)
    }

    async fn delete(&self, req: DeleteRequest) -> Result<()> {
        let mut tables = self.tables.write().await;
        let project = tables.project(&req.project)?.clone();
        let estimate_id = tables.estimate(&project, req.estimate_id)?.id;

        tables.estimates.remove(&estimate_id);
        tables.points.retain(|_, p| p.estimate_id != estimate_id);

        let now = Utc::now();
        for project in tables.projects.values_mut() {
            if project.estimate_id == Some(estimate_id) {
                project.estimate_id = None;
                project.updated_at = now;
            }
        }
        for issue in tables.issues.values_mut() {
            if issue.estimate_ref == Some(estimate_id) {
                issue.estimate_ref = None;
                issue.estimate_point_ref = None;
                issue.updated_at = now;
            }
        }

        tracing::info!(estimate.id = %estimate_id, "estimate deleted");
        Ok(())
    }

    async fn delete_point(&self, req: DeletePointRequest) -> Result<Vec<EstimatePoint>> {
        let mut tables = self.tables.write().await;
        let project = tables.project(&req.project)?.clone();
        let estimate_id = tables.estimate(&project, req.estimate_id)?.id;
        let old_point = tables.point(estimate_id, req.point_id)?.clone();

        if let Some(target) = req.new_estimate_point_id {
            if target == old_point.id {
                return Err(PtsError::BadRequest(
                    "issues cannot be moved to the point being deleted".into(),
                ));
            }
            tables.point(estimate_id, target)?;
        }

        let now = Utc::now();
        let shifted = shift_down_after(&tables.points_of(estimate_id), &old_point, now);

        let mut moved = 0usize;
        for issue in tables.issues.values_mut() {
            if issue.project_id != project.id || issue.estimate_point_ref != Some(old_point.id) {
                continue;
            }
            match req.new_estimate_point_id {
                Some(target) => {
                    issue.estimate_point_ref = Some(target);
                    issue.estimate_ref = Some(estimate_id);
                }
                None => {
                    issue.estimate_point_ref = None;
                    issue.estimate_ref = None;
                }
            }
            issue.updated_at = now;
            moved += 1;
        }

        tables.points.remove(&old_point.id);
        for point in &shifted {
            tables.points.insert(point.id, point.clone());
        }

        tracing::info!(
            estimate.id = %estimate_id,
            point.id = %old_point.id,
            point.key = old_point.key,
            renumbered = shifted.len(),
            issues_moved = moved,
            "estimate point deleted"
        );
        Ok(shifted)
    }
}

#[async_trait]
impl ProjectStore for InMemoryEstimateService {
    async fn create_workspace(&self, req: CreateWorkspaceRequest) -> Result<Workspace> {
        let mut tables = self.tables.write().await;
        if tables.workspaces.values().any(|w| w.slug == req.slug) {
            return Err(PtsError::Conflict(format!("workspace slug {} is already taken", req.slug)));
        }

        let workspace = Workspace {
            id: Uuid::new_v4(),
            slug: req.slug,
            name: req.name,
            created_at: Utc::now(),
        };
        tables.workspaces.insert(workspace.id, workspace.clone());
        Ok(workspace)
    }

    async fn create_project(&self, req: CreateProjectRequest) -> Result<Project> {
        let mut tables = self.tables.write().await;
        let workspace_id = tables
            .workspaces
            .values()
            .find(|w| w.slug == req.workspace_slug)
            .map(|w| w.id)
            .ok_or_else(|| PtsError::not_found("workspace", &req.workspace_slug))?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id,
            name: req.name,
            identifier: req.identifier,
            estimate_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, project: ProjectRef) -> Result<Project> {
        let tables = self.tables.read().await;
        tables.project(&project).cloned()
    }

    async fn set_active_estimate(
        &self,
        project: ProjectRef,
        estimate_id: Option<Uuid>,
    ) -> Result<Project> {
        let mut tables = self.tables.write().await;
        let project_id = tables.project(&project)?.id;
        if let Some(estimate_id) = estimate_id {
            let project = tables.project(&project)?;
            tables.estimate(project, estimate_id)?;
        }

        let project = tables
            .projects
            .get_mut(&project_id)
            .ok_or_else(|| PtsError::not_found("project", project_id))?;
        project.estimate_id = estimate_id;
        project.updated_at = Utc::now();
        Ok(project.clone())
    }
}

#[async_trait]
impl IssueStore for InMemoryEstimateService {
    async fn create_issue(&self, req: CreateIssueRequest) -> Result<Issue> {
        let mut tables = self.tables.write().await;
        let project = tables.project(&req.project)?.clone();

        let estimate_ref = match req.estimate_point_ref {
            Some(point_id) => {
                let point = tables
                    .points
                    .get(&point_id)
                    .filter(|p| p.project_id == project.id)
                    .ok_or_else(|| PtsError::not_found("estimate point", point_id))?;
                Some(point.estimate_id)
            }
            None => None,
        };

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            name: req.name,
            project_id: project.id,
            workspace_id: project.workspace_id,
            estimate_ref,
            estimate_point_ref: req.estimate_point_ref,
            created_at: now,
            updated_at: now,
        };
        tables.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn get_issue(&self, project: ProjectRef, issue_id: Uuid) -> Result<Issue> {
        let tables = self.tables.read().await;
        let project = tables.project(&project)?;
        tables
            .issues
            .get(&issue_id)
            .filter(|i| i.project_id == project.id)
            .cloned()
            .ok_or_else(|| PtsError::not_found("issue", issue_id))
    }

    async fn list_issues(&self, project: ProjectRef) -> Result<Vec<Issue>> {
        let tables = self.tables.read().await;
        let project = tables.project(&project)?;
        let mut issues: Vec<_> =
            tables.issues.values().filter(|i| i.project_id == project.id).cloned().collect();
        issues.sort_by_key(|i| (i.created_at, i.id));
        Ok(issues)
    }
}
