use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest rank an estimate point may carry.
pub const MAX_POINT_KEY: i32 = 12;

/// Longest label an estimate point may carry, in characters.
pub const MAX_POINT_VALUE_LEN: usize = 20;

/// Address of a project as it appears in request paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub workspace_slug: String,
    pub project_id: Uuid,
}

impl ProjectRef {
    pub fn new(workspace_slug: impl Into<String>, project_id: Uuid) -> Self {
        Self { workspace_slug: workspace_slug.into(), project_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub identifier: String,
    /// The estimate scale currently in use by the project.
    pub estimate_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named point scale belonging to a project, with its points embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub points: Vec<EstimatePoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One rung of an estimate scale.
///
/// `key` is the rank inside the scale. Keys within one estimate are unique and
/// stay gap-free across point removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatePoint {
    pub id: Uuid,
    pub estimate_id: Uuid,
    pub key: i32,
    pub value: String,
    pub description: String,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub name: String,
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    /// Estimate scale the assigned point belongs to.
    pub estimate_ref: Option<Uuid>,
    /// Point currently assigned to the issue.
    pub estimate_point_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated point ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEstimatePoint {
    pub key: i32,
    pub value: String,
    pub description: String,
}
