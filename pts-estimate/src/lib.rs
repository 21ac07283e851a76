//! # pts-estimate
//!
//! Estimate scale management for Pointscale projects.
//!
//! [`EstimateService`] covers CRUD over a project's point scales and the
//! delete-and-renumber operation that keeps point keys gap-free.
//! [`ProjectStore`] and [`IssueStore`] cover the records those operations
//! reference. Two backends implement all three traits:
//!
//! - [`InMemoryEstimateService`] - process-local, for tests and single-node use
//! - `DatabaseEstimateService` - SQLite via `sqlx` (feature `database`)

pub mod inmemory;
pub mod locks;
pub mod name;
pub mod renumber;
pub mod service;
pub mod validation;

#[cfg(feature = "database")]
pub mod database;
#[cfg(feature = "database")]
pub mod migrations;

pub use inmemory::InMemoryEstimateService;
pub use locks::{EstimateGuard, EstimateLocks};
pub use name::generate_estimate_name;
pub use renumber::shift_down_after;
pub use service::{
    BATCH_SIZE, CreateIssueRequest, CreateProjectRequest, CreateRequest, CreateWorkspaceRequest,
    DeletePointRequest, DeleteRequest, EstimateService, GetRequest, IssueStore, ListRequest,
    PointValueUpdate, ProjectStore, UpdateRequest,
};

#[cfg(feature = "database")]
pub use database::DatabaseEstimateService;
