//! # pts-server
//!
//! axum HTTP API over the estimate, project and issue services.

pub mod config;
pub mod error;
pub mod rest;

pub use config::{SecurityConfig, ServerConfig};
pub use error::ApiError;
pub use rest::{EstimateController, IssueController, ProjectController, create_app};
