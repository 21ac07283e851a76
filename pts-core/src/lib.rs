//! # pts-core
//!
//! Domain types and the shared error type for Pointscale.
//!
//! ## Overview
//!
//! - [`Workspace`] / [`Project`] - the tenancy a scale lives in
//! - [`Estimate`] / [`EstimatePoint`] - a project's story-point scale and its ranked points
//! - [`Issue`] - work items that reference an assigned point
//! - [`PtsError`] / [`Result`] - unified error handling
//!
//! Every service operation is addressed by a [`ProjectRef`], the
//! `(workspace slug, project id)` pair taken from request paths.

pub mod error;
pub mod types;

pub use error::{PtsError, Result, ValidationErrors};
pub use types::{
    Estimate, EstimatePoint, Issue, MAX_POINT_KEY, MAX_POINT_VALUE_LEN, NewEstimatePoint,
    Project, ProjectRef, Workspace,
};
