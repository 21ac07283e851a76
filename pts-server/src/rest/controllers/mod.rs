pub mod estimates;
pub mod issues;
pub mod projects;

pub use estimates::EstimateController;
pub use issues::IssueController;
pub use projects::ProjectController;
