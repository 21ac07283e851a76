#![allow(dead_code)]

use pts_core::{NewEstimatePoint, ProjectRef};
use pts_estimate::*;

pub async fn seed_project<S: ProjectStore>(service: &S) -> ProjectRef {
    service
        .create_workspace(CreateWorkspaceRequest {
            slug: "acme".to_string(),
            name: "Acme".to_string(),
        })
        .await
        .unwrap();
    let project = service
        .create_project(CreateProjectRequest {
            workspace_slug: "acme".to_string(),
            name: "Web".to_string(),
            identifier: "WEB".to_string(),
        })
        .await
        .unwrap();
    ProjectRef::new("acme", project.id)
}

pub fn points(values: &[(i32, &str)]) -> Vec<NewEstimatePoint> {
    values
        .iter()
        .map(|(key, value)| NewEstimatePoint {
            key: *key,
            value: value.to_string(),
            description: String::new(),
        })
        .collect()
}

pub fn keys_and_values(points: &[pts_core::EstimatePoint]) -> Vec<(i32, String)> {
    points.iter().map(|p| (p.key, p.value.clone())).collect()
}
