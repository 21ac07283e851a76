#![cfg(feature = "database")]

mod common;

use common::{points, seed_project};
use pts_core::{Estimate, ProjectRef};
use pts_estimate::*;
use std::sync::Arc;
use tempfile::TempDir;

const SCALE: [(i32, &str); 8] =
    [(0, "0"), (1, "1"), (2, "2"), (3, "3"), (4, "5"), (5, "8"), (6, "13"), (7, "21")];

async fn file_service() -> (TempDir, Arc<DatabaseEstimateService>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("pointscale.db").display());
    let service = DatabaseEstimateService::new(&url).await.unwrap();
    service.migrate().await.unwrap();
    (dir, Arc::new(service))
}

async fn create_scale(service: &DatabaseEstimateService, project: &ProjectRef) -> Estimate {
    service
        .create(CreateRequest { project: project.clone(), points: points(&SCALE) })
        .await
        .unwrap()
}

async fn keys_of(
    service: &DatabaseEstimateService,
    project: &ProjectRef,
    estimate_id: uuid::Uuid,
) -> Vec<i32> {
    let estimate =
        service.get(GetRequest { project: project.clone(), estimate_id }).await.unwrap();
    estimate.points.iter().map(|p| p.key).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deletes_on_one_estimate_keep_keys_contiguous() {
    let (_dir, service) = file_service().await;
    let project = seed_project(service.as_ref()).await;
    let estimate = create_scale(&service, &project).await;

    let mut handles = Vec::new();
    for point in estimate.points.iter().skip(1).step_by(2) {
        let service = service.clone();
        let project = project.clone();
        let (estimate_id, point_id) = (estimate.id, point.id);
        handles.push(tokio::spawn(async move {
            service
                .delete_point(DeletePointRequest {
                    project,
                    estimate_id,
                    point_id,
                    new_estimate_point_id: None,
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let keys = keys_of(&service, &project, estimate.id).await;
    assert_eq!(keys, vec![0, 1, 2, 3]);

    let values: Vec<String> = service
        .get(GetRequest { project, estimate_id: estimate.id })
        .await
        .unwrap()
        .points
        .into_iter()
        .map(|p| p.value)
        .collect();
    assert_eq!(values, vec!["0", "2", "5", "13"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_across_estimates_all_succeed() {
    let (_dir, service) = file_service().await;
    let project = seed_project(service.as_ref()).await;

    let mut estimates = Vec::new();
    for _ in 0..5 {
        estimates.push(create_scale(&service, &project).await);
    }

    let mut deletes = Vec::new();
    for estimate in &estimates {
        for point in estimate.points.iter().take(3) {
            let service = service.clone();
            let project = project.clone();
            let (estimate_id, point_id) = (estimate.id, point.id);
            deletes.push(tokio::spawn(async move {
                service
                    .delete_point(DeletePointRequest {
                        project,
                        estimate_id,
                        point_id,
                        new_estimate_point_id: None,
                    })
                    .await
                    .map(|_| ())
            }));
        }
    }
    let mut creates = Vec::new();
    for _ in 0..5 {
        let service = service.clone();
        let project = project.clone();
        creates.push(tokio::spawn(async move {
            service
                .create(CreateRequest { project, points: points(&SCALE) })
                .await
                .map(|_| ())
        }));
    }

    for handle in deletes.into_iter().chain(creates) {
        handle.await.unwrap().unwrap();
    }

    for estimate in &estimates {
        assert_eq!(keys_of(&service, &project, estimate.id).await, (0..5).collect::<Vec<_>>());
    }
    let listed = service.list(ListRequest { project }).await.unwrap();
    assert_eq!(listed.len(), 10);
}
