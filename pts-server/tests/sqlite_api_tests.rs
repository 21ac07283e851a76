use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pts_estimate::DatabaseEstimateService;
use pts_server::{ServerConfig, create_app};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("pointscale.db").display());
    let service = DatabaseEstimateService::new(&url).await.unwrap();
    service.migrate().await.unwrap();
    (dir, create_app(ServerConfig::from_backend(Arc::new(service))))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value =
        if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_point_deletes_over_http() {
    let (_dir, app) = app().await;
    let workspace = json!({"slug": "acme", "name": "Acme"});
    let (status, _) = send(&app, "POST", "/api/workspaces/", Some(workspace)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, project) = send(
        &app,
        "POST",
        "/api/workspaces/acme/projects/",
        Some(json!({"name": "Web", "identifier": "WEB"})),
    )
    .await;
    let base = format!("/api/workspaces/acme/projects/{}", project["id"].as_str().unwrap());

    let scale: Vec<Value> =
        (0..8).map(|key| json!({"key": key, "value": key.to_string()})).collect();
    let mut estimates = Vec::new();
    for _ in 0..3 {
        let body = json!({"estimate_points": scale});
        let (status, created) =
            send(&app, "POST", &format!("{base}/estimates/"), Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{created}");
        estimates.push(created);
    }

    let mut handles = Vec::new();
    for created in &estimates {
        let estimate_id = created["estimate"]["id"].as_str().unwrap().to_string();
        for point in created["estimate_points"].as_array().unwrap().iter().step_by(2) {
            let uri = format!(
                "{base}/estimates/{estimate_id}/points/{}/",
                point["id"].as_str().unwrap()
            );
            let app = app.clone();
            handles.push(tokio::spawn(async move { send(&app, "PATCH", &uri, None).await }));
        }
    }
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    for created in &estimates {
        let estimate_id = created["estimate"]["id"].as_str().unwrap();
        let (_, estimate) =
            send(&app, "GET", &format!("{base}/estimates/{estimate_id}/"), None).await;
        let points = estimate["points"].as_array().unwrap();
        let keys: Vec<i64> = points.iter().map(|p| p["key"].as_i64().unwrap()).collect();
        let values: Vec<&str> = points.iter().map(|p| p["value"].as_str().unwrap()).collect();
        assert_eq!(keys, vec![0, 1, 2, 3]);
        assert_eq!(values, vec!["1", "3", "5", "7"]);
    }
}
