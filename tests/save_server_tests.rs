use axum::body::Body;
use axum::http::{Request, StatusCode};
use crm_store::SaveServerConfig;
use crm_store::server::{SaveAck, SavedSnapshot, router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/save-json")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ping() {
    let app = router(&SaveServerConfig::default());
    let response = app
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_save_wraps_payload_and_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let out_file = temp_dir.path().join("nested").join("crm-data.json");
    let app = router(&SaveServerConfig::default().out_file(&out_file));

    let first = json!({ "escuelas": [{ "id": "esc_1", "nombre": "Acme" }], "carreras": [], "users": [] });
    let response = app.clone().oneshot(post_json(&first.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack: SaveAck = serde_json::from_value(body_json(response).await).unwrap();
    assert!(ack.ok);
    assert_eq!(ack.path, out_file.display().to_string());

    let saved: SavedSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
    assert_eq!(saved.payload, first);
    assert!(chrono::DateTime::parse_from_rfc3339(&saved.saved_at).is_ok());

    let second = json!({ "escuelas": [], "carreras": [], "users": [] });
    app.oneshot(post_json(&second.to_string())).await.unwrap();
    let saved: SavedSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
    assert_eq!(saved.payload, second);
}

#[tokio::test]
async fn test_rejects_non_object_payload() {
    let temp_dir = TempDir::new().unwrap();
    let out_file = temp_dir.path().join("crm-data.json");
    let app = router(&SaveServerConfig::default().out_file(&out_file));

    let response = app.oneshot(post_json("[1, 2, 3]")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "input_error");
    assert!(!out_file.exists());
}

#[tokio::test]
async fn test_rejects_malformed_json() {
    let temp_dir = TempDir::new().unwrap();
    let out_file = temp_dir.path().join("crm-data.json");
    let app = router(&SaveServerConfig::default().out_file(&out_file));

    let response = app.oneshot(post_json("{not json")).await.unwrap();

    assert!(response.status().is_client_error());
    assert!(!out_file.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_overlapping_saves_all_succeed() {
    let temp_dir = TempDir::new().unwrap();
    let out_file = temp_dir.path().join("crm-data.json");
    let app = router(&SaveServerConfig::default().out_file(&out_file));
    let filler = "x".repeat(200 * 1024);

    let mut handles = Vec::new();
    for i in 0..64 {
        let app = app.clone();
        let body = json!({ "escuelas": [{ "id": format!("esc_{i}"), "nombre": &filler }] }).to_string();
        handles.push(tokio::spawn(async move {
            app.oneshot(post_json(&body)).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let saved: SavedSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&out_file).unwrap()).unwrap();
    assert_eq!(saved.payload["escuelas"][0]["nombre"].as_str().unwrap().len(), filler.len());

    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("crm-data.json")]);
}
