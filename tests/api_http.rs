// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /classify, /classify/batch
// - POST /upload (multipart, JSON and ?export=csv)
// - POST /export/csv, /export/xlsx (attachment headers)
// - 400 paths

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use smart_triggers::api::AppState;
use smart_triggers::export::Delimiter;
use smart_triggers::{router, TriggerClassifier, TriggerConfig};

const BODY_LIMIT: usize = 1024 * 1024;
const BOUNDARY: &str = "smart-triggers-test-boundary";

/// Same router as the binary, but local-only so no network is touched.
fn test_router() -> Router {
    let cfg = TriggerConfig::builtin().expect("builtin config");
    let state = AppState::new(TriggerClassifier::local_only(Arc::new(cfg)))
        .with_delimiter(Delimiter::Semicolon);
    router(state)
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec()
}

async fn post_json(uri: &str, payload: Json) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");
    test_router().oneshot(req).await.expect("oneshot")
}

fn multipart_upload(uri: &str, field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build multipart")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    let body = String::from_utf8(body_bytes(resp).await).expect("utf8");
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn api_classify_returns_result_and_tone_summary() {
    let resp = post_json("/classify", json!({ "text": "подпишись и заработай на крипте" })).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_slice(&body_bytes(resp).await).expect("json");
    let row = &v["results"][0];
    assert_eq!(row["id"], 1);
    assert_eq!(row["label"], "spam");
    assert_eq!(row["confidence"], 86.0);
    assert_eq!(row["final_label"], "spam");
    assert_eq!(row["tone"], "negative");
    assert_eq!(row["source"], "keyword");

    assert_eq!(v["tone_summary"][0]["tone"], "negative");
    assert_eq!(v["tone_summary"][0]["percent"], 100.0);
}

#[tokio::test]
async fn api_classify_blank_text_is_400() {
    let resp = post_json("/classify", json!({ "text": "   " })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v: Json = serde_json::from_slice(&body_bytes(resp).await).expect("json");
    assert!(v["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn api_batch_keeps_order_and_skips_blanks() {
    let resp = post_json(
        "/classify/batch",
        json!({ "texts": ["плохо", "", "отлично", "сегодня вторник"] }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_slice(&body_bytes(resp).await).expect("json");
    let labels: Vec<&str> = v["results"]
        .as_array()
        .expect("results array")
        .iter()
        .map(|r| r["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["negative", "praise", "neutral"]);
}

#[tokio::test]
async fn api_upload_csv_returns_json() {
    let csv = "id,text\n1,надоела эта парковка\n2,супер\n".as_bytes();
    let req = multipart_upload("/upload", "file", "reviews.csv", csv);
    let resp = test_router().oneshot(req).await.expect("oneshot /upload");
    assert_eq!(resp.status(), StatusCode::OK);

    let v: Json = serde_json::from_slice(&body_bytes(resp).await).expect("json");
    assert_eq!(v["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["results"][0]["text"], "надоела эта парковка");
}

#[tokio::test]
async fn api_upload_with_csv_export_returns_attachment() {
    let req = multipart_upload("/upload?export=csv", "file", "notes.txt", "плохо\nсупер\n".as_bytes());
    let resp = test_router().oneshot(req).await.expect("oneshot /upload");
    assert_eq!(resp.status(), StatusCode::OK);

    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("smart_triggers_result.csv"));

    let bytes = body_bytes(resp).await;
    let text = String::from_utf8(bytes).expect("utf8");
    let text = text.trim_start_matches('\u{feff}');
    assert!(text.starts_with("id;text;triggers;label;confidence;tone;final_label\n"));
    assert!(text.contains("1;плохо;negative;negative;78.00;negative;negative"));
}

#[tokio::test]
async fn api_upload_without_file_field_is_400() {
    let req = multipart_upload("/upload", "attachment", "reviews.csv", b"text\nx\n");
    let resp = test_router().oneshot(req).await.expect("oneshot /upload");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_upload_unsupported_type_is_400() {
    let req = multipart_upload("/upload", "file", "photo.png", b"\x89PNG");
    let resp = test_router().oneshot(req).await.expect("oneshot /upload");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_export_endpoints_return_files() {
    let results = json!([{
        "id": 1,
        "text": "плохо",
        "triggers": ["negative"],
        "label": "negative",
        "confidence": 78.0,
        "tone": "negative",
        "final_label": "negative",
        "source": "keyword"
    }]);

    let resp = post_json("/export/csv", json!({ "results": results })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );

    let resp = post_json("/export/xlsx", json!({ "results": results })).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert!(bytes.starts_with(b"PK"), "xlsx is a zip container");
}
