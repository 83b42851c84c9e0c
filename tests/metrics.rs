// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

// Full in-process app, /metrics gated on via env.
fn build_app() -> Router {
    std::env::set_var("DEBUG_ROUTES", "1");
    // Deterministic remote: first candidate label, score 0.75.
    std::env::set_var("REMOTE_TEST_MODE", "mock");
    smart_triggers::app().expect("app() should build Router in tests")
}

async fn text_of(resp: axum::response::Response) -> String {
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn metrics_endpoint_counts_classifications_by_source() {
    let app = build_app();

    let resp = app
        .clone()
        .oneshot(
            Request::post("/classify")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"text":"погода сегодня"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = serde_json::from_str(&text_of(resp).await).unwrap();
    assert_eq!(v["results"][0]["source"], "remote");
    assert_eq!(v["results"][0]["confidence"], 75.0);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = text_of(resp).await;

    for needle in ["triggers_classified_total", "source=\"remote\"", "triggers_taxonomy_labels"] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
