pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Runs API
        .route("/api/v1/runs", post(handlers::handle_start_run))
        .route("/api/v1/runs/current", get(handlers::handle_get_current_run))
        .route(
            "/api/v1/runs/current/export",
            post(handlers::handle_export_current_run),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::generation::{IllustrationSynthesizer, NarrativeSynthesizer};
    use crate::layout::default_page_metrics;
    use crate::models::illustration::png_fixture;
    use crate::pipeline::{Session, Stage};
    use crate::test_support::{
        excerpts, story_json, ImageReply, MockImageGenerator, MockSource, MockTextGenerator,
        TextReply,
    };

    fn app_state() -> AppState {
        let session = Session::new(
            Arc::new(MockSource::with(excerpts(10))),
            NarrativeSynthesizer::new(Arc::new(MockTextGenerator::new(vec![TextReply::ok(
                story_json("Night Ferry", "A\nB", "P"),
            )]))),
            IllustrationSynthesizer::new(Arc::new(MockImageGenerator::new(vec![
                ImageReply::images(vec![(png_fixture(30, 40).bytes.to_vec(), "image/png")]),
            ]))),
            default_page_metrics(),
        );
        AppState {
            session: Arc::new(session),
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(app_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "storyweave-api");
    }

    #[tokio::test]
    async fn test_start_run_rejects_unknown_mode() {
        let app = build_router(app_state());
        let response = app
            .oneshot(post_json("/api/v1/runs", r#"{"mode": "sideways"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_export_without_run_is_conflict() {
        let app = build_router(app_state());
        let response = app
            .oneshot(post_json("/api/v1/runs/current/export", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "ExportPreconditionFailed");
    }

    #[tokio::test]
    async fn test_run_snapshot_and_export() {
        let state = app_state();
        let mut rx = state.session.subscribe();
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/runs", r#"{"mode": "hot"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["run_id"], 1);
        assert_eq!(body["mode"], "curated");

        rx.wait_for(|s| s.stage == Stage::Ready).await.unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::get("/api/v1/runs/current")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = json_body(response).await;
        assert_eq!(snapshot["stage"], "ready");
        assert_eq!(snapshot["loading"], false);
        assert!(snapshot["error"].is_null());
        assert_eq!(snapshot["narrative"]["status"], "succeeded");
        assert_eq!(snapshot["narrative"]["value"]["title"], "Night Ferry");
        assert!(snapshot["image"]["value"]["data_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(snapshot["sources"]["value"].as_array().unwrap().len(), 10);

        let response = app
            .oneshot(post_json("/api/v1/runs/current/export", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"night_ferry.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
