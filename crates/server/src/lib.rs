//! # Deskglow Server
//!
//! Axum host for the presence dashboard: REST endpoints for reads and
//! manual submissions, a WebSocket state feed, and the wiring that owns the
//! scraper session and poll scheduler.

pub mod api;
pub mod context;
pub mod error;
pub mod health;
pub mod ws;

use std::sync::Arc;

use axum::Router;

use context::AppContext;

/// Build the Axum router over an application context.
pub fn build_app(ctx: Arc<AppContext>) -> Router {
    let api_routes = Router::new()
        .route(
            "/status",
            axum::routing::get(api::get_status)
                .post(api::post_status)
                .delete(api::delete_status),
        )
        .route("/stats", axum::routing::post(api::post_stats))
        .route(
            "/agents/{extension}/status",
            axum::routing::post(api::post_agent_status),
        )
        .route("/monitoring", axum::routing::post(api::post_monitoring));

    Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/health", axum::routing::get(health::health_check))
        .nest("/api", api_routes)
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use deskglow_domain::{Config, LedConfig, ScraperConfig, ScreenshotConfig, ServerConfig};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            led: LedConfig {
                address: "127.0.0.1".to_string(),
                brightness: 128,
                transition_ms: 1_000,
                colors: HashMap::new(),
            },
            scraper: ScraperConfig {
                target_url: "https://pbx.example.com/webclient".to_string(),
                webdriver_url: "http://127.0.0.1:9515".to_string(),
                refresh_interval_ms: 7_000,
                headless: true,
                cookie_path: dir.join("cookies.json").to_string_lossy().into_owned(),
                login_timeout_secs: 600,
            },
            screenshots: ScreenshotConfig::default(),
            server: ServerConfig::default(),
        }
    }

    fn app(dir: &std::path::Path) -> Router {
        let ctx = Arc::new(AppContext::new(test_config(dir)).expect("context"));
        build_app(ctx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        serde_json::from_slice(&bytes).expect("valid json body")
    }

    #[tokio::test]
    async fn get_status_returns_initial_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "offline");
        assert_eq!(json["monitoring"], true);
        assert_eq!(json["authState"], "unauthenticated");
    }

    #[tokio::test]
    async fn post_status_applies_manual_override() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"dnd"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "dnd");
        assert_eq!(json["statusSource"], "manual");
        assert_eq!(json["manualOverride"]["active"], true);
    }

    #[tokio::test]
    async fn post_stats_overlays_manual_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/stats")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"waitingCalls":3,"servicedCalls":7}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["callStats"]["waitingCalls"], 3);
        assert_eq!(json["callStats"]["totalCalls"], 10);
        assert_eq!(json["callStats"]["source"], "manual");
    }

    #[tokio::test]
    async fn unknown_agent_override_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/agents/999/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"away"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn monitoring_toggle_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/monitoring")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"enabled":false}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["monitoring"], false);
    }

    #[tokio::test]
    async fn health_reports_subsystem_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["schedulerRunning"], false);
        assert_eq!(json["authState"], "unauthenticated");
    }

    #[tokio::test]
    async fn invalid_status_value_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/status")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"sleeping"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
