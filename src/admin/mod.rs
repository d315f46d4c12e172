//! Operator API.
//!
//! Served on its own listener when `admin.enabled`; every route requires
//! the configured bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::routing::ProxyEngine;

#[derive(Clone)]
pub struct AdminState {
    pub engine: Arc<ProxyEngine>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .route("/admin/strategy", get(get_strategy).put(put_strategy))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::{LbMethod, UpstreamConfig};
    use crate::health::HealthySet;
    use crate::http::client::fake::FakeClient;
    use crate::load_balancer::{Selector, UpstreamRegistry};
    use crate::resilience::{RetryPolicy, UpstreamTimeouts};

    fn state() -> AdminState {
        let configs = vec![
            UpstreamConfig::new("http://127.0.0.1:9000").with_weight(2),
            UpstreamConfig::new("http://127.0.0.1:9001"),
        ];
        let registry = Arc::new(UpstreamRegistry::new(&configs).unwrap());
        let healthy = HealthySet::from_ids([registry.servers()[0].id.clone()]);
        let engine = ProxyEngine::new(
            registry,
            healthy,
            Arc::new(Selector::new(LbMethod::IpHash)),
            Arc::new(FakeClient::new(|_| None)),
            RetryPolicy { max_retries: 3 },
            UpstreamTimeouts::default(),
        );
        AdminState {
            engine: Arc::new(engine),
            api_key: Arc::from("secret"),
        }
    }

    fn authed(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer secret")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_key() {
        let app = setup_admin_router(state());

        let missing = app
            .clone()
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = app
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_and_backends() {
        let app = setup_admin_router(state());

        let status = json(app.clone().oneshot(authed("GET", "/admin/status", Body::empty())).await.unwrap()).await;
        assert_eq!(status["method"], "ip-hash");
        assert_eq!(status["healthy"], 1);
        assert_eq!(status["upstreams"], 2);

        let backends = json(app.oneshot(authed("GET", "/admin/backends", Body::empty())).await.unwrap()).await;
        assert_eq!(backends[0]["upstream"], "127.0.0.1:9000");
        assert_eq!(backends[0]["weight"], 2);
        assert_eq!(backends[0]["in_healthy_set"], true);
        assert_eq!(backends[1]["in_healthy_set"], false);
    }

    #[tokio::test]
    async fn test_switch_strategy() {
        let state = state();
        let app = setup_admin_router(state.clone());

        let response = app
            .clone()
            .oneshot(authed("PUT", "/admin/strategy", Body::from(r#"{"method":"random"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.engine.selector().method(), LbMethod::Random);

        let current = json(app.clone().oneshot(authed("GET", "/admin/strategy", Body::empty())).await.unwrap()).await;
        assert_eq!(current["method"], "random");

        let bad = app
            .oneshot(authed("PUT", "/admin/strategy", Body::from(r#"{"method":"fastest"}"#)))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.engine.selector().method(), LbMethod::Random);
    }
}
