use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::config::LbMethod;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub method: LbMethod,
    pub total_served: u64,
    pub healthy: usize,
    pub upstreams: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub upstream: String,
    pub url: String,
    pub weight: u32,
    pub state: String,
    pub in_healthy_set: bool,
    pub requests_served: u64,
    pub failures: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Strategy {
    pub method: String,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let engine = &state.engine;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        method: engine.selector().method(),
        total_served: engine.total_served(),
        healthy: engine.healthy().len(),
        upstreams: engine.registry().len(),
    })
}

pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let snapshot = state.engine.healthy().snapshot();
    let statuses = state
        .engine
        .registry()
        .servers()
        .iter()
        .map(|s| BackendStatus {
            upstream: s.id.to_string(),
            url: s.url().to_string(),
            weight: s.weight,
            state: s.health().to_string(),
            in_healthy_set: snapshot.contains(&s.id),
            requests_served: s.requests_served(),
            failures: s.failures(),
        })
        .collect();

    Json(statuses)
}

pub async fn get_strategy(State(state): State<AdminState>) -> Json<Strategy> {
    Json(Strategy {
        method: state.engine.selector().method().to_string(),
    })
}

pub async fn put_strategy(
    State(state): State<AdminState>,
    Json(update): Json<Strategy>,
) -> impl IntoResponse {
    match update.method.parse::<LbMethod>() {
        Ok(method) => {
            state.engine.selector().set_method(method);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "method": method.as_str() })),
            )
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "detail": e.to_string() })),
        ),
    }
}
