use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::authz::AuthorizationMode;
use crate::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: AuthorizationMode,
    pub rules_version: u64,
    pub rule_count: usize,
    pub registry_ok: bool,
}

pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let snapshot = state.rules.load();

    // Details stay in the log; this endpoint is public.
    let registry_ok = match state.registry.snapshot().await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, "health check: registry unavailable");
            false
        }
    };

    Ok(Json(HealthResponse {
        status: "ok",
        mode: snapshot.mode,
        rules_version: snapshot.version,
        rule_count: snapshot.rules.len(),
        registry_ok,
    }))
}
