use axum::extract::Path;
use axum::Json;
use serde::Serialize;

use crate::authz::{ActiveRules, CurrentPrincipal};
use crate::errors::{AppError, AppResult};
use crate::models::application::Application;

#[derive(Debug, Serialize)]
pub struct AppLaunch {
    pub app: Application,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Landing point for a hosted application; proxying is left to the hosting layer.
pub async fn open_app(
    Path(name): Path<String>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ActiveRules(snapshot): ActiveRules,
) -> AppResult<Json<AppLaunch>> {
    // First registry entry wins, same as rule precedence.
    let app = snapshot
        .apps
        .iter()
        .find(|app| app.name == name)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("application '{name}' not found")))?;

    Ok(Json(AppLaunch {
        app,
        user: principal.map(|p| p.username),
    }))
}
