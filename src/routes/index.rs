use axum::Json;
use serde::Serialize;

use crate::authz::{app_path, ActiveRules, CurrentPrincipal};
use crate::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct AppSummary {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub apps: Vec<AppSummary>,
}

/// Lists the applications the caller would be let into.
pub async fn index(
    CurrentPrincipal(principal): CurrentPrincipal,
    ActiveRules(snapshot): ActiveRules,
) -> AppResult<Json<IndexResponse>> {
    let apps = snapshot
        .apps
        .iter()
        .filter(|app| !app.name.is_empty())
        .filter(|app| snapshot.evaluate(&app_path(&app.name), principal.as_ref()).is_allowed())
        .map(|app| AppSummary {
            name: app.name.clone(),
            display_name: app.display_name.clone().unwrap_or_else(|| app.name.clone()),
            description: app.description.clone(),
            path: app_path(&app.name),
        })
        .collect();

    Ok(Json(IndexResponse {
        user: principal.map(|p| p.username),
        apps,
    }))
}
