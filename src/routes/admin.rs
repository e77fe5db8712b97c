use axum::Json;
use serde::Serialize;

use crate::authz::{ActiveRules, CurrentPrincipal, RuleSnapshot};
use crate::errors::AppResult;

#[derive(Debug, Serialize)]
pub struct AdminOverview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub snapshot: RuleSnapshot,
}

pub async fn overview(
    CurrentPrincipal(principal): CurrentPrincipal,
    ActiveRules(snapshot): ActiveRules,
) -> AppResult<Json<AdminOverview>> {
    Ok(Json(AdminOverview {
        user: principal.map(|p| p.username),
        snapshot: snapshot.as_ref().clone(),
    }))
}
