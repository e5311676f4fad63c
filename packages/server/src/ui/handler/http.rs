//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::ui::state::AppState;

/// Presence entry exposed by the debug endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntryDto {
    pub user_id: i64,
    pub display_name: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Debug endpoint listing the currently online users (for testing purposes)
pub async fn debug_presence(State(state): State<Arc<AppState>>) -> Json<Vec<PresenceEntryDto>> {
    let principals = state.get_presence_usecase.execute().await;

    // Domain Model から DTO への変換
    let entries: Vec<PresenceEntryDto> = principals
        .into_iter()
        .map(|p| PresenceEntryDto {
            user_id: p.user_id.value(),
            display_name: p.display_name.into_string(),
        })
        .collect();

    Json(entries)
}
