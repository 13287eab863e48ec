use axum::{extract::State, Json};
use chrono::{Duration, Utc};

use crate::{
    app::AppState,
    auth,
    error::{AppError, AppResult},
    model,
};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<model::AdminLoginPayload>,
) -> AppResult<Json<model::AdminLoginResponse>> {
    if !state.admin.is_configured() {
        return Err(AppError::Unavailable(
            "admin login is not configured (ADMIN_USERNAME / ADMIN_PASSWORD)".into(),
        ));
    }

    if !state
        .admin
        .verify_credentials(&payload.username, &payload.password)
    {
        return Err(auth::invalid_credentials_error());
    }

    let token = state.admin.issue_session().await;
    let expires_in = state.admin.ttl_secs();
    let expires_at = Utc::now() + Duration::seconds(expires_in as i64);
    tracing::info!(username = %payload.username, "admin logged in");

    Ok(Json(model::AdminLoginResponse {
        token,
        expires_in,
        expires_at: expires_at.to_rfc3339(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<model::AdminLogoutPayload>,
) -> AppResult<Json<serde_json::Value>> {
    let revoked = state.admin.revoke_session(payload.token.trim()).await;
    let active = state.admin.active_sessions().await;
    tracing::info!(revoked, active, "admin logged out");
    Ok(Json(serde_json::json!({ "ok": true })))
}
