use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{ADMIN_SESSION_HOURS, AdminUser, Claims, verify_password},
    error::{AppError, Result},
    models::{SubmissionStatus, UpdateStatusRequest},
    services::submission_service,
    store::collections,
};

#[derive(Debug, Validate, Deserialize)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<SubmissionStatus>,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    // Rate limiting for login attempts
    let rate_limit_key = format!("admin_login:{}", email);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, 5, 300)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    if !state.config.is_admin_email(&email) {
        tracing::warn!(%email, "Login attempt from non-admin email");
        return Err(AppError::Authorization("Access denied".to_string()));
    }

    let hash = state
        .config
        .admin_password_hash
        .as_deref()
        .ok_or_else(|| AppError::Authentication("Admin login is not configured".to_string()))?;

    if !verify_password(&payload.password, hash)? {
        return Err(AppError::Authentication("Invalid credentials".to_string()));
    }

    let (token, claims) = Claims::new(&email, &state.config.jwt_secret)?;

    state
        .cache
        .store_session(&claims.jti, &email, (ADMIN_SESSION_HOURS * 3600) as usize)
        .await?;

    tracing::info!(%email, "Admin signed in");

    let expires_at = Utc.timestamp_opt(claims.exp, 0).single();
    Ok(Json(json!({
        "token": token,
        "expiresAt": expires_at
    })))
}

pub async fn verify(
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<Value>> {
    Ok(Json(json!({
        "isAdmin": state.config.is_admin_email(&payload.email)
    })))
}

pub async fn logout(State(state): State<AppState>, admin: AdminUser) -> Result<Json<Value>> {
    state.cache.delete_session(&admin.jti).await?;
    tracing::info!(email = %admin.email, "Admin signed out");

    Ok(Json(json!({
        "message": "Logged out successfully"
    })))
}

pub async fn list_videos(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let status = params.status.unwrap_or(SubmissionStatus::Pending);
    let videos = submission_service::list_videos(state.store.as_ref(), status).await?;

    Ok(Json(json!({
        "status": status,
        "count": videos.len(),
        "videos": videos
    })))
}

pub async fn list_nepo_entries(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let status = params.status.unwrap_or(SubmissionStatus::Pending);
    let entries = submission_service::list_nepo_entries(state.store.as_ref(), status).await?;

    Ok(Json(json!({
        "status": status,
        "count": entries.len(),
        "entries": entries
    })))
}

pub async fn update_video_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>> {
    if state
        .store
        .get(collections::VIDEO_SUBMISSIONS, id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Video not found".to_string()));
    }

    submission_service::set_video_status(state.store.as_ref(), id, payload.status).await?;
    tracing::info!(%id, moderator = %admin.email, "Video status updated");

    Ok(Json(json!({
        "id": id,
        "status": payload.status
    })))
}

pub async fn update_nepo_entry_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>> {
    if state
        .store
        .get(collections::NEPO_ENTRIES, id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Entry not found".to_string()));
    }

    submission_service::set_nepo_entry_status(state.store.as_ref(), id, payload.status).await?;
    tracing::info!(%id, moderator = %admin.email, "Entry status updated");

    Ok(Json(json!({
        "id": id,
        "status": payload.status
    })))
}

pub async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Value>> {
    let videos =
        submission_service::status_counts(state.store.as_ref(), collections::VIDEO_SUBMISSIONS)
            .await?;
    let entries =
        submission_service::status_counts(state.store.as_ref(), collections::NEPO_ENTRIES).await?;

    Ok(Json(json!({
        "videos": videos,
        "nepoEntries": entries
    })))
}
