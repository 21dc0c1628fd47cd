use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, Result},
    events::{self, EngagementEvent},
    identity::ClientIdentity,
    models::{SubmissionStatus, SubmitNepoEntryRequest, SubmitVideoRequest},
    services::submission_service,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: String,
}

async fn check_submission_rate(state: &AppState, identity: &ClientIdentity) -> Result<()> {
    let rate_limit_key = format!("submission:{}", identity.id);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, 5, 3600)
        .await?
    {
        return Err(AppError::RateLimit);
    }
    Ok(())
}

pub async fn submit_video(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Json(payload): Json<SubmitVideoRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    check_submission_rate(&state, &identity).await?;

    let id = submission_service::submit_video(state.store.as_ref(), payload).await?;
    events::emit(state.events.as_ref(), EngagementEvent::submission("video")).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "message": "Video submitted successfully! It will be reviewed by our team."
        })),
    ))
}

pub async fn submit_nepo_entry(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Json(payload): Json<SubmitNepoEntryRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    check_submission_rate(&state, &identity).await?;

    let id = submission_service::submit_nepo_entry(state.store.as_ref(), payload).await?;
    events::emit(state.events.as_ref(), EngagementEvent::submission("nepo_entry")).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "message": "Entry submitted successfully! It will be reviewed before publishing."
        })),
    ))
}

pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Value>> {
    let videos =
        submission_service::list_videos(state.store.as_ref(), SubmissionStatus::Approved).await?;

    Ok(Json(json!({
        "count": videos.len(),
        "videos": videos
    })))
}

pub async fn list_nepo_entries(State(state): State<AppState>) -> Result<Json<Value>> {
    let entries =
        submission_service::list_nepo_entries(state.store.as_ref(), SubmissionStatus::Approved)
            .await?;

    Ok(Json(json!({
        "count": entries.len(),
        "entries": entries
    })))
}

pub async fn search_nepo_entries(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Value>> {
    let entries = submission_service::search_nepo_entries(state.store.as_ref(), &params.name).await?;

    Ok(Json(json!({
        "count": entries.len(),
        "entries": entries
    })))
}
