use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    events::{self, EngagementEvent},
    identity::ClientIdentity,
    models::{
        Comment, CommentStatus, CreateCommentRequest, CurrentVoteResponse, TargetType,
        VoteRequest, VoteResponse, VoteTarget,
    },
    services::{comment_service, vote_service},
};

pub async fn create_comment(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    // Check rate limiting
    let rate_limit_key = format!("comment_create:{}", identity.id);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, 10, 60)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let is_reply = payload.parent_id.is_some();
    let comment = comment_service::create_comment(state.store.as_ref(), &identity, payload).await?;

    events::emit(
        state.events.as_ref(),
        EngagementEvent::comment_created(is_reply),
    )
    .await;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn vote_comment(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    // Verify comment exists
    let comment = comment_service::get_comment_by_id_raw(state.store.as_ref(), comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.status != CommentStatus::Active {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    // Check rate limiting
    let rate_limit_key = format!("vote:{}", identity.id);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, 30, 60)
        .await?
    {
        return Err(AppError::RateLimit);
    }

    let response = vote_service::cast_vote(
        state.store.as_ref(),
        &identity.id,
        VoteTarget::comment(comment_id),
        payload.vote_type,
    )
    .await?;

    events::emit(
        state.events.as_ref(),
        EngagementEvent::vote(TargetType::Comment, payload.vote_type),
    )
    .await;

    Ok(Json(response))
}

pub async fn get_comment_vote(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<CurrentVoteResponse>> {
    let user_vote = vote_service::current_vote(
        state.store.as_ref(),
        &identity.id,
        VoteTarget::comment(comment_id),
    )
    .await?;

    Ok(Json(CurrentVoteResponse { user_vote }))
}
