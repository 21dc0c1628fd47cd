use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    events::{self, EngagementEvent},
    identity::ClientIdentity,
    models::{
        CreatePostRequest, CurrentVoteResponse, PostCategory, PostCommentsResponse, PostResponse,
        TargetType, VoteRequest, VoteResponse, VoteTarget,
    },
    services::{comment_service, post_service, vote_service},
};

#[derive(Debug, Deserialize)]
pub struct GetPostsQuery {
    pub category: Option<PostCategory>,
    pub limit: Option<usize>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<GetPostsQuery>,
) -> Result<Json<Value>> {
    let limit = params.limit.unwrap_or(25).min(100);

    let posts: Vec<PostResponse> =
        post_service::list_posts(state.store.as_ref(), params.category, limit)
            .await?
            .into_iter()
            .map(PostResponse::from)
            .collect();

    Ok(Json(json!({
        "count": posts.len(),
        "posts": posts
    })))
}

pub async fn create_post(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    // Rate limiting - limit post creation
    let rate_limit_key = format!("create_post:{}", identity.id);
    if !state
        .cache
        .check_rate_limit(&rate_limit_key, 5, 3600)
        .await?
    {
        // 5 per hour
        return Err(AppError::RateLimit);
    }

    let post = post_service::create_post(state.store.as_ref(), &identity, payload).await?;
    events::emit(state.events.as_ref(), EngagementEvent::post_created(post.category)).await;

    Ok((StatusCode::CREATED, Json(PostResponse::from(post))))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostResponse>> {
    let post = post_service::get_post(state.store.as_ref(), post_id).await?;
    Ok(Json(PostResponse::from(post)))
}

pub async fn get_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<Json<PostCommentsResponse>> {
    // Verify post exists
    let _post = post_service::get_post(state.store.as_ref(), post_id).await?;

    let tree = comment_service::get_post_comment_tree(state.store.as_ref(), post_id).await?;

    Ok(Json(PostCommentsResponse {
        post_id,
        total: tree.total(),
        comments: tree.threads(),
    }))
}

pub async fn vote_post(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>> {
    // Check if post exists
    let _post = post_service::get_post(state.store.as_ref(), post_id).await?;

    // Rate limiting for voting
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
        VoteTarget::post(post_id),
        payload.vote_type,
    )
    .await?;

    events::emit(
        state.events.as_ref(),
        EngagementEvent::vote(TargetType::Post, payload.vote_type),
    )
    .await;

    Ok(Json(response))
}

pub async fn get_post_vote(
    State(state): State<AppState>,
    identity: ClientIdentity,
    Path(post_id): Path<Uuid>,
) -> Result<Json<CurrentVoteResponse>> {
    let user_vote =
        vote_service::current_vote(state.store.as_ref(), &identity.id, VoteTarget::post(post_id))
            .await?;

    Ok(Json(CurrentVoteResponse { user_vote }))
}
