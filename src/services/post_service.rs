use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    identity::ClientIdentity,
    models::{CreatePostRequest, NewPost, Post, PostCategory, PostStatus},
    store::{Direction, DocumentStore, Query, collections},
};

pub async fn get_post_by_id_raw(store: &dyn DocumentStore, post_id: Uuid) -> Result<Option<Post>> {
    store
        .get(collections::POSTS, post_id)
        .await?
        .map(|doc| doc.decode::<Post>())
        .transpose()
}

/// Active post by id; hidden posts read as missing.
pub async fn get_post(store: &dyn DocumentStore, post_id: Uuid) -> Result<Post> {
    get_post_by_id_raw(store, post_id)
        .await?
        .filter(|post| post.status == PostStatus::Active)
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

pub async fn create_post(
    store: &dyn DocumentStore,
    author: &ClientIdentity,
    payload: CreatePostRequest,
) -> Result<Post> {
    let payload = payload.trimmed();
    payload.validate()?;

    let new_post = NewPost {
        title: &payload.title,
        content: &payload.content,
        category: payload.category,
        author_id: &author.id,
        author_name: &author.name,
        created_at: Utc::now(),
        upvotes: 0,
        downvotes: 0,
        comment_count: 0,
        status: PostStatus::Active,
    };

    let post_id = store
        .insert(collections::POSTS, serde_json::to_value(&new_post)?)
        .await?;
    tracing::info!(%post_id, category = payload.category.as_str(), "Post created");

    get_post_by_id_raw(store, post_id)
        .await?
        .ok_or_else(|| AppError::Internal("Post vanished after insert".to_string()))
}

/// Active posts, newest first.
pub async fn list_posts(
    store: &dyn DocumentStore,
    category: Option<PostCategory>,
    limit: usize,
) -> Result<Vec<Post>> {
    let mut query = Query::new().eq("status", "active");
    if let Some(category) = category {
        query = query.eq("category", category.as_str());
    }
    let query = query.order_by("createdAt", Direction::Desc).limit(limit);

    store
        .find(collections::POSTS, &query)
        .await?
        .iter()
        .map(|doc| doc.decode::<Post>())
        .collect()
}
