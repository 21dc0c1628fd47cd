use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    comment_tree::{CommentTree, MAX_REPLY_DEPTH},
    error::{AppError, Result},
    identity::ClientIdentity,
    models::{Comment, CommentStatus, CreateCommentRequest, NewComment},
    services::post_service,
    store::{Direction, DocumentStore, Query, collections},
};

pub async fn get_comment_by_id_raw(
    store: &dyn DocumentStore,
    comment_id: Uuid,
) -> Result<Option<Comment>> {
    store
        .get(collections::COMMENTS, comment_id)
        .await?
        .map(|doc| doc.decode::<Comment>())
        .transpose()
}

/// Stored depth of a reply: one below its parent, capped at the reply limit.
pub fn reply_depth(parent_depth: u32) -> u32 {
    (parent_depth + 1).min(MAX_REPLY_DEPTH as u32)
}

pub async fn create_comment(
    store: &dyn DocumentStore,
    author: &ClientIdentity,
    payload: CreateCommentRequest,
) -> Result<Comment> {
    let payload = payload.trimmed();
    payload.validate()?;

    let post = post_service::get_post(store, payload.post_id).await?;

    let depth = match payload.parent_id {
        None => 0,
        Some(parent_id) => {
            let parent = get_comment_by_id_raw(store, parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent comment not found".to_string()))?;

            if parent.post_id != post.id {
                return Err(AppError::BadRequest(
                    "Parent comment is not on the same post".to_string(),
                ));
            }

            if parent.status != CommentStatus::Active {
                return Err(AppError::BadRequest(
                    "Cannot reply to inactive comment".to_string(),
                ));
            }

            reply_depth(parent.depth)
        }
    };

    let new_comment = NewComment {
        post_id: post.id,
        parent_id: payload.parent_id,
        content: &payload.content,
        author_id: &author.id,
        author_name: &author.name,
        created_at: Utc::now(),
        upvotes: 0,
        downvotes: 0,
        depth,
        status: CommentStatus::Active,
    };

    let comment_id = store
        .insert(collections::COMMENTS, serde_json::to_value(&new_comment)?)
        .await?;

    store
        .update_counters(collections::POSTS, post.id, &[("commentCount", 1)])
        .await?;

    tracing::info!(%comment_id, post_id = %post.id, depth, "Comment created");

    get_comment_by_id_raw(store, comment_id)
        .await?
        .ok_or_else(|| AppError::Internal("Comment vanished after insert".to_string()))
}

/// Active comments of a post, oldest first.
pub async fn list_post_comments(store: &dyn DocumentStore, post_id: Uuid) -> Result<Vec<Comment>> {
    let query = Query::new()
        .eq("postId", post_id.to_string())
        .eq("status", "active")
        .order_by("createdAt", Direction::Asc);

    store
        .find(collections::COMMENTS, &query)
        .await?
        .iter()
        .map(|doc| doc.decode::<Comment>())
        .collect()
}

pub async fn get_post_comment_tree(store: &dyn DocumentStore, post_id: Uuid) -> Result<CommentTree> {
    let comments = list_post_comments(store, post_id).await?;
    Ok(CommentTree::build(comments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CreatePostRequest, PostCategory},
        store::MemoryStore,
    };

    async fn seed_post(store: &MemoryStore) -> Uuid {
        post_service::create_post(
            store,
            &ClientIdentity::from_device_id("author"),
            CreatePostRequest {
                title: "Who paid for the wedding?".to_string(),
                content: "Three helicopters and a private island, on a ministry salary."
                    .to_string(),
                category: PostCategory::Discussion,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn reply(post_id: Uuid, parent_id: Option<Uuid>, content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id,
            parent_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn comments_increment_post_comment_count() {
        let store = MemoryStore::new();
        let post_id = seed_post(&store).await;
        let identity = ClientIdentity::from_device_id("device-a");

        let root = create_comment(&store, &identity, reply(post_id, None, "First"))
            .await
            .unwrap();
        create_comment(&store, &identity, reply(post_id, Some(root.id), "Second"))
            .await
            .unwrap();

        let post = post_service::get_post(&store, post_id).await.unwrap();
        assert_eq!(post.comment_count, 2);
    }

    #[tokio::test]
    async fn depth_follows_parent_chain_and_caps() {
        let store = MemoryStore::new();
        let post_id = seed_post(&store).await;
        let identity = ClientIdentity::from_device_id("device-a");

        let mut parent = None;
        let mut depths = Vec::new();
        for i in 0..5 {
            let comment = create_comment(&store, &identity, reply(post_id, parent, &format!("c{}", i)))
                .await
                .unwrap();
            depths.push(comment.depth);
            parent = Some(comment.id);
        }

        assert_eq!(depths, vec![0, 1, 2, 3, 3]);
    }

    #[tokio::test]
    async fn parent_on_another_post_is_rejected() {
        let store = MemoryStore::new();
        let first = seed_post(&store).await;
        let second = seed_post(&store).await;
        let identity = ClientIdentity::from_device_id("device-a");

        let root = create_comment(&store, &identity, reply(first, None, "root"))
            .await
            .unwrap();
        let err = create_comment(&store, &identity, reply(second, Some(root.id), "stray"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        let post = post_service::get_post(&store, second).await.unwrap();
        assert_eq!(post.comment_count, 0);
    }

    #[tokio::test]
    async fn blank_comment_is_rejected() {
        let store = MemoryStore::new();
        let post_id = seed_post(&store).await;
        let err = create_comment(
            &store,
            &ClientIdentity::from_device_id("device-a"),
            reply(post_id, None, "   "),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn tree_is_built_from_active_comments_in_creation_order() {
        let store = MemoryStore::new();
        let post_id = seed_post(&store).await;
        let identity = ClientIdentity::from_device_id("device-a");

        let a = create_comment(&store, &identity, reply(post_id, None, "a")).await.unwrap();
        let b = create_comment(&store, &identity, reply(post_id, Some(a.id), "b")).await.unwrap();
        let c = create_comment(&store, &identity, reply(post_id, Some(a.id), "c")).await.unwrap();

        let tree = get_post_comment_tree(&store, post_id).await.unwrap();
        let roots: Vec<_> = tree.roots().collect();
        assert_eq!(roots.len(), 1);
        let replies: Vec<_> = roots[0].children().map(|node| node.comment().id).collect();
        assert_eq!(replies, vec![b.id, c.id]);
    }
}
