use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::score::ScoreTone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Active,
    Hidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub depth: u32,
    pub status: CommentStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment<'a> {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: &'a str,
    pub author_id: &'a str,
    pub author_name: &'a str,
    pub created_at: DateTime<Utc>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub depth: u32,
    pub status: CommentStatus,
}

// Create comment request
#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 2000, message = "Comment must be between 1 and 2000 characters"))]
    pub content: String,
}

impl CreateCommentRequest {
    pub fn trimmed(self) -> Self {
        Self {
            content: self.content.trim().to_string(),
            ..self
        }
    }
}

// Comment response with nested structure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: Comment,
    pub score: i64,
    pub score_tone: ScoreTone,
    pub score_class: &'static str,
    /// Rendered nesting level from the actual ancestry; roots are 0. The
    /// flattened comment's `depth` is the stored value, capped at 3.
    pub level: usize,
    pub can_reply: bool,
    pub replies: Vec<CommentThread>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentsResponse {
    pub post_id: Uuid,
    pub total: usize,
    pub comments: Vec<CommentThread>,
}
