use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::score::ScoreTone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostCategory {
    Discussion,
    News,
    Corruption,
    Protest,
}

impl PostCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PostCategory::Discussion => "discussion",
            PostCategory::News => "news",
            PostCategory::Corruption => "corruption",
            PostCategory::Protest => "protest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Hidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: PostCategory,
    pub author_id: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
    #[serde(default)]
    pub comment_count: i64,
    pub status: PostStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub category: PostCategory,
    pub author_id: &'a str,
    pub author_name: &'a str,
    pub created_at: DateTime<Utc>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub comment_count: i64,
    pub status: PostStatus,
}

// Create post request
#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(length(min = 5, max = 200, message = "Title must be between 5 and 200 characters"))]
    pub title: String,
    #[validate(length(
        min = 20,
        max = 5000,
        message = "Content must be between 20 and 5000 characters"
    ))]
    pub content: String,
    pub category: PostCategory,
}

impl CreatePostRequest {
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            content: self.content.trim().to_string(),
            category: self.category,
        }
    }
}

// Post response with derived score
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub score: i64,
    pub score_tone: ScoreTone,
    pub score_class: &'static str,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        let score = crate::score::score(post.upvotes, post.downvotes);
        let score_tone = ScoreTone::of(score);
        Self {
            post,
            score,
            score_tone,
            score_class: score_tone.css_class(),
        }
    }
}
