use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::score::{ScoreTone, score};
use crate::store::collections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn opposite(self) -> Self {
        match self {
            VoteType::Up => VoteType::Down,
            VoteType::Down => VoteType::Up,
        }
    }

    /// Counter on the target that tallies this direction.
    pub fn counter_field(self) -> &'static str {
        match self {
            VoteType::Up => "upvotes",
            VoteType::Down => "downvotes",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn collection(self) -> &'static str {
        match self {
            TargetType::Post => collections::POSTS,
            TargetType::Comment => collections::COMMENTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoteTarget {
    pub id: Uuid,
    pub kind: TargetType,
}

impl VoteTarget {
    pub fn post(id: Uuid) -> Self {
        Self {
            id,
            kind: TargetType::Post,
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            id,
            kind: TargetType::Comment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: Uuid,
    pub user_id: String,
    pub target_id: Uuid,
    pub target_type: TargetType,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVote<'a> {
    pub user_id: &'a str,
    pub target_id: Uuid,
    pub target_type: TargetType,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
}

/// The denormalized counter pair carried by every votable document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub downvotes: i64,
}

impl Counters {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }

    pub fn score(&self) -> i64 {
        score(self.upvotes, self.downvotes)
    }

    pub fn tone(&self) -> ScoreTone {
        ScoreTone::of(self.score())
    }

    pub fn apply(&mut self, deltas: &[(&str, i64)]) {
        for &(field, delta) in deltas {
            match field {
                "upvotes" => self.upvotes += delta,
                "downvotes" => self.downvotes += delta,
                _ => {}
            }
        }
    }
}

// Vote request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub vote_type: VoteType,
}

/// What a cast did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Add,
    Retract,
    Flip,
}

// Vote response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub action: VoteAction,
    pub user_vote: Option<VoteType>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub score_tone: ScoreTone,
    pub score_class: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentVoteResponse {
    pub user_vote: Option<VoteType>,
}
