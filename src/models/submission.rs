use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSubmission {
    pub id: Uuid,
    pub submitter_name: String,
    pub tiktok_url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideoSubmission<'a> {
    pub submitter_name: &'a str,
    pub tiktok_url: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVideoRequest {
    #[validate(length(max = 100))]
    pub submitter_name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "TikTok URL is required"))]
    pub tiktok_url: String,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvidenceType {
    LuxurySpending,
    Property,
    Education,
    Travel,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NepoEntry {
    pub id: Uuid,
    pub child_name: String,
    pub parent_name: String,
    #[serde(default)]
    pub parent_position: String,
    pub evidence_type: EvidenceType,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub date_occurred: String,
    pub sources: Vec<String>,
    pub submitter_name: String,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNepoEntry<'a> {
    pub child_name: &'a str,
    pub parent_name: &'a str,
    pub parent_position: &'a str,
    pub evidence_type: EvidenceType,
    pub title: &'a str,
    pub description: &'a str,
    pub amount: &'a str,
    pub date_occurred: &'a str,
    pub sources: &'a [String],
    pub submitter_name: &'a str,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

fn validate_sources(sources: &[String]) -> Result<(), ValidationError> {
    if sources.iter().any(|source| !source.trim().is_empty()) {
        Ok(())
    } else {
        Err(ValidationError::new("sources")
            .with_message("At least one source/evidence link is required".into()))
    }
}

#[derive(Debug, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitNepoEntryRequest {
    #[validate(length(min = 1, max = 100, message = "Child name is required"))]
    pub child_name: String,
    #[validate(length(min = 1, max = 100, message = "Parent name is required"))]
    pub parent_name: String,
    #[validate(length(max = 200))]
    pub parent_position: Option<String>,
    pub evidence_type: EvidenceType,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required"))]
    pub description: String,
    #[validate(length(max = 100))]
    pub amount: Option<String>,
    #[validate(length(max = 50))]
    pub date_occurred: Option<String>,
    #[validate(custom(function = "validate_sources"))]
    pub sources: Vec<String>,
    #[validate(length(max = 100))]
    pub submitter_name: Option<String>,
}

/// Public view of an approved entry returned by name search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NepoEntrySummary {
    pub id: Uuid,
    pub child_name: String,
    pub parent_name: String,
    pub parent_position: String,
    pub title: String,
    pub evidence_type: EvidenceType,
    pub created_at: DateTime<Utc>,
}

impl From<NepoEntry> for NepoEntrySummary {
    fn from(entry: NepoEntry) -> Self {
        Self {
            id: entry.id,
            child_name: entry.child_name,
            parent_name: entry.parent_name,
            parent_position: entry.parent_position,
            title: entry.title,
            evidence_type: entry.evidence_type,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: SubmissionStatus,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}
