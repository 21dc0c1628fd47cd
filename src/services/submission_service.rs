use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde_json::{Map, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, Result},
    models::{
        NepoEntry, NepoEntrySummary, NewNepoEntry, NewVideoSubmission, StatusCounts,
        SubmissionStatus, SubmitNepoEntryRequest, SubmitVideoRequest, VideoSubmission,
    },
    store::{Direction, DocumentStore, Query, collections},
};

static TIKTOK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(www\.)?(tiktok\.com|vm\.tiktok\.com)")
        .expect("TikTok URL pattern is valid")
});

pub const MIN_SEARCH_LENGTH: usize = 2;

fn submitter_or_anonymous(name: Option<&str>) -> &str {
    name.map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Anonymous")
}

pub fn is_tiktok_url(url: &str) -> bool {
    TIKTOK_URL.is_match(url.trim())
}

pub async fn submit_video(store: &dyn DocumentStore, payload: SubmitVideoRequest) -> Result<Uuid> {
    payload.validate()?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation(
            "TikTok URL and title are required".to_string(),
        ));
    }
    if !is_tiktok_url(&payload.tiktok_url) {
        return Err(AppError::Validation(
            "Please provide a valid TikTok URL".to_string(),
        ));
    }

    let submission = NewVideoSubmission {
        submitter_name: submitter_or_anonymous(payload.submitter_name.as_deref()),
        tiktok_url: payload.tiktok_url.trim(),
        title,
        description: payload.description.as_deref().map(str::trim).unwrap_or(""),
        status: SubmissionStatus::Pending,
        created_at: Utc::now(),
    };

    let id = store
        .insert(collections::VIDEO_SUBMISSIONS, serde_json::to_value(&submission)?)
        .await?;
    tracing::info!(submission_id = %id, "Video submitted for review");
    Ok(id)
}

pub async fn submit_nepo_entry(
    store: &dyn DocumentStore,
    payload: SubmitNepoEntryRequest,
) -> Result<Uuid> {
    payload.validate()?;

    let required = [
        payload.child_name.trim(),
        payload.parent_name.trim(),
        payload.title.trim(),
        payload.description.trim(),
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(AppError::Validation(
            "Child name, parent name, title, evidence type, and description are required"
                .to_string(),
        ));
    }

    let sources: Vec<String> = payload
        .sources
        .iter()
        .map(|source| source.trim().to_string())
        .filter(|source| !source.is_empty())
        .collect();
    if sources.is_empty() {
        return Err(AppError::Validation(
            "At least one valid source is required".to_string(),
        ));
    }

    let entry = NewNepoEntry {
        child_name: required[0],
        parent_name: required[1],
        parent_position: payload.parent_position.as_deref().map(str::trim).unwrap_or(""),
        evidence_type: payload.evidence_type,
        title: required[2],
        description: required[3],
        amount: payload.amount.as_deref().map(str::trim).unwrap_or(""),
        date_occurred: payload.date_occurred.as_deref().map(str::trim).unwrap_or(""),
        sources: &sources,
        submitter_name: submitter_or_anonymous(payload.submitter_name.as_deref()),
        status: SubmissionStatus::Pending,
        created_at: Utc::now(),
    };

    let id = store
        .insert(collections::NEPO_ENTRIES, serde_json::to_value(&entry)?)
        .await?;
    tracing::info!(entry_id = %id, "Evidence entry submitted for review");
    Ok(id)
}

pub async fn list_videos(
    store: &dyn DocumentStore,
    status: SubmissionStatus,
) -> Result<Vec<VideoSubmission>> {
    let query = Query::new()
        .eq("status", status.as_str())
        .order_by("createdAt", Direction::Desc);

    store
        .find(collections::VIDEO_SUBMISSIONS, &query)
        .await?
        .iter()
        .map(|doc| doc.decode::<VideoSubmission>())
        .collect()
}

pub async fn list_nepo_entries(
    store: &dyn DocumentStore,
    status: SubmissionStatus,
) -> Result<Vec<NepoEntry>> {
    let query = Query::new()
        .eq("status", status.as_str())
        .order_by("createdAt", Direction::Desc);

    store
        .find(collections::NEPO_ENTRIES, &query)
        .await?
        .iter()
        .map(|doc| doc.decode::<NepoEntry>())
        .collect()
}

/// Approved entries whose child or parent name contains `name`,
/// case-insensitively. Queries shorter than two characters match nothing.
pub async fn search_nepo_entries(
    store: &dyn DocumentStore,
    name: &str,
) -> Result<Vec<NepoEntrySummary>> {
    let needle = name.trim().to_lowercase();
    if needle.chars().count() < MIN_SEARCH_LENGTH {
        return Ok(Vec::new());
    }

    let entries = list_nepo_entries(store, SubmissionStatus::Approved).await?;
    Ok(entries
        .into_iter()
        .filter(|entry| {
            entry.child_name.to_lowercase().contains(&needle)
                || entry.parent_name.to_lowercase().contains(&needle)
        })
        .map(NepoEntrySummary::from)
        .collect())
}

async fn set_status(
    store: &dyn DocumentStore,
    collection: &str,
    id: Uuid,
    status: SubmissionStatus,
) -> Result<()> {
    let mut fields = Map::new();
    fields.insert("status".to_string(), json!(status));
    store.set_fields(collection, id, fields).await?;
    tracing::info!(%id, collection, status = status.as_str(), "Moderation status changed");
    Ok(())
}

pub async fn set_video_status(
    store: &dyn DocumentStore,
    id: Uuid,
    status: SubmissionStatus,
) -> Result<()> {
    set_status(store, collections::VIDEO_SUBMISSIONS, id, status).await
}

pub async fn set_nepo_entry_status(
    store: &dyn DocumentStore,
    id: Uuid,
    status: SubmissionStatus,
) -> Result<()> {
    set_status(store, collections::NEPO_ENTRIES, id, status).await
}

pub async fn status_counts(store: &dyn DocumentStore, collection: &str) -> Result<StatusCounts> {
    let mut counts = StatusCounts::default();
    for status in SubmissionStatus::ALL {
        let total = store
            .find(collection, &Query::new().eq("status", status.as_str()))
            .await?
            .len();
        match status {
            SubmissionStatus::Pending => counts.pending = total,
            SubmissionStatus::Approved => counts.approved = total,
            SubmissionStatus::Rejected => counts.rejected = total,
        }
    }
    Ok(counts)
}
