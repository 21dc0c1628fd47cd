use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    error::Result,
    models::{PostCategory, TargetType, VoteType},
    redis::RedisClient,
};

/// Analytics event emitted after a successful user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementEvent {
    pub action: String,
    pub category: &'static str,
    pub label: String,
}

impl EngagementEvent {
    pub fn vote(target: TargetType, vote_type: VoteType) -> Self {
        Self {
            action: format!("{}_vote", target.as_str()),
            category: "engagement",
            label: format!("{}_vote", vote_type.as_str()),
        }
    }

    pub fn comment_created(is_reply: bool) -> Self {
        Self {
            action: "comment_create".to_string(),
            category: "community",
            label: if is_reply { "reply" } else { "comment" }.to_string(),
        }
    }

    pub fn post_created(category: PostCategory) -> Self {
        Self {
            action: "post_create".to_string(),
            category: "community",
            label: category.as_str().to_string(),
        }
    }

    pub fn submission(kind: &str) -> Self {
        Self {
            action: "submission_create".to_string(),
            category: "moderation",
            label: kind.to_string(),
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: &EngagementEvent) -> Result<()>;
}

/// Publishes events as JSON on a Redis pub/sub channel.
pub struct RedisEventSink {
    redis: Arc<RedisClient>,
    channel: String,
}

impl RedisEventSink {
    pub fn new(redis: Arc<RedisClient>, channel: impl Into<String>) -> Self {
        Self {
            redis,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventSink for RedisEventSink {
    async fn record(&self, event: &EngagementEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        self.redis.publish(&self.channel, &payload).await
    }
}

/// Record an event without letting sink failures reach the caller.
pub async fn emit(sink: &dyn EventSink, event: EngagementEvent) {
    if let Err(e) = sink.record(&event).await {
        tracing::warn!(action = %event.action, "Failed to record engagement event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<EngagementEvent>>,
        fail: bool,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn record(&self, event: &EngagementEvent) -> Result<()> {
            if self.fail {
                return Err(AppError::Unavailable("sink offline".to_string()));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn vote_events_name_target_and_direction() {
        let event = EngagementEvent::vote(TargetType::Comment, VoteType::Down);
        assert_eq!(event.action, "comment_vote");
        assert_eq!(event.category, "engagement");
        assert_eq!(event.label, "down_vote");
    }

    #[tokio::test]
    async fn emit_records_events() {
        let sink = RecordingSink::default();
        emit(&sink, EngagementEvent::comment_created(true)).await;
        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label, "reply");
    }

    #[tokio::test]
    async fn emit_swallows_sink_failures() {
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        emit(&sink, EngagementEvent::post_created(PostCategory::News)).await;
        assert!(sink.events.lock().unwrap().is_empty());
    }
}
