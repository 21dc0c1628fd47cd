use chrono::Utc;
use serde_json::{Map, json};

use crate::{
    error::{AppError, Result},
    models::{Counters, NewVote, Vote, VoteAction, VoteResponse, VoteTarget, VoteType},
    store::{Direction, DocumentStore, Query, collections},
};

/// Decide what casting `requested` does given the user's confirmed vote.
pub fn resolve_action(existing: Option<VoteType>, requested: VoteType) -> VoteAction {
    match existing {
        None => VoteAction::Add,
        Some(current) if current == requested => VoteAction::Retract,
        Some(_) => VoteAction::Flip,
    }
}

/// Counter deltas an action applies to its target. A flip is one pair of
/// deltas so it can be written in a single update.
pub fn counter_deltas(action: VoteAction, requested: VoteType) -> Vec<(&'static str, i64)> {
    match action {
        VoteAction::Add => vec![(requested.counter_field(), 1)],
        VoteAction::Retract => vec![(requested.counter_field(), -1)],
        VoteAction::Flip => vec![
            (requested.opposite().counter_field(), -1),
            (requested.counter_field(), 1),
        ],
    }
}

/// The user's vote direction once the action has been applied.
pub fn resulting_vote(action: VoteAction, requested: VoteType) -> Option<VoteType> {
    match action {
        VoteAction::Retract => None,
        VoteAction::Add | VoteAction::Flip => Some(requested),
    }
}

/// Vote rows for the (user, target) tuple, oldest first. More than one row
/// only exists after a same-tuple race.
async fn find_votes(store: &dyn DocumentStore, user_id: &str, target: VoteTarget) -> Result<Vec<Vote>> {
    let query = Query::new()
        .eq("userId", user_id)
        .eq("targetId", target.id.to_string())
        .eq("targetType", target.kind.as_str())
        .order_by("createdAt", Direction::Asc);

    store
        .find(collections::VOTES, &query)
        .await?
        .iter()
        .map(|doc| doc.decode::<Vote>())
        .collect()
}

pub async fn current_vote(
    store: &dyn DocumentStore,
    user_id: &str,
    target: VoteTarget,
) -> Result<Option<VoteType>> {
    let votes = find_votes(store, user_id, target).await?;
    Ok(votes.first().map(|vote| vote.vote_type))
}

pub async fn target_counters(store: &dyn DocumentStore, target: VoteTarget) -> Result<Counters> {
    let doc = store
        .get(target.kind.collection(), target.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", target.kind.as_str())))?;

    doc.decode::<Counters>()
}

/// Apply one vote click for `user_id` on `target`.
///
/// No existing vote adds one, the same direction retracts it, and the
/// opposite direction flips it in place. Counters on the target only ever
/// move by relative deltas.
pub async fn cast_vote(
    store: &dyn DocumentStore,
    user_id: &str,
    target: VoteTarget,
    vote_type: VoteType,
) -> Result<VoteResponse> {
    // Fail before touching the ledger if the target is gone.
    target_counters(store, target).await?;

    let existing = find_votes(store, user_id, target).await?.into_iter().next();
    let action = resolve_action(existing.as_ref().map(|vote| vote.vote_type), vote_type);

    match existing {
        None => {
            let vote = NewVote {
                user_id,
                target_id: target.id,
                target_type: target.kind,
                vote_type,
                created_at: Utc::now(),
            };
            store
                .insert(collections::VOTES, serde_json::to_value(&vote)?)
                .await?;
        }
        Some(vote) if action == VoteAction::Retract => {
            store.delete(collections::VOTES, vote.id).await?;
        }
        Some(vote) => {
            let mut fields = Map::new();
            fields.insert("voteType".to_string(), json!(vote_type));
            store.set_fields(collections::VOTES, vote.id, fields).await?;
        }
    }

    let deltas = counter_deltas(action, vote_type);
    store
        .update_counters(target.kind.collection(), target.id, &deltas)
        .await?;

    tracing::debug!(
        target_id = %target.id,
        target_type = target.kind.as_str(),
        ?action,
        "Vote applied"
    );

    let counters = target_counters(store, target).await?;

    Ok(VoteResponse {
        action,
        user_vote: resulting_vote(action, vote_type),
        upvotes: counters.upvotes,
        downvotes: counters.downvotes,
        score: counters.score(),
        score_tone: counters.tone(),
        score_class: counters.tone().css_class(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rstest::rstest;
    use serde_json::json;
    use uuid::Uuid;

    async fn seed_post(store: &MemoryStore) -> VoteTarget {
        let id = store
            .insert(
                collections::POSTS,
                json!({ "title": "Budget leak", "upvotes": 0, "downvotes": 0, "commentCount": 0 }),
            )
            .await
            .unwrap();
        VoteTarget::post(id)
    }

    #[rstest]
    #[case(None, VoteType::Up, VoteAction::Add)]
    #[case(Some(VoteType::Up), VoteType::Up, VoteAction::Retract)]
    #[case(Some(VoteType::Down), VoteType::Down, VoteAction::Retract)]
    #[case(Some(VoteType::Down), VoteType::Up, VoteAction::Flip)]
    fn actions_follow_existing_vote(
        #[case] existing: Option<VoteType>,
        #[case] requested: VoteType,
        #[case] expected: VoteAction,
    ) {
        assert_eq!(resolve_action(existing, requested), expected);
    }

    #[test]
    fn flip_moves_one_vote_between_counters() {
        let deltas = counter_deltas(VoteAction::Flip, VoteType::Down);
        assert_eq!(deltas, vec![("upvotes", -1), ("downvotes", 1)]);
    }

    #[tokio::test]
    async fn scenario_add_retract_add_flip() {
        let store = MemoryStore::new();
        let post = seed_post(&store).await;

        let up = cast_vote(&store, "device-a", post, VoteType::Up).await.unwrap();
        assert_eq!((up.action, up.score, up.user_vote), (VoteAction::Add, 1, Some(VoteType::Up)));

        let off = cast_vote(&store, "device-a", post, VoteType::Up).await.unwrap();
        assert_eq!((off.action, off.score, off.user_vote), (VoteAction::Retract, 0, None));

        let down = cast_vote(&store, "device-a", post, VoteType::Down).await.unwrap();
        assert_eq!((down.action, down.score), (VoteAction::Add, -1));

        let flip = cast_vote(&store, "device-a", post, VoteType::Up).await.unwrap();
        assert_eq!(flip.action, VoteAction::Flip);
        assert_eq!((flip.upvotes, flip.downvotes, flip.score), (1, 0, 1));
        assert_eq!(store.count(collections::VOTES).await, 1);
    }

    #[rstest]
    #[case(1, true)]
    #[case(2, false)]
    #[case(3, true)]
    #[case(6, false)]
    #[tokio::test]
    async fn repeated_clicks_toggle(#[case] clicks: usize, #[case] active: bool) {
        let store = MemoryStore::new();
        let post = seed_post(&store).await;

        for _ in 0..clicks {
            cast_vote(&store, "device-a", post, VoteType::Down).await.unwrap();
        }

        let counters = target_counters(&store, post).await.unwrap();
        let expected = if active { 1 } else { 0 };
        assert_eq!(counters, Counters::new(0, expected));
        assert_eq!(current_vote(&store, "device-a", post).await.unwrap().is_some(), active);
        assert_eq!(store.count(collections::VOTES).await, expected as usize);
    }

    #[tokio::test]
    async fn votes_are_tallied_per_user() {
        let store = MemoryStore::new();
        let post = seed_post(&store).await;

        cast_vote(&store, "device-a", post, VoteType::Up).await.unwrap();
        cast_vote(&store, "device-b", post, VoteType::Up).await.unwrap();
        let last = cast_vote(&store, "device-c", post, VoteType::Down).await.unwrap();

        assert_eq!((last.upvotes, last.downvotes, last.score), (2, 1, 1));
        assert_eq!(
            current_vote(&store, "device-b", post).await.unwrap(),
            Some(VoteType::Up)
        );
    }

    #[tokio::test]
    async fn post_and_comment_ledgers_are_separate() {
        let store = MemoryStore::new();
        let post = seed_post(&store).await;
        let comment_id = store
            .insert(collections::COMMENTS, json!({ "upvotes": 0, "downvotes": 0 }))
            .await
            .unwrap();
        let comment = VoteTarget::comment(comment_id);

        cast_vote(&store, "device-a", post, VoteType::Up).await.unwrap();
        let on_comment = cast_vote(&store, "device-a", comment, VoteType::Up).await.unwrap();

        assert_eq!(on_comment.action, VoteAction::Add);
        assert_eq!(target_counters(&store, post).await.unwrap(), Counters::new(1, 0));
    }

    #[tokio::test]
    async fn oldest_duplicate_row_is_acted_on() {
        let store = MemoryStore::new();
        let post = seed_post(&store).await;
        for (vote_type, created_at) in [("down", "2025-09-08T10:00:00Z"), ("up", "2025-09-08T10:00:01Z")] {
            store
                .insert(
                    collections::VOTES,
                    json!({
                        "userId": "device-a",
                        "targetId": post.id.to_string(),
                        "targetType": "post",
                        "voteType": vote_type,
                        "createdAt": created_at,
                    }),
                )
                .await
                .unwrap();
        }

        let response = cast_vote(&store, "device-a", post, VoteType::Down).await.unwrap();
        assert_eq!(response.action, VoteAction::Retract);
    }

    #[tokio::test]
    async fn missing_target_leaves_ledger_untouched() {
        let store = MemoryStore::new();
        let err = cast_vote(&store, "device-a", VoteTarget::post(Uuid::new_v4()), VoteType::Up)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.count(collections::VOTES).await, 0);
    }
}
