//! Client-side vote control with optimistic updates.
//!
//! A widget is `Idle` until a click, `Pending` while the cast is in flight
//! (further clicks are refused), and `Reverting` after a failed cast while it
//! re-reads the authoritative counters and vote from the store. It always
//! settles back to `Idle`.

use crate::{
    error::{AppError, Result},
    models::{Counters, VoteAction, VoteResponse, VoteTarget, VoteType},
    score::ScoreTone,
    services::vote_service,
    store::DocumentStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetPhase {
    Idle,
    Pending,
    Reverting,
}

/// Counters plus the user's vote direction, as shown or as confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSnapshot {
    pub counters: Counters,
    pub user_vote: Option<VoteType>,
}

impl From<&VoteResponse> for VoteSnapshot {
    fn from(response: &VoteResponse) -> Self {
        Self {
            counters: Counters::new(response.upvotes, response.downvotes),
            user_vote: response.user_vote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoteWidget {
    target: VoteTarget,
    user_id: String,
    phase: WidgetPhase,
    displayed: VoteSnapshot,
    confirmed: VoteSnapshot,
}

impl VoteWidget {
    /// Starts from the counters the page was rendered with. The user's own
    /// vote is unknown until [`VoteWidget::load`] runs.
    pub fn new(target: VoteTarget, user_id: impl Into<String>, counters: Counters) -> Self {
        let snapshot = VoteSnapshot {
            counters,
            user_vote: None,
        };
        Self {
            target,
            user_id: user_id.into(),
            phase: WidgetPhase::Idle,
            displayed: snapshot,
            confirmed: snapshot,
        }
    }

    pub async fn load(&mut self, store: &dyn DocumentStore) -> Result<()> {
        let user_vote = vote_service::current_vote(store, &self.user_id, self.target).await?;
        self.confirmed.user_vote = user_vote;
        self.displayed.user_vote = user_vote;
        Ok(())
    }

    pub fn phase(&self) -> WidgetPhase {
        self.phase
    }

    /// Buttons are disabled while anything is in flight.
    pub fn is_busy(&self) -> bool {
        self.phase != WidgetPhase::Idle
    }

    pub fn displayed(&self) -> VoteSnapshot {
        self.displayed
    }

    pub fn score(&self) -> i64 {
        self.displayed.counters.score()
    }

    pub fn tone(&self) -> ScoreTone {
        self.displayed.counters.tone()
    }

    /// Apply the click locally and enter `Pending`.
    pub fn begin(&mut self, vote_type: VoteType) -> Result<VoteAction> {
        if self.phase != WidgetPhase::Idle {
            return Err(AppError::BadRequest("A vote is already in flight".to_string()));
        }

        let action = vote_service::resolve_action(self.displayed.user_vote, vote_type);
        self.displayed
            .counters
            .apply(&vote_service::counter_deltas(action, vote_type));
        self.displayed.user_vote = vote_service::resulting_vote(action, vote_type);
        self.phase = WidgetPhase::Pending;
        Ok(action)
    }

    /// The store accepted the vote; its counters become the confirmed state.
    pub fn confirm(&mut self, response: &VoteResponse) {
        let snapshot = VoteSnapshot::from(response);
        self.displayed = snapshot;
        self.confirmed = snapshot;
        self.phase = WidgetPhase::Idle;
    }

    pub fn fail(&mut self) {
        self.phase = WidgetPhase::Reverting;
    }

    /// Leave `Reverting` with the re-read state, or the last confirmed one
    /// when the re-read itself failed.
    pub fn reconcile(&mut self, authoritative: Option<VoteSnapshot>) {
        let snapshot = authoritative.unwrap_or(self.confirmed);
        self.displayed = snapshot;
        self.confirmed = snapshot;
        self.phase = WidgetPhase::Idle;
    }

    async fn read_authoritative(&self, store: &dyn DocumentStore) -> Result<VoteSnapshot> {
        let counters = vote_service::target_counters(store, self.target).await?;
        let user_vote = vote_service::current_vote(store, &self.user_id, self.target).await?;
        Ok(VoteSnapshot {
            counters,
            user_vote,
        })
    }

    /// Full click cycle: optimistic update, cast, then confirm or revert.
    /// The cast error is returned after the widget has settled.
    pub async fn cast(
        &mut self,
        store: &dyn DocumentStore,
        vote_type: VoteType,
    ) -> Result<VoteResponse> {
        self.begin(vote_type)?;

        match vote_service::cast_vote(store, &self.user_id, self.target, vote_type).await {
            Ok(response) => {
                self.confirm(&response);
                Ok(response)
            }
            Err(err) => {
                tracing::warn!(target_id = %self.target.id, "Vote failed, reverting: {}", err);
                self.fail();
                let authoritative = match self.read_authoritative(store).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        tracing::warn!(target_id = %self.target.id, "Re-read after failed vote failed: {}", e);
                        None
                    }
                };
                self.reconcile(authoritative);
                Err(err)
            }
        }
    }
}
