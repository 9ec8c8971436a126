//! The voting engine: eligibility checks, the one-vote-per-voter protocol,
//! and tallying.
//!
//! Casting a vote is a two-step write across two stores. The vote status
//! ledger is flipped first with a single atomic conditional transition;
//! only the caller that performed the transition goes on to append a
//! ballot. Nothing that touches the ballot store is ever given the voter ID.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rocket::tokio;

use crate::error::{Error, Result};
use crate::model::{api::voter::ValidateResponse, common::VoterId, mongodb::Id};
use crate::store::{
    BallotStore, CandidateRegistry, EligibilityStore, StoreError, StoreResult, VoteStatusLedger,
};

mod commit;
mod tally;

pub use tally::{aggregate, percentage};

use commit::VoteCommit;

/// Tunables for the engine's interaction with its stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound on any single store operation.
    pub store_timeout: Duration,
    /// Total ballot append attempts after a successful status transition.
    pub ballot_append_attempts: u32,
    /// Pause between ballot append attempts.
    pub ballot_retry_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            ballot_append_attempts: 3,
            ballot_retry_delay: Duration::from_millis(200),
        }
    }
}

/// Run a store operation, failing with [`StoreError::Timeout`] if it does
/// not finish within `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// The vote-casting and tallying engine. Cheap to clone.
#[derive(Clone)]
pub struct VotingEngine {
    eligibility: Arc<dyn EligibilityStore>,
    candidates: Arc<dyn CandidateRegistry>,
    ledger: Arc<dyn VoteStatusLedger>,
    ballots: Arc<dyn BallotStore>,
    settings: EngineSettings,
}

impl VotingEngine {
    /// Create an engine whose collaborators all live in one store.
    pub fn new<S>(store: Arc<S>, settings: EngineSettings) -> Self
    where
        S: EligibilityStore + CandidateRegistry + VoteStatusLedger + BallotStore + 'static,
    {
        Self {
            eligibility: store.clone(),
            candidates: store.clone(),
            ledger: store.clone(),
            ballots: store,
            settings,
        }
    }

    /// Create an engine from separately provided collaborators.
    pub fn from_parts(
        eligibility: Arc<dyn EligibilityStore>,
        candidates: Arc<dyn CandidateRegistry>,
        ledger: Arc<dyn VoteStatusLedger>,
        ballots: Arc<dyn BallotStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            eligibility,
            candidates,
            ledger,
            ballots,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Report whether the voter may vote and whether they already have.
    ///
    /// Advisory only: `cast_vote` performs its own checks. Unknown voters
    /// are reported as ineligible. Never writes.
    pub async fn validate(&self, voter_id: &str) -> Result<ValidateResponse> {
        let voter_id: VoterId = voter_id.parse()?;
        let limit = self.settings.store_timeout;

        let voter = match bounded(limit, self.eligibility.get(&voter_id)).await? {
            Some(voter) => voter,
            None => {
                return Ok(ValidateResponse {
                    voter_id: voter_id.into(),
                    eligible: false,
                    has_voted: false,
                })
            }
        };
        let has_voted = bounded(limit, self.ledger.get(&voter_id))
            .await?
            .map_or(false, |status| status.has_voted);

        Ok(ValidateResponse {
            voter_id: voter_id.into(),
            eligible: voter.eligible,
            has_voted,
        })
    }

    /// Cast a vote for `candidate_id` on behalf of `voter_id`.
    ///
    /// Of any number of calls for the same voter, at most one ever succeeds;
    /// the rest fail with [`Error::AlreadyVoted`]. Once the voter has been
    /// marked as voted the ballot append runs to completion on its own task,
    /// even if this future is dropped.
    pub async fn cast_vote(&self, voter_id: &str, candidate_id: &str) -> Result<()> {
        let voter_id: VoterId = voter_id.parse()?;
        let candidate_id: Id = candidate_id.parse()?;
        let limit = self.settings.store_timeout;

        let candidate = bounded(limit, self.candidates.get(&candidate_id))
            .await?
            .ok_or(Error::CandidateNotFound(candidate_id))?;

        match bounded(limit, self.eligibility.get(&voter_id)).await? {
            Some(voter) if voter.eligible => {}
            _ => {
                info!("Rejected vote from ineligible voter {voter_id}");
                return Err(Error::NotEligible);
            }
        }

        let commit = VoteCommit {
            ledger: self.ledger.clone(),
            ballots: self.ballots.clone(),
            settings: self.settings.clone(),
        };
        let outcome = tokio::spawn(commit.run(voter_id, candidate.id))
            .await
            .map_err(|e| Error::Internal(format!("vote commit task failed: {e}")))?;
        if outcome.is_ok() {
            debug!("Vote accepted");
        }
        outcome
    }
}
