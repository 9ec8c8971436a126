use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};
use rocket::tokio;

use crate::error::{Error, Result};
use crate::model::{
    common::{IdempotencyKey, VoterId},
    mongodb::Id,
};
use crate::store::{BallotStore, MarkOutcome, VoteStatusLedger};

use super::{bounded, EngineSettings};

/// The write half of casting a vote: the status transition and the ballot
/// append that follows it. Owns everything it needs so it can run on a
/// detached task.
pub(super) struct VoteCommit {
    pub ledger: Arc<dyn VoteStatusLedger>,
    pub ballots: Arc<dyn BallotStore>,
    pub settings: EngineSettings,
}

impl VoteCommit {
    pub async fn run(self, voter_id: VoterId, candidate_id: Id) -> Result<()> {
        let voted_at = Utc::now();
        let outcome = bounded(
            self.settings.store_timeout,
            self.ledger.conditional_mark_voted(&voter_id, voted_at),
        )
        .await?;
        if outcome == MarkOutcome::AlreadyVoted {
            info!("Rejected repeat vote from voter {voter_id}");
            return Err(Error::AlreadyVoted);
        }
        debug!("Voter {voter_id} marked as voted");

        append_ballot(self.ballots.as_ref(), &self.settings, candidate_id).await
    }
}

/// Append a ballot for a transition that has already committed.
///
/// A single key is used for every attempt, so an attempt whose write landed
/// but whose acknowledgement was lost is absorbed by the next one. Gives up
/// with [`Error::InternalInconsistency`] once the attempts are spent; the
/// voter stays marked as voted.
async fn append_ballot(
    ballots: &dyn BallotStore,
    settings: &EngineSettings,
    candidate_id: Id,
) -> Result<()> {
    let key = IdempotencyKey::generate();
    let attempts = settings.ballot_append_attempts.max(1);

    for attempt in 1..=attempts {
        match bounded(settings.store_timeout, ballots.append(candidate_id, key.clone())).await {
            Ok(()) => {
                if attempt > 1 {
                    info!("Ballot {key} stored on attempt {attempt}");
                }
                return Ok(());
            }
            Err(e) => {
                warn!("Ballot {key} append attempt {attempt}/{attempts} failed: {e}");
                if attempt < attempts {
                    tokio::time::sleep(settings.ballot_retry_delay).await;
                }
            }
        }
    }

    error!(
        "Ballot {key} for candidate {candidate_id} could not be stored after {attempts} \
         attempts; a voter is marked as voted without a ballot and needs reconciliation"
    );
    Err(Error::InternalInconsistency { candidate_id, key })
}
