//! The storage collaborators of the voting engine.
//!
//! Each collaborator is a separate trait so that the engine depends only on
//! the operations it needs. Both backends implement all four.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    common::{IdempotencyKey, VoterId},
    db::{Ballot, Candidate, VoteStatus, Voter},
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Failure to reach or use the underlying store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store answered, but with data that cannot be decoded. Retrying
    /// returns the same data.
    #[error("malformed stored data: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Whether the same operation may succeed if tried again.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Malformed(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of [`VoteStatusLedger::conditional_mark_voted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This call moved the voter from not-voted to voted.
    Performed,
    /// The voter was already marked, possibly by a concurrent call.
    AlreadyVoted,
}

/// Authoritative voter roll. Read-only.
#[rocket::async_trait]
pub trait EligibilityStore: Send + Sync {
    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<Voter>>;
}

/// Authoritative list of candidates. Read-only.
#[rocket::async_trait]
pub trait CandidateRegistry: Send + Sync {
    async fn get(&self, candidate_id: &Id) -> StoreResult<Option<Candidate>>;

    async fn list_all(&self) -> StoreResult<Vec<Candidate>>;
}

/// Per-voter record of whether a vote has been cast.
#[rocket::async_trait]
pub trait VoteStatusLedger: Send + Sync {
    /// Mark the voter as voted iff they are not already, as one indivisible
    /// operation. Of any number of concurrent calls for the same voter,
    /// exactly one observes [`MarkOutcome::Performed`].
    async fn conditional_mark_voted(
        &self,
        voter_id: &VoterId,
        voted_at: DateTime<Utc>,
    ) -> StoreResult<MarkOutcome>;

    /// Advisory lookup, never used for enforcement.
    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<VoteStatus>>;

    /// Number of voters marked as voted.
    async fn count_voted(&self) -> StoreResult<u64>;
}

/// Append-only collection of anonymous ballots.
#[rocket::async_trait]
pub trait BallotStore: Send + Sync {
    /// Append a ballot. Appending twice with the same key stores one ballot,
    /// and the repeat succeeds.
    async fn append(&self, candidate_id: Id, key: IdempotencyKey) -> StoreResult<()>;

    async fn list_all(&self) -> StoreResult<Vec<Ballot>>;

    /// Ballot counts grouped by candidate reference. Candidates with no
    /// ballots may be absent.
    async fn counts_by_candidate(&self) -> StoreResult<HashMap<Id, u64>>;

    async fn count(&self) -> StoreResult<u64>;
}
