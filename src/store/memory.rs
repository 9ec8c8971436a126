use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::model::{
    common::{IdempotencyKey, VoterId},
    db::{Ballot, Candidate, NewCandidate, NewVoter, VoteStatus, Voter},
    mongodb::Id,
};

use super::{
    BallotStore, CandidateRegistry, EligibilityStore, MarkOutcome, StoreResult, VoteStatusLedger,
};

/// Ballots in append order, plus the keys already used.
#[derive(Default)]
struct BallotLog {
    ballots: Vec<Ballot>,
    keys: HashSet<IdempotencyKey>,
}

/// In-process implementation of every store, for tests and local runs.
///
/// Nothing is persisted. Every operation completes under a single short
/// lock acquisition, which is what makes the conditional mark atomic.
#[derive(Default)]
pub struct MemoryStore {
    voters: RwLock<HashMap<VoterId, Voter>>,
    candidates: RwLock<HashMap<Id, Candidate>>,
    statuses: Mutex<HashMap<VoterId, VoteStatus>>,
    ballots: Mutex<BallotLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a voter to the roll, replacing any record with the same voter ID.
    pub fn insert_voter(&self, voter: NewVoter) -> Id {
        let id = Id::new();
        let voter_id = voter.voter_id.clone();
        self.voters.write().insert(voter_id, Voter { id, voter });
        id
    }

    pub fn insert_candidate(&self, candidate: NewCandidate) -> Id {
        let id = Id::new();
        self.candidates
            .write()
            .insert(id, Candidate { id, candidate });
        id
    }

    /// Remove a candidate from the registry. Existing ballots are kept.
    pub fn remove_candidate(&self, id: &Id) -> Option<Candidate> {
        self.candidates.write().remove(id)
    }
}

#[rocket::async_trait]
impl EligibilityStore for MemoryStore {
    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<Voter>> {
        Ok(self.voters.read().get(voter_id).cloned())
    }
}

#[rocket::async_trait]
impl CandidateRegistry for MemoryStore {
    async fn get(&self, candidate_id: &Id) -> StoreResult<Option<Candidate>> {
        Ok(self.candidates.read().get(candidate_id).cloned())
    }

    async fn list_all(&self) -> StoreResult<Vec<Candidate>> {
        Ok(self.candidates.read().values().cloned().collect())
    }
}

#[rocket::async_trait]
impl VoteStatusLedger for MemoryStore {
    async fn conditional_mark_voted(
        &self,
        voter_id: &VoterId,
        voted_at: DateTime<Utc>,
    ) -> StoreResult<MarkOutcome> {
        let mut statuses = self.statuses.lock();
        let has_voted = statuses.get(voter_id).map_or(false, |s| s.has_voted);
        if has_voted {
            return Ok(MarkOutcome::AlreadyVoted);
        }
        statuses.insert(
            voter_id.clone(),
            VoteStatus::voted(voter_id.clone(), voted_at),
        );
        Ok(MarkOutcome::Performed)
    }

    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<VoteStatus>> {
        Ok(self.statuses.lock().get(voter_id).cloned())
    }

    async fn count_voted(&self) -> StoreResult<u64> {
        let voted = self.statuses.lock().values().filter(|s| s.has_voted).count();
        Ok(voted as u64)
    }
}

#[rocket::async_trait]
impl BallotStore for MemoryStore {
    async fn append(&self, candidate_id: Id, key: IdempotencyKey) -> StoreResult<()> {
        let mut log = self.ballots.lock();
        if log.keys.insert(key.clone()) {
            log.ballots.push(Ballot::new(candidate_id, key));
        }
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Ballot>> {
        Ok(self.ballots.lock().ballots.clone())
    }

    async fn counts_by_candidate(&self) -> StoreResult<HashMap<Id, u64>> {
        let mut counts = HashMap::new();
        for ballot in &self.ballots.lock().ballots {
            *counts.entry(ballot.candidate_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.ballots.lock().ballots.len() as u64)
    }
}
