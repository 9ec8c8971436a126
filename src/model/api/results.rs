use serde::{Deserialize, Serialize};

use crate::model::api::id::ApiId;

/// Vote count for one candidate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsItem {
    pub candidate_id: ApiId,
    pub number: u32,
    pub president_name: String,
    pub vice_name: String,
    pub count: u64,
    /// Share of all ballots, rounded to two decimal places.
    pub percentage: f64,
}

/// Election results, ordered by ballot number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub total_votes: u64,
    pub results: Vec<ResultsItem>,
}

/// Cross-check between the vote status ledger and the ballot store.
///
/// Every voter marked as voted should have exactly one ballot. A shortfall
/// means a ballot append failed after its status transition committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub voters_marked: u64,
    pub ballots_recorded: u64,
    pub missing_ballots: u64,
}

impl ReconciliationReport {
    pub fn new(voters_marked: u64, ballots_recorded: u64) -> Self {
        Self {
            voters_marked,
            ballots_recorded,
            missing_ballots: voters_marked.saturating_sub(ballots_recorded),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.voters_marked == self.ballots_recorded
    }
}
