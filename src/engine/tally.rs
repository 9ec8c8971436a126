use std::collections::HashMap;

use log::warn;

use crate::error::Result;
use crate::model::{
    api::{
        candidate::CandidateDesc,
        results::{ElectionResults, ReconciliationReport, ResultsItem},
    },
    db::Candidate,
    mongodb::Id,
};

use crate::store::{BallotStore, CandidateRegistry, VoteStatusLedger};

use super::{bounded, VotingEngine};

impl VotingEngine {
    /// Compute results from the current contents of the ballot store.
    ///
    /// Takes no locks, so it may run alongside any number of votes; each
    /// read sees committed ballots only.
    pub async fn tally(&self) -> Result<ElectionResults> {
        let limit = self.settings.store_timeout;
        let candidates = bounded(limit, self.candidates.list_all()).await?;
        let counts = bounded(limit, self.ballots.counts_by_candidate()).await?;
        Ok(aggregate(candidates, &counts))
    }

    /// All candidates, ordered by ballot number.
    pub async fn candidates(&self) -> Result<Vec<CandidateDesc>> {
        let mut candidates =
            bounded(self.settings.store_timeout, self.candidates.list_all()).await?;
        candidates.sort_by_key(|c| c.number);
        Ok(candidates.into_iter().map(Into::into).collect())
    }

    /// Compare voters marked as voted against ballots stored.
    pub async fn reconcile(&self) -> Result<ReconciliationReport> {
        let limit = self.settings.store_timeout;
        let voters_marked = bounded(limit, self.ledger.count_voted()).await?;
        let ballots_recorded = bounded(limit, self.ballots.count()).await?;
        let report = ReconciliationReport::new(voters_marked, ballots_recorded);
        if !report.is_consistent() {
            warn!(
                "Reconciliation mismatch: {voters_marked} voters marked, \
                 {ballots_recorded} ballots stored"
            );
        }
        Ok(report)
    }
}

/// Build results for `candidates` from per-candidate ballot counts.
///
/// Ballots for candidates no longer in the registry count towards the total
/// but get no entry of their own. Percentages are rounded independently and
/// so need not sum to exactly 100.
pub fn aggregate(mut candidates: Vec<Candidate>, counts: &HashMap<Id, u64>) -> ElectionResults {
    let mut per_candidate: HashMap<Id, u64> = candidates.iter().map(|c| (c.id, 0)).collect();
    for (candidate_id, count) in counts {
        *per_candidate.entry(*candidate_id).or_insert(0) += count;
    }
    let total_votes: u64 = per_candidate.values().sum();

    candidates.sort_by_key(|c| c.number);
    let results: Vec<ResultsItem> = candidates
        .into_iter()
        .map(|c| {
            let count = per_candidate.get(&c.id).copied().unwrap_or(0);
            ResultsItem {
                candidate_id: c.id.into(),
                number: c.number,
                percentage: percentage(count, total_votes),
                count,
                president_name: c.candidate.president_name,
                vice_name: c.candidate.vice_name,
            }
        })
        .collect();

    let attributed: u64 = results.iter().map(|r| r.count).sum();
    if attributed < total_votes {
        warn!(
            "{} ballots reference candidates that are no longer registered",
            total_votes - attributed
        );
    }

    ElectionResults {
        total_votes,
        results,
    }
}

/// `count` as a percentage of `total`, rounded to two decimal places with
/// ties going to the even digit. Zero when there are no votes at all.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let share = count as f64 / total as f64 * 100.0;
    (share * 100.0).round_ties_even() / 100.0
}
