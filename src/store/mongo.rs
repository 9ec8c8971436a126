use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, trace};
use mongodb::{
    bson::{doc, from_document, Bson, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Database,
};
use rocket::futures::TryStreamExt;
use serde::Deserialize;

use crate::model::{
    common::{IdempotencyKey, VoterId},
    db::{Ballot, Candidate, VoteStatus, Voter},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{
    BallotStore, CandidateRegistry, EligibilityStore, MarkOutcome, StoreError, StoreResult,
    VoteStatusLedger,
};

/// MongoDB-backed implementation of every store.
///
/// Requires the indexes from [`crate::model::mongodb::ensure_indexes_exist`].
#[derive(Clone)]
pub struct MongoStore {
    voters: Coll<Voter>,
    candidates: Coll<Candidate>,
    statuses: Coll<VoteStatus>,
    ballots: Coll<Ballot>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            voters: Coll::from_db(db),
            candidates: Coll::from_db(db),
            statuses: Coll::from_db(db),
            ballots: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl EligibilityStore for MongoStore {
    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<Voter>> {
        let filter = doc! { "nim": voter_id.as_str() };
        Ok(self.voters.find_one(filter, None).await?)
    }
}

#[rocket::async_trait]
impl CandidateRegistry for MongoStore {
    async fn get(&self, candidate_id: &Id) -> StoreResult<Option<Candidate>> {
        Ok(self.candidates.find_one(candidate_id.as_doc(), None).await?)
    }

    async fn list_all(&self) -> StoreResult<Vec<Candidate>> {
        let candidates = self
            .candidates
            .find(None, None)
            .await?
            .try_collect()
            .await?;
        Ok(candidates)
    }
}

#[rocket::async_trait]
impl VoteStatusLedger for MongoStore {
    async fn conditional_mark_voted(
        &self,
        voter_id: &VoterId,
        voted_at: DateTime<Utc>,
    ) -> StoreResult<MarkOutcome> {
        // Matches a missing record (upserted) or a pre-populated one that has
        // not voted. If the voter has voted, the filter misses, the upsert
        // collides with the unique `nim` index, and the server rejects
        // it. Concurrent upserts for a fresh voter collide the same way.
        let filter = doc! {
            "nim": voter_id.as_str(),
            "has_voted": { "$ne": true },
        };
        let update = doc! {
            "$set": {
                "has_voted": true,
                "voted_at": BsonDateTime::from_chrono(voted_at),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        match self
            .statuses
            .find_one_and_update(filter, update, options)
            .await
        {
            Ok(_) => Ok(MarkOutcome::Performed),
            Err(e) if is_duplicate_key_error(&e) => {
                trace!("Conditional mark lost to an existing vote status");
                Ok(MarkOutcome::AlreadyVoted)
            }
            Err(e) => Err(StoreError::Db(e)),
        }
    }

    async fn get(&self, voter_id: &VoterId) -> StoreResult<Option<VoteStatus>> {
        let filter = doc! { "nim": voter_id.as_str() };
        Ok(self.statuses.find_one(filter, None).await?)
    }

    async fn count_voted(&self) -> StoreResult<u64> {
        let filter = doc! { "has_voted": true };
        Ok(self.statuses.count_documents(filter, None).await?)
    }
}

/// Row produced by the `$group` stage in [`MongoStore::counts_by_candidate`].
#[derive(Deserialize)]
struct CandidateCount {
    #[serde(rename = "_id")]
    candidate_id: Bson,
    count: i64,
}

impl CandidateCount {
    /// Ballots imported from older rolls reference the candidate by its hex
    /// string rather than an object ID.
    fn candidate(&self) -> StoreResult<Id> {
        match &self.candidate_id {
            Bson::ObjectId(id) => Ok(Id::from(*id)),
            Bson::String(hex) => hex
                .parse()
                .map_err(|e| StoreError::Malformed(format!("ballot candidate '{hex}': {e}"))),
            other => Err(StoreError::Malformed(format!(
                "ballot candidate of type {:?}",
                other.element_type()
            ))),
        }
    }
}

#[rocket::async_trait]
impl BallotStore for MongoStore {
    async fn append(&self, candidate_id: Id, key: IdempotencyKey) -> StoreResult<()> {
        let ballot = Ballot::new(candidate_id, key);
        match self.ballots.insert_one(&ballot, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key_error(&e) => {
                // An earlier attempt with this key landed.
                debug!("Ballot {} already stored", ballot.key);
                Ok(())
            }
            Err(e) => Err(StoreError::Db(e)),
        }
    }

    async fn list_all(&self) -> StoreResult<Vec<Ballot>> {
        let ballots = self.ballots.find(None, None).await?.try_collect().await?;
        Ok(ballots)
    }

    async fn counts_by_candidate(&self) -> StoreResult<HashMap<Id, u64>> {
        let pipeline = vec![doc! {
            "$group": { "_id": "$candidate_id", "count": { "$sum": 1 } }
        }];
        let rows: Vec<Document> = self
            .ballots
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let row: CandidateCount = from_document(row)
                .map_err(|e| StoreError::Malformed(format!("ballot group: {e}")))?;
            *counts.entry(row.candidate()?).or_insert(0) += u64::try_from(row.count).unwrap_or(0);
        }
        Ok(counts)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.ballots.count_documents(None, None).await?)
    }
}
