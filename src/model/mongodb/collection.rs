use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{Ballot, Candidate, NewCandidate, NewVoter, VoteStatus, Voter};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Voter collections
const VOTERS: &str = "voter";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}
impl MongoCollection for NewVoter {
    const NAME: &'static str = VOTERS;
}

// Vote status collection
const VOTE_STATUS: &str = "voterstatus";
impl MongoCollection for VoteStatus {
    const NAME: &'static str = VOTE_STATUS;
}

// Candidate collections
const CANDIDATES: &str = "candidate";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Ballot collection
const BALLOTS: &str = "vote";
impl MongoCollection for Ballot {
    const NAME: &'static str = BALLOTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique index on `voterstatus.nim` is what makes the conditional
/// upsert in the ledger atomic per voter; the ledger is unsafe without it.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"nim": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Vote status collection.
    let status_index = IndexModel::builder()
        .keys(doc! {"nim": 1})
        .options(unique.clone())
        .build();
    Coll::<VoteStatus>::from_db(db)
        .create_index(status_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"number": 1})
        .options(unique.clone())
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Ballots are keyed by their idempotency key in `_id`, which is
    // already unique; index the candidate reference for tallying.
    let ballot_index = IndexModel::builder()
        .keys(doc! {"candidate_id": 1})
        .build();
    Coll::<Ballot>::from_db(db)
        .create_index(ballot_index, None)
        .await?;

    Ok(())
}
