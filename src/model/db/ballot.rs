use serde::{Deserialize, Serialize};

use crate::model::{common::IdempotencyKey, mongodb::Id};

/// An anonymous ballot, as stored in the database.
///
/// The primary key is the random idempotency key of the append that created
/// it, so a retried append cannot produce a second ballot. There is no
/// voter field and no timestamp: neither may ever be added, since either
/// would let a ballot be linked back to the vote status ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub key: IdempotencyKey,
    /// Foreign key candidate ID, checked at write time only.
    pub candidate_id: Id,
}

impl Ballot {
    pub fn new(candidate_id: Id, key: IdempotencyKey) -> Self {
        Self { key, candidate_id }
    }
}
