//! Types shared between the database and API representations.

mod idempotency;
pub use idempotency::IdempotencyKey;

mod voter_id;
pub use voter_id::{VoterId, VoterIdError};
