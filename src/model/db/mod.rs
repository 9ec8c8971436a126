//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

mod ballot;
pub use ballot::Ballot;

mod candidate;
pub use candidate::{Candidate, CandidateCore, NewCandidate};

mod vote_status;
pub use vote_status::VoteStatus;

mod voter;
pub use voter::{NewVoter, Voter, VoterCore};
