use serde::{Deserialize, Serialize};

/// Request to check whether a voter may vote.
///
/// The ID is kept as a raw string so that a malformed one surfaces as our
/// own `InvalidInput` error rather than a body parsing failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub voter_id: String,
}

/// Advisory eligibility information for a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub voter_id: String,
    pub eligible: bool,
    pub has_voted: bool,
}
