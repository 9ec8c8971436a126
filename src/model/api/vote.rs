use serde::{Deserialize, Serialize};

/// Request to cast a vote. Both fields are validated by the voting engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: String,
    /// Hex object ID of the chosen candidate.
    pub candidate_id: String,
}

/// Acknowledgement of a recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAccepted {
    pub success: bool,
}
