use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::Candidate};

/// API-friendly representation of a candidate pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: ApiId,
    pub number: u32,
    pub president_name: String,
    pub vice_name: String,
    pub vision: Option<String>,
    pub mission: Option<Vec<String>>,
    pub photo_url: Option<String>,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            number: core.number,
            president_name: core.president_name,
            vice_name: core.vice_name,
            vision: core.vision,
            mission: core.mission,
            photo_url: core.photo_url,
        }
    }
}
