use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate pair data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    /// Ballot number, unique and starting from 1.
    pub number: u32,
    pub president_name: String,
    pub vice_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example1() -> Self {
            Self {
                number: 1,
                president_name: "Andi Pratama".to_string(),
                vice_name: "Siti Lestari".to_string(),
                vision: Some("Transparansi dan inovasi kampus.".to_string()),
                mission: Some(vec![
                    "Digitalisasi layanan".to_string(),
                    "Pemberdayaan UKM".to_string(),
                ]),
                photo_url: None,
            }
        }

        pub fn example2() -> Self {
            Self {
                number: 2,
                president_name: "Budi Santoso".to_string(),
                vice_name: "Rina Kartika".to_string(),
                vision: None,
                mission: None,
                photo_url: Some("https://picsum.photos/seed/cand2/400/400".to_string()),
            }
        }
    }
}
