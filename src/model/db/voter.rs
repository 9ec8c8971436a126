use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{common::VoterId, mongodb::Id};

/// Core eligibility record, as imported from the voter roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Stored under the roll's student number key.
    #[serde(rename = "nim")]
    pub voter_id: VoterId,
    /// Full name. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Programme or department. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Records that omit the flag are eligible.
    #[serde(default = "eligible_by_default")]
    pub eligible: bool,
}

fn eligible_by_default() -> bool {
    true
}

impl VoterCore {
    /// An eligibility record with no informational fields.
    pub fn new(voter_id: VoterId, eligible: bool) -> Self {
        Self {
            voter_id,
            name: None,
            program: None,
            eligible,
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterCore {
        pub fn example(voter_id: &str) -> Self {
            Self::new(voter_id.parse().unwrap(), true)
        }

        pub fn ineligible_example(voter_id: &str) -> Self {
            Self::new(voter_id.parse().unwrap(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document};

    use super::*;

    #[test]
    fn missing_flag_means_eligible() {
        let document = doc! {
            "_id": Id::new(),
            "nim": "20200001",
            "name": "Mahasiswa 1",
        };
        let voter: Voter = from_document(document).unwrap();
        assert!(voter.eligible);
        assert_eq!(voter.name.as_deref(), Some("Mahasiswa 1"));
    }

    #[test]
    fn explicit_flag_is_respected() {
        let document = doc! {
            "_id": Id::new(),
            "nim": "20200001",
            "eligible": false,
        };
        let voter: Voter = from_document(document).unwrap();
        assert!(!voter.eligible);
    }
}
