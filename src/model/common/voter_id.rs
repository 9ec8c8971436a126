use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a string was not accepted as a [`VoterId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoterIdError {
    #[error("voter ID must be at least {min} characters, got {len}", min = VoterId::MIN_LEN)]
    TooShort { len: usize },
    #[error("voter ID must be at most {max} characters, got {len}", max = VoterId::MAX_LEN)]
    TooLong { len: usize },
}

/// An opaque voter identifier, e.g. a student number.
///
/// Construction enforces the length bounds, so any `VoterId` in hand is
/// well-formed and safe to use as a lookup key.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoterId(String);

impl VoterId {
    pub const MIN_LEN: usize = 8;
    pub const MAX_LEN: usize = 20;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VoterId {
    type Error = VoterIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let len = value.chars().count();
        if len < Self::MIN_LEN {
            Err(VoterIdError::TooShort { len })
        } else if len > Self::MAX_LEN {
            Err(VoterIdError::TooLong { len })
        } else {
            Ok(Self(value))
        }
    }
}

impl FromStr for VoterId {
    type Err = VoterIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<VoterId> for String {
    fn from(id: VoterId) -> Self {
        id.0
    }
}

impl Deref for VoterId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds() {
        assert!("20200001".parse::<VoterId>().is_ok());
        assert!("a".repeat(VoterId::MAX_LEN).parse::<VoterId>().is_ok());
    }

    #[test]
    fn rejects_out_of_bounds() {
        assert_eq!(
            "2020001".parse::<VoterId>(),
            Err(VoterIdError::TooShort { len: 7 })
        );
        assert_eq!(
            "1".repeat(21).parse::<VoterId>(),
            Err(VoterIdError::TooLong { len: 21 })
        );
        assert!("".parse::<VoterId>().is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Eight characters, sixteen bytes.
        assert!("éééééééé".parse::<VoterId>().is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<VoterId, _> = rocket::serde::json::serde_json::from_str("\"20200001\"");
        assert!(ok.is_ok());
        let bad: Result<VoterId, _> = rocket::serde::json::serde_json::from_str("\"short\"");
        assert!(bad.is_err());
    }
}
