use chrono::{DateTime, Utc};
use mongodb::bson::{Bson, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::model::common::VoterId;

/// Whether a voter has cast their vote. The only voter-keyed record the
/// voting engine ever writes.
///
/// An absent record means the voter has not voted. Once `has_voted` is set
/// it is never cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteStatus {
    #[serde(rename = "nim")]
    pub voter_id: VoterId,
    #[serde(default)]
    pub has_voted: bool,
    /// A BSON datetime, or an RFC 3339 string in records written by the
    /// legacy system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voted_at: Option<Bson>,
}

impl VoteStatus {
    /// A record for a voter who has just voted.
    pub fn voted(voter_id: VoterId, voted_at: DateTime<Utc>) -> Self {
        Self {
            voter_id,
            has_voted: true,
            voted_at: Some(Bson::DateTime(BsonDateTime::from_chrono(voted_at))),
        }
    }

    /// When the vote was cast, if it has been.
    pub fn voted_at(&self) -> Option<DateTime<Utc>> {
        match self.voted_at.as_ref()? {
            Bson::DateTime(t) => Some(t.to_chrono()),
            Bson::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document};

    use super::*;

    #[test]
    fn pre_populated_record_defaults_to_not_voted() {
        let status: VoteStatus = from_document(doc! { "nim": "20200001" }).unwrap();
        assert!(!status.has_voted);
        assert_eq!(status.voted_at(), None);
    }

    #[test]
    fn legacy_string_timestamp_is_read() {
        let status: VoteStatus = from_document(doc! {
            "nim": "20200001",
            "has_voted": true,
            "voted_at": "2024-03-01T08:30:00.250000+00:00",
        })
        .unwrap();
        assert!(status.has_voted);
        assert_eq!(
            status.voted_at().unwrap().timestamp_millis(),
            1_709_281_800_250
        );
    }

    #[test]
    fn voted_record_keeps_timestamp() {
        let now = Utc::now();
        let status = VoteStatus::voted("20200001".parse().unwrap(), now);
        assert!(status.has_voted);
        // BSON datetimes have millisecond precision.
        assert_eq!(
            status.voted_at().unwrap().timestamp_millis(),
            now.timestamp_millis()
        );
    }
}
