use serde::{Deserialize, Serialize};

use crate::config::StorageBackend;

/// Most collection names listed in a [`DatabaseHealth`].
pub const LISTED_COLLECTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Unavailable,
    /// No database is in use, e.g. with in-memory storage.
    NotConfigured,
}

/// Reachability of the database, as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseHealth {
    pub fn not_configured() -> Self {
        Self {
            status: ConnectionStatus::NotConfigured,
            name: None,
            collections: Vec::new(),
            error: None,
        }
    }

    /// A reachable database. Only the first [`LISTED_COLLECTIONS`] names, in
    /// order, are kept.
    pub fn connected(name: impl Into<String>, mut collections: Vec<String>) -> Self {
        collections.sort();
        collections.truncate(LISTED_COLLECTIONS);
        Self {
            status: ConnectionStatus::Connected,
            name: Some(name.into()),
            collections,
            error: None,
        }
    }

    pub fn unavailable(name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            status: ConnectionStatus::Unavailable,
            name: Some(name.into()),
            collections: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Diagnostic report served by the health endpoint. Always sent with a
/// success status; failures are described in the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub backend: String,
    /// Configured storage backend, if the server was built from config.
    pub storage: Option<StorageBackend>,
    pub database: DatabaseHealth,
}

impl HealthReport {
    pub fn running(storage: Option<StorageBackend>, database: DatabaseHealth) -> Self {
        Self {
            backend: "running".to_string(),
            storage,
            database,
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::{json, serde_json};

    use super::*;

    #[test]
    fn collection_listing_is_capped() {
        let names: Vec<String> = (0..15).rev().map(|i| format!("c{i:02}")).collect();
        let health = DatabaseHealth::connected("election", names);
        assert_eq!(health.collections.len(), LISTED_COLLECTIONS);
        assert_eq!(health.collections[0], "c00");
        assert_eq!(health.collections[9], "c09");
    }

    #[test]
    fn memory_report_shape() {
        let report = HealthReport::running(
            Some(StorageBackend::Memory),
            DatabaseHealth::not_configured(),
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "backend": "running",
                "storage": "memory",
                "database": { "status": "not_configured", "collections": [] },
            })
        );
    }
}
