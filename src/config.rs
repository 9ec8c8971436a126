use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineSettings, VotingEngine};
use crate::model::mongodb::ensure_indexes_exist;
use crate::store::{MemoryStore, MongoStore};

/// Where the voter roll, candidates, vote statuses and ballots live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StorageBackend {
    #[default]
    #[serde(rename = "mongodb")]
    MongoDb,
    /// Process-local and lost on shutdown.
    #[serde(rename = "memory")]
    Memory,
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    storage: StorageBackend,
    #[serde(default = "defaults::store_timeout_ms")]
    store_timeout_ms: u64,
    #[serde(default = "defaults::ballot_append_attempts")]
    ballot_append_attempts: u32,
    #[serde(default = "defaults::ballot_retry_delay_ms")]
    ballot_retry_delay_ms: u64,
}

mod defaults {
    pub fn store_timeout_ms() -> u64 {
        5000
    }

    pub fn ballot_append_attempts() -> u32 {
        3
    }

    pub fn ballot_retry_delay_ms() -> u64 {
        200
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            store_timeout_ms: defaults::store_timeout_ms(),
            ballot_append_attempts: defaults::ballot_append_attempts(),
            ballot_retry_delay_ms: defaults::ballot_retry_delay_ms(),
        }
    }
}

impl Config {
    pub fn storage(&self) -> StorageBackend {
        self.storage
    }

    /// Upper bound on any single store operation.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// How many times a ballot append is attempted once the voter has been
    /// marked as voted. Never less than one.
    pub fn ballot_append_attempts(&self) -> u32 {
        self.ballot_append_attempts.max(1)
    }

    /// Pause between ballot append attempts.
    pub fn ballot_retry_delay(&self) -> Duration {
        Duration::from_millis(self.ballot_retry_delay_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            store_timeout: self.store_timeout(),
            ballot_append_attempts: self.ballot_append_attempts(),
            ballot_retry_delay: self.ballot_retry_delay(),
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded config, storage backend is {:?}", config.storage());

        Ok(rocket.manage(config))
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// ensures the required indexes exist, and places both a `Client` and a
/// `Database` into managed state. Does nothing when running on in-memory
/// storage.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match rocket.state::<Config>().map(Config::storage) {
            Some(StorageBackend::MongoDb) => {}
            Some(StorageBackend::Memory) => return Ok(rocket),
            None => {
                error!("Database fairing attached before config was loaded");
                return Err(rocket);
            }
        }

        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // The one-vote guarantee depends on the unique index over vote
        // statuses, so refuse to launch without it.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to create database indexes: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        Ok(rocket.manage(client).manage(db))
    }
}

/// A fairing that builds the [`VotingEngine`] over the configured storage
/// backend and puts it in managed state. Must be attached after
/// [`ConfigFairing`] and [`DatabaseFairing`].
pub struct EngineFairing;

#[rocket::async_trait]
impl Fairing for EngineFairing {
    fn info(&self) -> Info {
        Info {
            name: "Voting engine",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let (storage, settings) = match rocket.state::<Config>() {
            Some(config) => (config.storage(), config.engine_settings()),
            None => {
                error!("Voting engine fairing attached before config was loaded");
                return Err(rocket);
            }
        };

        let engine = match storage {
            StorageBackend::MongoDb => match rocket.state::<Database>() {
                Some(db) => VotingEngine::new(Arc::new(MongoStore::new(db)), settings),
                None => {
                    error!("Voting engine fairing attached before the database was connected");
                    return Err(rocket);
                }
            },
            StorageBackend::Memory => {
                warn!(
                    "Using in-memory storage with an empty voter roll, nothing will be \
                     persisted and every voter is ineligible"
                );
                VotingEngine::new(Arc::new(MemoryStore::new()), settings)
            }
        };
        debug!("Voting engine ready with {:?}", engine.settings());

        Ok(rocket.manage(engine))
    }
}

/// Get the name of the database to use (production version).
#[cfg(not(test))]
pub(crate) fn get_database_name() -> String {
    "election".to_string()
}

/// Get the name of the database to use (test version).
/// Use a random name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn get_database_name() -> String {
    let random: u32 = rand::random();
    let db = format!("test{random}");
    info!("Using database {db}");
    db
}

#[cfg(test)]
mod tests {
    use rocket::figment::Figment;

    use super::*;

    #[test]
    fn defaults_apply_when_unset() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(config.storage(), StorageBackend::MongoDb);
        assert_eq!(config.engine_settings(), EngineSettings::default());
        assert_eq!(
            Config::default().engine_settings(),
            config.engine_settings()
        );
    }

    #[test]
    fn values_are_read_from_figment() {
        let config: Config = Figment::new()
            .merge(("storage", "memory"))
            .merge(("store_timeout_ms", 250))
            .merge(("ballot_append_attempts", 0))
            .merge(("ballot_retry_delay_ms", 10))
            .extract()
            .unwrap();
        assert_eq!(config.storage(), StorageBackend::Memory);
        assert_eq!(config.store_timeout(), Duration::from_millis(250));
        // Zero attempts would never store a ballot at all.
        assert_eq!(config.ballot_append_attempts(), 1);
        assert_eq!(config.ballot_retry_delay(), Duration::from_millis(10));
    }

    #[test]
    fn unknown_storage_is_rejected() {
        let result = Figment::new()
            .merge(("storage", "postgres"))
            .extract::<Config>();
        assert!(result.is_err());
    }

    #[rocket::async_test]
    async fn memory_storage_launches_without_database() {
        let figment = rocket::Config::figment().merge(("storage", "memory"));
        let rocket = rocket::custom(figment)
            .attach(ConfigFairing)
            .attach(DatabaseFairing)
            .attach(EngineFairing)
            .ignite()
            .await
            .unwrap();
        assert!(rocket.state::<Database>().is_none());

        // Nothing can be added to the roll, so nobody may vote.
        let engine = rocket.state::<VotingEngine>().unwrap();
        let validated = engine.validate("20200001").await.unwrap();
        assert!(!validated.eligible);
        assert!(engine.candidates().await.unwrap().is_empty());
    }
}
