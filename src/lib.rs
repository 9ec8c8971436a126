#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

pub use config::Config;
pub use engine::{EngineSettings, VotingEngine};

use config::{ConfigFairing, DatabaseFairing, EngineFairing};
use logging::LoggerFairing;

/// Build the server. Storage is chosen and connected on ignite.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(EngineFairing)
        .mount("/api", api::routes())
}

/// Build a server around an already constructed engine.
pub fn rocket_for_engine(engine: VotingEngine) -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .manage(engine)
        .mount("/api", api::routes())
}

/// Connect to the database used by `#[backend_test]`s, taken from
/// `ELECTION_TEST_DB_URI`.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let uri = std::env::var("ELECTION_TEST_DB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    mongodb::Client::with_uri_str(uri).await.unwrap()
}

/// A fresh database name for a single test.
#[cfg(test)]
pub(crate) fn database() -> String {
    config::get_database_name()
}

/// A MongoDB-backed server over the given database, managing the same state
/// as [`build`] does.
#[cfg(test)]
pub(crate) fn rocket_for_db(db: &mongodb::Database) -> Rocket<Build> {
    let config = Config::default();
    let store = std::sync::Arc::new(store::MongoStore::new(db));
    rocket_for_engine(VotingEngine::new(store, config.engine_settings()))
        .manage(config)
        .manage(db.clone())
}
