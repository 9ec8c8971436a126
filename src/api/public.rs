use std::time::Duration;

use log::warn;
use mongodb::{bson::doc, Database};
use rocket::{
    serde::json::{json, Json, Value},
    Route, State,
};

use crate::config::Config;
use crate::engine::{bounded, VotingEngine};
use crate::error::Result;
use crate::model::api::{
    candidate::CandidateDesc,
    health::{DatabaseHealth, HealthReport},
    results::{ElectionResults, ReconciliationReport},
};
use crate::store::StoreResult;

pub fn routes() -> Vec<Route> {
    routes![index, health, candidates, results, reconciliation]
}

#[get("/")]
fn index() -> Json<Value> {
    Json(json!({ "message": "Election API is running" }))
}

/// Diagnostics for operators. An unreachable database is reported in the
/// body rather than as an error status.
#[get("/test")]
async fn health(
    config: Option<&State<Config>>,
    db: Option<&State<Database>>,
    engine: &State<VotingEngine>,
) -> Json<HealthReport> {
    let database = match db {
        Some(db) => check_database(db, engine.settings().store_timeout).await,
        None => DatabaseHealth::not_configured(),
    };
    Json(HealthReport::running(config.map(|c| c.storage()), database))
}

async fn check_database(db: &Database, limit: Duration) -> DatabaseHealth {
    match bounded(limit, ping_and_list(db)).await {
        Ok(collections) => DatabaseHealth::connected(db.name(), collections),
        Err(e) => {
            warn!("Database health check failed: {e}");
            DatabaseHealth::unavailable(db.name(), e)
        }
    }
}

async fn ping_and_list(db: &Database) -> StoreResult<Vec<String>> {
    db.run_command(doc! { "ping": 1 }, None).await?;
    Ok(db.list_collection_names(None).await?)
}

#[get("/candidates")]
async fn candidates(engine: &State<VotingEngine>) -> Result<Json<Vec<CandidateDesc>>> {
    Ok(Json(engine.candidates().await?))
}

#[get("/results")]
async fn results(engine: &State<VotingEngine>) -> Result<Json<ElectionResults>> {
    Ok(Json(engine.tally().await?))
}

#[get("/reconciliation")]
async fn reconciliation(engine: &State<VotingEngine>) -> Result<Json<ReconciliationReport>> {
    Ok(Json(engine.reconcile().await?))
}

#[cfg(test)]
mod tests {
    use rocket::{figment::Figment, http::Status, local::asynchronous::Client};

    use super::*;
    use crate::config::StorageBackend;
    use crate::engine::tests::engine_with_roll;
    use crate::model::{
        api::health::ConnectionStatus,
        db::{CandidateCore, NewCandidate},
        mongodb::{Coll, Id},
    };

    async fn client_for(engine: VotingEngine) -> Client {
        Client::tracked(crate::rocket_for_engine(engine))
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn index_reports_running() {
        let (engine, ..) = engine_with_roll();
        let client = client_for(engine).await;

        let response = client.get("/api").dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert!(body["message"].is_string());
    }

    #[rocket::async_test]
    async fn health_of_memory_storage() {
        let (engine, ..) = engine_with_roll();
        let config: Config = Figment::new().merge(("storage", "memory")).extract().unwrap();
        let client = Client::tracked(crate::rocket_for_engine(engine).manage(config))
            .await
            .unwrap();

        let response = client.get(uri!("/api", health)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let report: HealthReport = response.into_json().await.unwrap();
        assert_eq!(report.backend, "running");
        assert_eq!(report.storage, Some(StorageBackend::Memory));
        assert_eq!(report.database, DatabaseHealth::not_configured());
    }

    #[rocket::async_test]
    async fn unreachable_database_is_reported_not_raised() {
        // Nothing listens on port 1; fail server selection quickly.
        let mongo = mongodb::Client::with_uri_str(
            "mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
        )
        .await
        .unwrap();
        let db = mongo.database("election");
        let (engine, ..) = engine_with_roll();
        let client = Client::tracked(crate::rocket_for_engine(engine).manage(db))
            .await
            .unwrap();

        let response = client.get(uri!("/api", health)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let report: HealthReport = response.into_json().await.unwrap();
        assert_eq!(report.storage, None);
        assert_eq!(report.database.status, ConnectionStatus::Unavailable);
        assert_eq!(report.database.name.as_deref(), Some("election"));
        assert!(report.database.error.is_some());
        assert!(report.database.collections.is_empty());
    }

    #[rocket::async_test]
    async fn candidates_are_listed_in_ballot_order() {
        let (engine, _, first, second) = engine_with_roll();
        let client = client_for(engine).await;

        let response = client.get(uri!("/api", candidates)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let listed: Vec<CandidateDesc> = response.into_json().await.unwrap();
        let ids: Vec<Id> = listed.iter().map(|c| *c.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(listed[0].president_name, CandidateCore::example1().president_name);
    }

    #[rocket::async_test]
    async fn results_reflect_cast_votes() {
        let (engine, _, first, second) = engine_with_roll();
        engine.cast_vote("20200001", &first.to_string()).await.unwrap();
        engine.cast_vote("20200002", &first.to_string()).await.unwrap();
        engine.cast_vote("20200003", &first.to_string()).await.unwrap();
        let client = client_for(engine).await;

        let response = client.get(uri!("/api", results)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let raw = response.into_string().await.unwrap();
        // Results carry counts only.
        assert!(!raw.contains("2020000"));
        let results: ElectionResults = rocket::serde::json::serde_json::from_str(&raw).unwrap();
        assert_eq!(results.total_votes, 3);
        assert_eq!(*results.results[0].candidate_id, first);
        assert_eq!(results.results[0].percentage, 100.0);
        assert_eq!(*results.results[1].candidate_id, second);
        assert_eq!(results.results[1].count, 0);
        assert_eq!(results.results[1].percentage, 0.0);
    }

    #[rocket::async_test]
    async fn reconciliation_of_clean_election() {
        let (engine, _, first, _) = engine_with_roll();
        engine.cast_vote("20200001", &first.to_string()).await.unwrap();
        let client = client_for(engine).await;

        let response = client.get(uri!("/api", reconciliation)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let report: ReconciliationReport = response.into_json().await.unwrap();
        assert_eq!(report, ReconciliationReport::new(1, 1));
    }

    #[backend_test]
    async fn results_from_database(client: Client, candidates: Coll<NewCandidate>) {
        candidates
            .insert_many([CandidateCore::example2(), CandidateCore::example1()], None)
            .await
            .unwrap();

        let response = client.get(uri!("/api", results)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes, 0);
        let numbers: Vec<u32> = results.results.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[backend_test]
    async fn health_of_database(client: Client, db: Database) {
        let response = client.get(uri!("/api", health)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let report: HealthReport = response.into_json().await.unwrap();
        assert_eq!(report.storage, Some(StorageBackend::MongoDb));
        assert_eq!(report.database.status, ConnectionStatus::Connected);
        assert_eq!(report.database.name.as_deref(), Some(db.name()));
        assert!(report.database.error.is_none());
        // Created along with the indexes.
        assert!(report.database.collections.contains(&"voterstatus".to_string()));
    }

    #[backend_test]
    async fn empty_database_reconciles(client: Client, db: Database) {
        let response = client.get(uri!("/api", reconciliation)).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let report: ReconciliationReport = response.into_json().await.unwrap();
        assert!(report.is_consistent());
        assert!(db.name().starts_with("test"));
    }
}
