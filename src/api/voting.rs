use rocket::{
    serde::json::{Error as JsonError, Json},
    Route, State,
};

use crate::engine::VotingEngine;
use crate::error::Result;
use crate::model::api::{
    vote::{VoteAccepted, VoteRequest},
    voter::{ValidateRequest, ValidateResponse},
};

pub fn routes() -> Vec<Route> {
    routes![validate_voter, cast_vote]
}

#[post("/voter/validate", data = "<request>")]
async fn validate_voter(
    request: std::result::Result<Json<ValidateRequest>, JsonError<'_>>,
    engine: &State<VotingEngine>,
) -> Result<Json<ValidateResponse>> {
    let request = request?.into_inner();
    Ok(Json(engine.validate(&request.voter_id).await?))
}

#[post("/vote", data = "<request>")]
async fn cast_vote(
    request: std::result::Result<Json<VoteRequest>, JsonError<'_>>,
    engine: &State<VotingEngine>,
) -> Result<Json<VoteAccepted>> {
    let request = request?.into_inner();
    engine
        .cast_vote(&request.voter_id, &request.candidate_id)
        .await?;
    Ok(Json(VoteAccepted { success: true }))
}
