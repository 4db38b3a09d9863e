use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId, CandidatePatch, CandidateSpec, CandidateView},
    election::{Election, ElectionPhase},
    mongodb::{Coll, Counter, CANDIDATE_ID_COUNTER},
};

use super::common::{candidate_by_id, current_election};

pub fn routes() -> Vec<Route> {
    routes![
        get_candidates,
        get_candidate,
        create_candidate,
        update_candidate,
        delete_candidate,
    ]
}

#[get("/candidates")]
async fn get_candidates(candidates: Coll<Candidate>) -> Result<Json<Vec<CandidateView>>> {
    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    Ok(Json(all.iter().map(CandidateView::from_candidate).collect()))
}

#[get("/candidates/<candidate_id>")]
async fn get_candidate(
    candidate_id: CandidateId,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateView>> {
    let candidate = candidate_by_id(candidate_id, &candidates).await?;
    Ok(Json(CandidateView::from_candidate(&candidate)))
}

#[post("/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    spec: Json<CandidateSpec>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    counters: Coll<Counter>,
    clock: &State<Clock>,
) -> Result<Json<CandidateView>> {
    let election = applications_open_election(&elections).await?;

    let id = Counter::next(&counters, CANDIDATE_ID_COUNTER).await?;
    let candidate = spec.0.into_candidate(id, election.id, clock.now())?;
    candidates.insert_one(&candidate, None).await?;

    info!("Registered candidate {} for election {}", id, election.id);
    Ok(Json(CandidateView::from_candidate(&candidate)))
}

#[put("/candidates", data = "<patch>", format = "json")]
async fn update_candidate(
    patch: Json<CandidatePatch>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateView>> {
    applications_open_election(&elections).await?;

    let id = patch
        .id
        .ok_or_else(|| Error::validation("Candidate ID must not be null"))?;
    let existing = candidate_by_id(id, &candidates).await?;
    let merged = patch.apply_to(&existing)?;
    candidates
        .replace_one(doc! { "_id": merged.id }, &merged, None)
        .await?;

    info!("Updated candidate {}", merged.id);
    Ok(Json(CandidateView::from_candidate(&merged)))
}

#[delete("/candidates/<candidate_id>")]
async fn delete_candidate(
    candidate_id: CandidateId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<()> {
    let candidate = candidate_by_id(candidate_id, &candidates).await?;

    // Candidates are frozen once their election starts voting.
    let election = current_election(&elections).await?;
    if election.id == candidate.election_id
        && matches!(election.phase, ElectionPhase::Voting | ElectionPhase::Closed)
    {
        return Err(Error::PhaseViolation(
            "Candidates cannot be removed once voting has started".to_string(),
        ));
    }

    let result = candidates
        .delete_one(doc! { "_id": candidate_id }, None)
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found("Candidate"));
    }

    info!("Deleted candidate {candidate_id}");
    Ok(())
}

/// Get the current election, requiring candidate applications to be open.
async fn applications_open_election(elections: &Coll<Election>) -> Result<Election> {
    let election = current_election(elections).await?;
    if !election.applications_open() {
        return Err(Error::PhaseViolation(
            "Election application run out of time".to_string(),
        ));
    }
    Ok(election)
}
