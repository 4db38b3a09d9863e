use mongodb::bson::doc;
use mongodb::options::FindOptions;
use rocket::{
    futures::TryStreamExt,
    http::{ContentType, Header},
    serde::json::Json,
    Response, Route, State,
};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::model::{
    ballot::Ballot,
    candidate::{Candidate, CandidateView},
    election::{Election, ElectionPhase, ElectionSpec, ElectionView},
    mongodb::{Coll, Counter, ELECTION_ID_COUNTER},
    report::{csv_report, result_rows, RESULT_FILENAME},
};

use super::common::current_election;

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        close_applications,
        toggle_vote,
        get_election_result,
        export_election_result,
    ]
}

#[post("/election", data = "<spec>", format = "json")]
async fn create_election(
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
    clock: &State<Clock>,
) -> Result<Json<ElectionView>> {
    let id = Counter::next(&counters, ELECTION_ID_COUNTER).await?;
    let election = spec.0.into_election(id, clock.now())?;
    elections.insert_one(&election, None).await?;

    info!("Created election {id}, applications open");
    Ok(Json(ElectionView::from(&election)))
}

#[post("/election/applications/close")]
async fn close_applications(elections: Coll<Election>) -> Result<Json<ElectionView>> {
    let election = current_election(&elections).await?;
    let next_phase = election.close_applications()?;
    let updated = transition_phase(&elections, &election, next_phase).await?;

    info!("Election {}: applications closed", election.id);
    Ok(Json(ElectionView::from(&updated)))
}

/// Open or close the vote, depending on the enable flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRequest {
    pub enable: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub status: &'static str,
    pub enable: bool,
}

#[post("/election/toggle", data = "<toggle>", format = "json")]
async fn toggle_vote(
    toggle: Json<ToggleRequest>,
    elections: Coll<Election>,
    clock: &State<Clock>,
) -> Result<Json<ToggleResponse>> {
    let enable = toggle
        .enable
        .ok_or_else(|| Error::validation("Enable flag must not be null"))?;

    let election = current_election(&elections).await?;
    // One authoritative clock reading for the whole decision.
    let now = clock.now();
    let next_phase = if enable {
        election.open_voting(now)?
    } else {
        election.close_voting(now)?
    };
    transition_phase(&elections, &election, next_phase).await?;

    info!("Election {}: phase -> {:?}", election.id, next_phase);
    Ok(Json(ToggleResponse {
        status: "OK",
        enable,
    }))
}

#[get("/election/result")]
async fn get_election_result(
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
) -> Result<Json<Vec<CandidateView>>> {
    let results = election_result(&elections, &candidates, &ballots).await?;
    Ok(Json(results))
}

#[get("/election/export")]
async fn export_election_result(
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
) -> Result<CsvFile> {
    let results = election_result(&elections, &candidates, &ballots).await?;
    let bytes = csv_report(&result_rows(&results))?;
    Ok(CsvFile(bytes))
}

/// Tabulate the final results: one row per candidate in stored order, with
/// the integer vote share. Only available once the election is closed.
async fn election_result(
    elections: &Coll<Election>,
    candidates: &Coll<Candidate>,
    ballots: &Coll<Ballot>,
) -> Result<Vec<CandidateView>> {
    let election = current_election(elections).await?;
    if election.phase != ElectionPhase::Closed {
        return Err(Error::ElectionNotOver);
    }

    let total_ballots = ballots
        .count_documents(doc! { "election_id": election.id }, None)
        .await?;
    info!(
        "Election {} result: {total_ballots} ballots cast",
        election.id
    );

    let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let standing: Vec<Candidate> = candidates
        .find(doc! { "election_id": election.id }, options)
        .await?
        .try_collect()
        .await?;

    Ok(standing
        .iter()
        .map(|candidate| CandidateView::with_total(candidate, total_ballots))
        .collect())
}

/// Write the phase transition, re-checking the precondition atomically: the
/// update is filtered on the phase the decision was made against, so a
/// concurrent transition cannot be overwritten or skipped.
async fn transition_phase(
    elections: &Coll<Election>,
    election: &Election,
    next_phase: ElectionPhase,
) -> Result<Election> {
    let filter = doc! { "_id": election.id, "phase": election.phase };
    let update = doc! { "$set": { "phase": next_phase } };
    let result = elections.update_one(filter, update, None).await?;
    if result.modified_count != 1 {
        return Err(Error::PhaseViolation(
            "Election phase changed concurrently".to_string(),
        ));
    }
    let mut updated = election.clone();
    updated.phase = next_phase;
    Ok(updated)
}

/// CSV bytes served as a named file download.
pub struct CsvFile(Vec<u8>);

impl<'r, 'o: 'r> rocket::response::Responder<'r, 'o> for CsvFile {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        Response::build()
            .header(ContentType::CSV)
            .header(Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{RESULT_FILENAME}\""),
            ))
            .sized_body(self.0.len(), std::io::Cursor::new(self.0))
            .ok()
    }
}
