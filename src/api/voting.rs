use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Client,
};
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::model::{
    ballot::Ballot,
    candidate::{Candidate, CandidateId},
    election::{Election, ElectionPhase},
    mongodb::{is_duplicate_key_error, Coll},
    national_id::NationalId,
};
use crate::notify::{TallyBroadcaster, TallyUpdate};

use super::common::{current_election, election_candidate_by_id};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, vote_status]
}

/// A vote for a specific candidate by a specific identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub national_id: String,
    pub candidate_id: CandidateId,
}

/// An identity asking whether it may still vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatusRequest {
    pub national_id: String,
}

/// `status` is true iff the identity has not voted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatusResponse {
    pub status: bool,
}

#[post("/vote", data = "<vote>", format = "json")]
async fn cast_vote(
    vote: Json<VoteRequest>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    db_client: &State<Client>,
    clock: &State<Clock>,
    broadcaster: &State<TallyBroadcaster>,
) -> Result<()> {
    let national_id: NationalId = vote.national_id.parse()?;
    let election = votable_election(&elections).await?;
    let now = clock.now();

    if !election.is_voting_time(now) {
        return Err(Error::NotVotingTime);
    }
    let existing = ballots
        .find_one(Ballot::filter(election.id, &national_id), None)
        .await?;
    if existing.is_some() {
        return Err(Error::AlreadyVoted);
    }

    let candidate =
        election_candidate_by_id(election.id, vote.candidate_id, &candidates).await?;

    // Increment the tally and insert the ballot atomically: both commit or
    // neither does. The existence check above is only advisory; if two
    // requests for the same identity race past it, the unique ballot index
    // rejects the second insert and the whole transaction rolls back,
    // including the `$inc`.
    let ballot = Ballot::new(election.id, national_id, now);
    let update = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let updated = candidates
            .find_one_and_update_with_session(
                doc! { "_id": candidate.id },
                doc! { "$inc": { "voted_count": 1_i64 } },
                options,
                &mut session,
            )
            .await?;
        // The candidate may have been deleted between the lookup above and
        // the increment. Abort rather than commit a ballot with no tally.
        let update = match updated_tally(updated) {
            Ok(update) => update,
            Err(err) => {
                session.abort_transaction().await?;
                return Err(err);
            }
        };

        let inserted = ballots
            .insert_one_with_session(&ballot, None, &mut session)
            .await;
        if let Err(ref err) = inserted {
            if is_duplicate_key_error(err) {
                session.abort_transaction().await?;
                return Err(Error::AlreadyVoted);
            }
        }
        inserted?;

        session.commit_transaction().await?;
        update
    };
    info!(
        "Vote recorded for candidate {} in election {}",
        update.candidate_id, election.id
    );

    // Post-commit, best-effort; failure cannot affect the vote.
    broadcaster.broadcast(update);

    Ok(())
}

#[post("/vote/status", data = "<request>", format = "json")]
async fn vote_status(
    request: Json<VoteStatusRequest>,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
) -> Result<Json<VoteStatusResponse>> {
    let national_id: NationalId = request.national_id.parse()?;
    // Status checks are read-only and deliberately not phase-gated: a voter
    // may ask whether they voted even after the election closes.
    let election = current_election(&elections).await?;

    let existing = ballots
        .find_one(Ballot::filter(election.id, &national_id), None)
        .await?;
    Ok(Json(VoteStatusResponse {
        status: existing.is_none(),
    }))
}

/// The tally broadcast for a committed vote. The count is taken from the
/// document the increment returned, so concurrent votes for the same
/// candidate each report the total their own increment produced.
fn updated_tally(updated: Option<Candidate>) -> Result<TallyUpdate> {
    let candidate = updated.ok_or_else(|| Error::not_found("Candidate"))?;
    Ok(TallyUpdate {
        candidate_id: candidate.id,
        voted_count: candidate.voted_count,
    })
}

/// Get the current election, rejecting votes outright once it is closed.
async fn votable_election(elections: &Coll<Election>) -> Result<Election> {
    let election = current_election(elections).await?;
    if election.phase == ElectionPhase::Closed {
        return Err(Error::ElectionClosed);
    }
    Ok(election)
}
