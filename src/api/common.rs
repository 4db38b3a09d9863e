use mongodb::{bson::doc, options::FindOneOptions};

use crate::error::{Error, Result};
use crate::model::{
    candidate::{Candidate, CandidateId},
    election::{Election, ElectionId},
    mongodb::Coll,
};

/// Look up the current election: the most recently created one, i.e. the
/// highest ID. Callers receive a value and pass it around explicitly; there
/// is no ambient "current election" state.
pub async fn current_election(elections: &Coll<Election>) -> Result<Election> {
    let options = FindOneOptions::builder().sort(doc! { "_id": -1 }).build();
    elections
        .find_one(None, options)
        .await?
        .ok_or_else(|| Error::not_found("Election"))
}

/// Look up a candidate by ID, unscoped.
pub async fn candidate_by_id(
    candidate_id: CandidateId,
    candidates: &Coll<Candidate>,
) -> Result<Candidate> {
    candidates
        .find_one(doc! { "_id": candidate_id }, None)
        .await?
        .ok_or_else(|| Error::not_found("Candidate"))
}

/// Look up a candidate by ID within the given election. A candidate from a
/// different election is treated as missing.
pub async fn election_candidate_by_id(
    election_id: ElectionId,
    candidate_id: CandidateId,
    candidates: &Coll<Candidate>,
) -> Result<Candidate> {
    candidates
        .find_one(
            doc! { "_id": candidate_id, "election_id": election_id },
            None,
        )
        .await?
        .ok_or_else(|| Error::not_found("Candidate"))
}
