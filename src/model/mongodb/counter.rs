use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Coll;

/// Counter handing out election IDs.
pub const ELECTION_ID_COUNTER: &str = "election_id";
/// Counter handing out candidate IDs.
pub const CANDIDATE_ID_COUNTER: &str = "candidate_id";

/// A counter object used to implement auto-increment IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the named counter, creating it
    /// on first use. IDs start at 1.
    pub async fn next(counters: &Coll<Counter>, id: &str) -> Result<u32> {
        let filter = doc! { "_id": id };
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .upsert(true)
            .build();
        let counter = counters
            .find_one_and_update(filter, update, options)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter {id}")))?;
        Ok(counter.next)
    }
}
