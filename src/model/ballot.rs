use chrono::{DateTime, Utc};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime, Document};
use serde::{Deserialize, Serialize};

use crate::model::election::ElectionId;
use crate::model::national_id::NationalId;

/// The durable record that an identity has voted in a given election.
///
/// The `(election_id, national_id)` pair is covered by a unique index (see
/// `ensure_indexes_exist`); its existence alone is what blocks re-voting.
/// Ballots are never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub election_id: ElectionId,
    pub national_id: NationalId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_date: DateTime<Utc>,
}

impl Ballot {
    pub fn new(election_id: ElectionId, national_id: NationalId, now: DateTime<Utc>) -> Self {
        Self {
            election_id,
            national_id,
            voted_date: now,
        }
    }

    /// Filter matching the ballot for this identity in this election.
    pub fn filter(election_id: ElectionId, national_id: &NationalId) -> Document {
        doc! {
            "election_id": election_id,
            "national_id": national_id.as_str(),
        }
    }
}
