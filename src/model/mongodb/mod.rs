mod collection;
mod counter;
mod errors;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{Counter, CANDIDATE_ID_COUNTER, ELECTION_ID_COUNTER};
pub use errors::is_duplicate_key_error;
