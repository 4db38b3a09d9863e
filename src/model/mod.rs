//! Domain types and their persistence representations.
//!
//! DB documents are snake_case with MongoDB-native datetimes; API payloads
//! are camelCase views with RFC 3339 timestamps.

pub mod ballot;
pub mod candidate;
pub mod election;
pub mod mongodb;
pub mod national_id;
pub mod report;
