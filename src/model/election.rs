use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Our election IDs are integers from an atomic counter; the current election
/// is the one with the highest ID.
pub type ElectionId = u32;

/// States in the election lifecycle.
///
/// The lifecycle is strictly linear: applications open, applications close,
/// voting runs, voting closes. There is no way back from `Closed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionPhase {
    /// Candidates may register and edit their applications.
    OpenApplication,
    /// Applications are closed; waiting for the voting window.
    RunForElection,
    /// Votes are being accepted.
    Voting,
    /// Voting is over; results are final.
    Closed,
}

impl From<ElectionPhase> for Bson {
    fn from(phase: ElectionPhase) -> Self {
        to_bson(&phase).expect("Serialisation is infallible")
    }
}

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: ElectionId,
    /// Current lifecycle phase.
    pub phase: ElectionPhase,
    /// Start of the voting window (inclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_voting_date: DateTime<Utc>,
    /// End of the voting window (exclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_voting_date: DateTime<Utc>,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Election {
    /// Create a new election with applications open.
    pub fn new(
        id: ElectionId,
        start_voting_date: DateTime<Utc>,
        end_voting_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            phase: ElectionPhase::OpenApplication,
            start_voting_date,
            end_voting_date,
            created_at: now,
        }
    }

    /// Is `now` within the voting window `[start, end)`?
    pub fn is_in_voting_window(&self, now: DateTime<Utc>) -> bool {
        self.start_voting_date <= now && now < self.end_voting_date
    }

    /// Has the voting window already ended at `now`?
    pub fn is_past_voting_window(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_voting_date
    }

    /// May a vote be cast at `now`? Requires the `Voting` phase and the
    /// voting window; either alone is not enough.
    pub fn is_voting_time(&self, now: DateTime<Utc>) -> bool {
        self.phase == ElectionPhase::Voting && self.is_in_voting_window(now)
    }

    /// May candidates be registered or modified?
    pub fn applications_open(&self) -> bool {
        self.phase == ElectionPhase::OpenApplication
    }

    /// Close candidate applications: `OpenApplication -> RunForElection`.
    pub fn close_applications(&self) -> Result<ElectionPhase> {
        if self.phase != ElectionPhase::OpenApplication {
            return Err(Error::PhaseViolation(
                "Candidate applications are not open".to_string(),
            ));
        }
        Ok(ElectionPhase::RunForElection)
    }

    /// Open the vote: `RunForElection -> Voting`.
    ///
    /// Fails with `PhaseViolation` if the election is not waiting to vote,
    /// and with `WindowViolation` if `now` is outside the voting window.
    pub fn open_voting(&self, now: DateTime<Utc>) -> Result<ElectionPhase> {
        if self.phase != ElectionPhase::RunForElection {
            return Err(Error::PhaseViolation(
                "Election is already voting or closed".to_string(),
            ));
        }
        if !self.is_in_voting_window(now) {
            return Err(Error::WindowViolation(
                "It is not election vote time".to_string(),
            ));
        }
        Ok(ElectionPhase::Voting)
    }

    /// Close the vote: `Voting -> Closed`.
    ///
    /// Fails with `PhaseViolation` if the election is not voting, and with
    /// `WindowViolation` if the voting window has not yet ended.
    pub fn close_voting(&self, now: DateTime<Utc>) -> Result<ElectionPhase> {
        if self.phase != ElectionPhase::Voting {
            return Err(Error::PhaseViolation(
                "Election phase is not voting".to_string(),
            ));
        }
        if !self.is_past_voting_window(now) {
            return Err(Error::WindowViolation(
                "It is not time to close the vote".to_string(),
            ));
        }
        Ok(ElectionPhase::Closed)
    }
}

/// Requested election parameters, as submitted by the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub start_voting_date: DateTime<Utc>,
    pub end_voting_date: DateTime<Utc>,
}

impl ElectionSpec {
    /// Turn the spec into a fresh election, rejecting an empty or inverted
    /// voting window.
    pub fn into_election(self, id: ElectionId, now: DateTime<Utc>) -> Result<Election> {
        if self.start_voting_date >= self.end_voting_date {
            return Err(Error::validation(
                "Start voting date must be before end voting date",
            ));
        }
        Ok(Election::new(
            id,
            self.start_voting_date,
            self.end_voting_date,
            now,
        ))
    }
}

/// API view of an election, with plain RFC 3339 timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionView {
    pub id: ElectionId,
    pub phase: ElectionPhase,
    pub start_voting_date: DateTime<Utc>,
    pub end_voting_date: DateTime<Utc>,
}

impl From<&Election> for ElectionView {
    fn from(election: &Election) -> Self {
        Self {
            id: election.id,
            phase: election.phase,
            start_voting_date: election.start_voting_date,
            end_voting_date: election.end_voting_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 1, 8, 0, 0).unwrap()
    }

    fn window_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 5, 1, 20, 0, 0).unwrap()
    }

    fn example(phase: ElectionPhase) -> Election {
        let created = window_start() - Duration::days(7);
        let mut election = Election::new(1, window_start(), window_end(), created);
        election.phase = phase;
        election
    }

    #[test]
    fn new_elections_accept_applications() {
        let election = example(ElectionPhase::OpenApplication);
        assert!(election.applications_open());
        assert!(!election.is_voting_time(window_start()));
    }

    #[test]
    fn close_applications_only_from_open_application() {
        let election = example(ElectionPhase::OpenApplication);
        assert_eq!(
            election.close_applications().unwrap(),
            ElectionPhase::RunForElection
        );

        for phase in [
            ElectionPhase::RunForElection,
            ElectionPhase::Voting,
            ElectionPhase::Closed,
        ] {
            assert!(matches!(
                example(phase).close_applications(),
                Err(Error::PhaseViolation(_))
            ));
        }
    }

    #[test]
    fn open_voting_only_from_run_for_election() {
        let now = window_start() + Duration::hours(1);
        let election = example(ElectionPhase::RunForElection);
        assert_eq!(election.open_voting(now).unwrap(), ElectionPhase::Voting);

        for phase in [
            ElectionPhase::OpenApplication,
            ElectionPhase::Voting,
            ElectionPhase::Closed,
        ] {
            assert!(matches!(
                example(phase).open_voting(now),
                Err(Error::PhaseViolation(_))
            ));
        }
    }

    #[test]
    fn open_voting_window_boundaries() {
        let election = example(ElectionPhase::RunForElection);

        // Inclusive lower bound.
        assert!(election.open_voting(window_start()).is_ok());
        // Before the window.
        assert!(matches!(
            election.open_voting(window_start() - Duration::seconds(1)),
            Err(Error::WindowViolation(_))
        ));
        // Exclusive upper bound.
        assert!(matches!(
            election.open_voting(window_end()),
            Err(Error::WindowViolation(_))
        ));
        assert!(matches!(
            election.open_voting(window_end() + Duration::hours(1)),
            Err(Error::WindowViolation(_))
        ));
    }

    #[test]
    fn close_voting_only_from_voting() {
        let after = window_end() + Duration::seconds(1);
        let election = example(ElectionPhase::Voting);
        assert_eq!(election.close_voting(after).unwrap(), ElectionPhase::Closed);

        for phase in [
            ElectionPhase::OpenApplication,
            ElectionPhase::RunForElection,
            ElectionPhase::Closed,
        ] {
            assert!(matches!(
                example(phase).close_voting(after),
                Err(Error::PhaseViolation(_))
            ));
        }
    }

    #[test]
    fn close_voting_requires_the_window_to_have_ended() {
        let election = example(ElectionPhase::Voting);

        assert!(matches!(
            election.close_voting(window_end() - Duration::seconds(1)),
            Err(Error::WindowViolation(_))
        ));
        // The window's exclusive end is the first instant closing is allowed.
        assert!(election.close_voting(window_end()).is_ok());
    }

    #[test]
    fn closed_is_terminal() {
        let election = example(ElectionPhase::Closed);
        let now = window_end() + Duration::days(1);
        assert!(election.close_applications().is_err());
        assert!(election.open_voting(now).is_err());
        assert!(election.close_voting(now).is_err());
    }

    #[test]
    fn voting_time_requires_phase_and_window() {
        let in_window = window_start() + Duration::hours(1);

        // Window alone is not enough.
        assert!(!example(ElectionPhase::RunForElection).is_voting_time(in_window));
        // Phase alone is not enough.
        assert!(!example(ElectionPhase::Voting).is_voting_time(window_end()));
        // Both together are.
        assert!(example(ElectionPhase::Voting).is_voting_time(in_window));
        assert!(example(ElectionPhase::Voting).is_voting_time(window_start()));
    }

    #[test]
    fn spec_rejects_inverted_windows() {
        let spec = ElectionSpec {
            start_voting_date: window_end(),
            end_voting_date: window_start(),
        };
        assert!(spec.into_election(1, window_start()).is_err());

        let empty = ElectionSpec {
            start_voting_date: window_start(),
            end_voting_date: window_start(),
        };
        assert!(empty.into_election(1, window_start()).is_err());
    }
}
