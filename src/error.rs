use rocket::{http::Status, response::Responder};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while handling a request.
///
/// All variants except `Db` and `Csv` are caller-recoverable validation
/// failures and map to 4xx statuses.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error("Failed to generate report: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid national ID")]
    InvalidNationalId,
    #[error("{0}")]
    PhaseViolation(String),
    #[error("{0}")]
    WindowViolation(String),
    #[error("It is not election vote time")]
    NotVotingTime,
    #[error("Election is closed")]
    ElectionClosed,
    #[error("National ID has already voted")]
    AlreadyVoted,
    #[error("The election is not over")]
    ElectionNotOver,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status(&self) -> Status {
        match self {
            Self::Db(_) | Self::Csv(_) => Status::InternalServerError,
            Self::NotFound(_) => Status::NotFound,
            Self::InvalidNationalId
            | Self::PhaseViolation(_)
            | Self::WindowViolation(_)
            | Self::NotVotingTime
            | Self::ElectionClosed
            | Self::AlreadyVoted
            | Self::ElectionNotOver
            | Self::Validation(_) => Status::BadRequest,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        // Internal errors get logged with full detail; the client only ever
        // sees the status code.
        if status == Status::InternalServerError {
            error!("{self:?}");
        } else {
            warn!("{self}");
        }
        Err(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_bad_requests() {
        assert_eq!(Error::InvalidNationalId.status(), Status::BadRequest);
        assert_eq!(Error::NotVotingTime.status(), Status::BadRequest);
        assert_eq!(Error::ElectionClosed.status(), Status::BadRequest);
        assert_eq!(Error::AlreadyVoted.status(), Status::BadRequest);
        assert_eq!(Error::ElectionNotOver.status(), Status::BadRequest);
        assert_eq!(
            Error::PhaseViolation("nope".to_string()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::WindowViolation("nope".to_string()).status(),
            Status::BadRequest
        );
        assert_eq!(
            Error::validation("missing name").status(),
            Status::BadRequest
        );
    }

    #[test]
    fn missing_data_is_not_found() {
        assert_eq!(Error::not_found("Candidate").status(), Status::NotFound);
        assert_eq!(
            Error::not_found("Election").to_string(),
            "Election not found"
        );
    }
}
