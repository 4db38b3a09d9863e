use chrono::{DateTime, Utc};

/// The authoritative time source for window checks.
///
/// Endpoints take exactly one reading per request and thread it through every
/// check, so a request can never straddle a window boundary mid-evaluation.
/// Tests construct a fixed clock to make window checks deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    fixed: Option<DateTime<Utc>>,
}

impl Clock {
    /// A clock backed by the system wall clock.
    pub fn system() -> Self {
        Self { fixed: None }
    }

    /// A clock frozen at the given instant.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self { fixed: Some(at) }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.fixed.unwrap_or_else(Utc::now)
    }
}
