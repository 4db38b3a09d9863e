use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A structurally valid 13-digit national identity number.
///
/// Validation is purely structural: exactly 13 ASCII digits whose final digit
/// matches the weighted-sum checksum of the first twelve. Construction goes
/// through [`FromStr`], so a value of this type is always well-formed,
/// including when deserialized from the database.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NationalId(String);

impl NationalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NationalId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 13 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidNationalId);
        }
        let digits: Vec<u32> = s.bytes().map(|b| u32::from(b - b'0')).collect();
        let sum: u32 = digits
            .iter()
            .take(12)
            .enumerate()
            .map(|(i, d)| d * (13 - i as u32))
            .sum();
        let expected = (11 - sum % 11) % 10;
        if digits[12] != expected {
            return Err(Error::InvalidNationalId);
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for NationalId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NationalId> for String {
    fn from(id: NationalId) -> Self {
        id.0
    }
}

impl Display for NationalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
