use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::election::ElectionId;

use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;

/// Our candidate IDs are integers from an atomic counter; listing candidates
/// in ID order gives their registration order.
pub type CandidateId = u32;

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: CandidateId,
    /// Foreign key election ID, immutable after creation.
    pub election_id: ElectionId,
    pub name: String,
    pub dob: Option<NaiveDate>,
    pub bio_link: String,
    pub image_link: String,
    pub policy: String,
    /// Number of ballots cast for this candidate. Only ever incremented, and
    /// only by the vote ledger.
    #[serde(default)]
    pub voted_count: u64,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A new candidate application, as submitted during `OpenApplication`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: Option<String>,
    pub dob: Option<String>,
    pub bio_link: Option<String>,
    pub image_link: Option<String>,
    pub policy: Option<String>,
}

impl CandidateSpec {
    /// Validate the application and turn it into a candidate owned by the
    /// given election. Name, biography link, image link and policy text are
    /// all required and must not be blank; the date of birth is optional.
    pub fn into_candidate(
        self,
        id: CandidateId,
        election_id: ElectionId,
        now: DateTime<Utc>,
    ) -> Result<Candidate> {
        let name = required_field(self.name, "Candidate name")?;
        let bio_link = required_field(self.bio_link, "Candidate biography link")?;
        let image_link = required_field(self.image_link, "Candidate image link")?;
        let policy = required_field(self.policy, "Candidate policy")?;
        let dob = parse_dob(self.dob.as_deref())?;

        Ok(Candidate {
            id,
            election_id,
            name,
            dob,
            bio_link,
            image_link,
            policy,
            voted_count: 0,
            created_at: now,
        })
    }
}

/// A partial update to an existing candidate.
///
/// Per field, a blank or absent value means "keep the existing value"; this
/// is an explicit merge, not a replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    /// Target candidate; checked for presence at the API boundary so a null
    /// or missing ID is a validation failure, not a deserialization failure.
    pub id: Option<CandidateId>,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub bio_link: Option<String>,
    pub image_link: Option<String>,
    pub policy: Option<String>,
}

impl CandidatePatch {
    /// Merge this patch over the existing candidate. The ID, owning election
    /// and vote count are never touched.
    pub fn apply_to(&self, existing: &Candidate) -> Result<Candidate> {
        let dob = match present(&self.dob) {
            Some(raw) => parse_dob(Some(raw))?,
            None => existing.dob,
        };
        Ok(Candidate {
            id: existing.id,
            election_id: existing.election_id,
            name: merge_field(&self.name, &existing.name),
            dob,
            bio_link: merge_field(&self.bio_link, &existing.bio_link),
            image_link: merge_field(&self.image_link, &existing.image_link),
            policy: merge_field(&self.policy, &existing.policy),
            voted_count: existing.voted_count,
            created_at: existing.created_at,
        })
    }
}

/// The per-field merge policy: a patch value wins only if present and
/// non-blank.
fn merge_field(patch: &Option<String>, existing: &str) -> String {
    match present(patch) {
        Some(value) => value.to_string(),
        None => existing.to_string(),
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.trim().is_empty())
}

fn required_field(field: Option<String>, what: &str) -> Result<String> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::validation(format!("{what} must not be empty"))),
    }
}

fn parse_dob(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| Error::validation(format!("Invalid date of birth: {s}"))),
    }
}

/// Integer-truncating vote share; zero when nothing has been cast.
pub fn vote_percentage(voted_count: u64, total_ballots: u64) -> u64 {
    if total_ballots == 0 {
        0
    } else {
        voted_count * 100 / total_ballots
    }
}

/// API view of a candidate. Optional fields are omitted from the JSON when
/// absent; the percentage only appears in tabulated results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: CandidateId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    pub bio_link: String,
    pub image_link: String,
    pub policy: String,
    pub voted_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u64>,
}

impl CandidateView {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            dob: candidate.dob.map(|d| d.to_string()),
            bio_link: candidate.bio_link.clone(),
            image_link: candidate.image_link.clone(),
            policy: candidate.policy.clone(),
            voted_count: candidate.voted_count,
            percentage: None,
        }
    }

    /// A result-set view including the candidate's share of `total_ballots`.
    pub fn with_total(candidate: &Candidate, total_ballots: u64) -> Self {
        Self {
            percentage: Some(vote_percentage(candidate.voted_count, total_ballots)),
            ..Self::from_candidate(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap()
    }

    fn full_spec() -> CandidateSpec {
        CandidateSpec {
            name: Some("Jo Vox".to_string()),
            dob: Some("1985-03-14".to_string()),
            bio_link: Some("https://example.com/bio".to_string()),
            image_link: Some("https://example.com/img.png".to_string()),
            policy: Some("Free ice cream".to_string()),
        }
    }

    #[test]
    fn create_requires_all_four_fields() {
        assert!(full_spec().into_candidate(1, 1, now()).is_ok());

        for strip in ["name", "bio_link", "image_link", "policy"] {
            let mut spec = full_spec();
            match strip {
                "name" => spec.name = None,
                "bio_link" => spec.bio_link = Some("   ".to_string()),
                "image_link" => spec.image_link = Some(String::new()),
                _ => spec.policy = None,
            }
            assert!(
                matches!(spec.into_candidate(1, 1, now()), Err(Error::Validation(_))),
                "missing {strip} should fail"
            );
        }
    }

    #[test]
    fn dob_is_optional_but_must_parse() {
        let mut spec = full_spec();
        spec.dob = None;
        let candidate = spec.into_candidate(1, 1, now()).unwrap();
        assert_eq!(candidate.dob, None);

        let mut spec = full_spec();
        spec.dob = Some("14/03/1985".to_string());
        assert!(spec.into_candidate(1, 1, now()).is_err());
    }

    #[test]
    fn new_candidates_start_with_zero_votes() {
        let candidate = full_spec().into_candidate(7, 3, now()).unwrap();
        assert_eq!(candidate.voted_count, 0);
        assert_eq!(candidate.id, 7);
        assert_eq!(candidate.election_id, 3);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let existing = full_spec().into_candidate(1, 1, now()).unwrap();
        let patch = CandidatePatch {
            id: Some(1),
            name: Some("Jo Voxx".to_string()),
            dob: None,
            bio_link: Some("".to_string()),
            image_link: Some("  ".to_string()),
            policy: Some("Free sprinkles too".to_string()),
        };

        let merged = patch.apply_to(&existing).unwrap();
        assert_eq!(merged.name, "Jo Voxx");
        assert_eq!(merged.policy, "Free sprinkles too");
        // Blank and absent fields keep their old values.
        assert_eq!(merged.dob, existing.dob);
        assert_eq!(merged.bio_link, existing.bio_link);
        assert_eq!(merged.image_link, existing.image_link);
    }

    #[test]
    fn patch_never_touches_ownership_or_tally() {
        let mut existing = full_spec().into_candidate(1, 9, now()).unwrap();
        existing.voted_count = 42;
        let patch = CandidatePatch {
            id: Some(1),
            name: Some("Renamed".to_string()),
            dob: Some("1990-01-01".to_string()),
            bio_link: None,
            image_link: None,
            policy: None,
        };

        let merged = patch.apply_to(&existing).unwrap();
        assert_eq!(merged.id, existing.id);
        assert_eq!(merged.election_id, 9);
        assert_eq!(merged.voted_count, 42);
        assert_eq!(merged.created_at, existing.created_at);
        assert_eq!(merged.dob, Some("1990-01-01".parse().unwrap()));
    }

    #[test]
    fn patch_deserializes_without_an_id() {
        // A missing or null ID must reach the handler as `None` for a
        // proper validation error, not die in deserialization.
        let patch: CandidatePatch =
            rocket::serde::json::serde_json::from_str(r#"{"name":"Jo"}"#).unwrap();
        assert_eq!(patch.id, None);
        assert_eq!(patch.name.as_deref(), Some("Jo"));

        let patch: CandidatePatch =
            rocket::serde::json::serde_json::from_str(r#"{"id":null,"policy":"p"}"#).unwrap();
        assert_eq!(patch.id, None);
    }

    #[test]
    fn percentage_truncates() {
        assert_eq!(vote_percentage(78, 100), 78);
        assert_eq!(vote_percentage(1, 3), 33);
        assert_eq!(vote_percentage(2, 3), 66);
        assert_eq!(vote_percentage(0, 100), 0);
    }

    #[test]
    fn percentage_is_zero_without_ballots() {
        assert_eq!(vote_percentage(0, 0), 0);
        assert_eq!(vote_percentage(5, 0), 0);
    }

    #[test]
    fn views_expose_percentage_only_with_totals() {
        let mut candidate = full_spec().into_candidate(1, 1, now()).unwrap();
        candidate.voted_count = 78;

        let plain = CandidateView::from_candidate(&candidate);
        assert_eq!(plain.percentage, None);

        let tabulated = CandidateView::with_total(&candidate, 100);
        assert_eq!(tabulated.percentage, Some(78));
        assert_eq!(tabulated.voted_count, 78);
    }
}
