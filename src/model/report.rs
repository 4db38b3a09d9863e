use csv::Writer;

use crate::error::Result;
use crate::model::candidate::CandidateView;

/// Columns of the exported result report, in order.
pub const RESULT_HEADER: [&str; 4] = ["id", "name", "votedCount", "percentage"];

/// Download filename for the exported report.
pub const RESULT_FILENAME: &str = "candidate_election_report.csv";

/// Placeholder written in place of an absent field.
const EMPTY_FIELD: &str = "-";

/// Render one report row per tabulated candidate, preserving their order.
pub fn result_rows(results: &[CandidateView]) -> Vec<[String; 4]> {
    results
        .iter()
        .map(|candidate| {
            [
                candidate.id.to_string(),
                candidate.name.clone(),
                candidate.voted_count.to_string(),
                candidate
                    .percentage
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| EMPTY_FIELD.to_string()),
            ]
        })
        .collect()
}

/// Serialize the header and rows as CSV bytes.
pub fn csv_report(rows: &[[String; 4]]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(RESULT_HEADER)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(id: u32, name: &str, voted: u64, percentage: Option<u64>) -> CandidateView {
        CandidateView {
            id,
            name: name.to_string(),
            dob: None,
            bio_link: "https://example.com/bio".to_string(),
            image_link: "https://example.com/img.png".to_string(),
            policy: "policy".to_string(),
            voted_count: voted,
            percentage,
        }
    }

    #[test]
    fn rows_follow_the_fixed_header() {
        let rows = result_rows(&[view(1, "Jo Vox", 78, Some(78))]);
        assert_eq!(rows, vec![[
            "1".to_string(),
            "Jo Vox".to_string(),
            "78".to_string(),
            "78".to_string(),
        ]]);
    }

    #[test]
    fn absent_fields_become_a_dash() {
        let rows = result_rows(&[view(2, "No Votes", 0, None)]);
        assert_eq!(rows[0][3], "-");
    }

    #[test]
    fn report_preserves_candidate_order() {
        let rows = result_rows(&[
            view(3, "Third", 1, Some(10)),
            view(1, "First", 5, Some(50)),
            view(2, "Second", 4, Some(40)),
        ]);
        let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn csv_bytes_have_header_and_rows() {
        let rows = result_rows(&[view(1, "Jo Vox", 78, Some(78)), view(2, "Mx Poll", 22, Some(22))]);
        let bytes = csv_report(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,name,votedCount,percentage");
        assert_eq!(lines[1], "1,Jo Vox,78,78");
        assert_eq!(lines[2], "2,Mx Poll,22,22");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let rows = result_rows(&[view(1, "Vox, Jo", 1, Some(100))]);
        let text = String::from_utf8(csv_report(&rows).unwrap()).unwrap();
        assert!(text.contains("\"Vox, Jo\""));
    }

    #[test]
    fn filename_is_stable() {
        assert_eq!(RESULT_FILENAME, "candidate_election_report.csv");
    }
}
