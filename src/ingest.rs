use std::path::Path;

use serde_json::Value;

use crate::models::RawRecord;

const ID_ALIASES: [&str; 5] = ["Student_Id", "student_id", "StudentId", "Id", "id"];
const NAME_ALIASES: [&str; 2] = ["Name", "name"];
const EMAIL_ALIASES: [&str; 2] = ["Email", "email"];

/// One roster row with its identity resolved and everything else kept raw
/// for the normalizer.
#[derive(Debug, Clone)]
pub struct RosterRow {
    pub student_id: String,
    pub name: String,
    pub email: Option<String>,
    pub raw: RawRecord,
}

/// Reads a roster CSV into raw records. Header names are taken as-is;
/// numeric-looking cells become numbers, blank cells are dropped, anything
/// else stays a string. Identity columns are resolved from the untouched
/// cell text so a numeric `Student_Id` like 1001 is never rewritten as
/// "1001.0". No row here can fail the batch.
pub fn read_roster(csv_path: &Path) -> anyhow::Result<Vec<RosterRow>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let mut raw = RawRecord::new();

        for (header, field) in headers.iter().zip(record.iter()) {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }
            let value = match field.parse::<f64>() {
                Ok(n) => serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(field.to_string())),
                Err(_) => Value::String(field.to_string()),
            };
            raw.insert(header.to_string(), value);
        }

        rows.push(resolve_identity(index, &headers, &record, raw));
    }

    Ok(rows)
}

fn resolve_identity(
    index: usize,
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
    raw: RawRecord,
) -> RosterRow {
    let student_id = first_field(headers, record, &ID_ALIASES)
        .unwrap_or_else(|| format!("student_{}", index + 1));
    let name = first_field(headers, record, &NAME_ALIASES)
        .unwrap_or_else(|| format!("Student {}", index + 1));
    let email = first_field(headers, record, &EMAIL_ALIASES).filter(|e| plausible_email(e));

    RosterRow {
        student_id,
        name,
        email,
        raw,
    }
}

/// First alias whose column holds a non-blank cell, taken verbatim from the
/// record before any numeric coercion.
fn first_field(
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
    aliases: &[&str],
) -> Option<String> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|header| header == *alias)
            .and_then(|i| record.get(i))
            .map(|field| field.trim().to_string())
            .filter(|field| !field.is_empty())
    })
}

/// Structural check only: local part, one '@', a dot in the domain.
fn plausible_email(candidate: &str) -> bool {
    let mut parts = candidate.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !candidate.contains(char::is_whitespace)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SCRATCH_SEQ: AtomicUsize = AtomicUsize::new(0);

    struct TempCsv(PathBuf);

    impl Drop for TempCsv {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn write_csv(contents: &str) -> TempCsv {
        let path = std::env::temp_dir().join(format!(
            "roster-risk-test-{}-{}.csv",
            std::process::id(),
            SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&path, contents).unwrap();
        TempCsv(path)
    }

    #[test]
    fn parses_numbers_and_keeps_text_verbatim() {
        let csv = write_csv(
            "Student_Id,Name,Math,Remarks\nS1,Avery Lee,87.5,steady\n",
        );
        let rows = read_roster(&csv.0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_id, "S1");
        assert_eq!(rows[0].name, "Avery Lee");
        assert_eq!(rows[0].raw["Math"], json!(87.5));
        assert_eq!(rows[0].raw["Remarks"], json!("steady"));
    }

    #[test]
    fn blank_cells_are_dropped_and_identity_falls_back() {
        let csv = write_csv("Math,English\n,\n70,80\n");
        let rows = read_roster(&csv.0).unwrap();
        assert!(rows[0].raw.is_empty());
        assert_eq!(rows[0].student_id, "student_1");
        assert_eq!(rows[1].name, "Student 2");
        assert_eq!(rows[1].raw.len(), 2);
    }

    #[test]
    fn numeric_student_ids_keep_their_cell_text() {
        let csv = write_csv("Student_Id,Name,Math\n1001,Avery,80\n");
        let rows = read_roster(&csv.0).unwrap();
        // The stable DB key must be the verbatim cell, not the coerced
        // number rendered back to text.
        assert_eq!(rows[0].student_id, "1001");
        assert_eq!(rows[0].name, "Avery");
        assert_eq!(rows[0].raw["Student_Id"], json!(1001.0));
    }

    #[test]
    fn implausible_emails_are_discarded() {
        let csv = write_csv(
            "Name,Email\nAvery,avery@school.edu\nJules,not-an-email\n",
        );
        let rows = read_roster(&csv.0).unwrap();
        assert_eq!(rows[0].email.as_deref(), Some("avery@school.edu"));
        assert_eq!(rows[1].email, None);
    }

    #[test]
    fn email_structural_check() {
        assert!(plausible_email("a@b.co"));
        assert!(!plausible_email("a@b"));
        assert!(!plausible_email("@b.co"));
        assert!(!plausible_email("a b@c.co"));
        assert!(!plausible_email("a@b.co@d.co"));
    }
}
