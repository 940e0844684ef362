//! `SeaORM` implementation of the `RosterService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{NewRosterEntry, Store};
use crate::services::roster_service::{ImportReport, RosterError, RosterService};

const REQUIRED_COLUMNS: [&str; 6] = ["name", "email", "usn", "department", "year", "semester"];

pub struct SeaOrmRosterService {
    store: Store,
}

impl SeaOrmRosterService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// A raw row lifted out of the CSV, fields in header order.
#[derive(Debug, Clone)]
struct RosterRow {
    name: String,
    email: String,
    usn: String,
    department: String,
    year: String,
    semester: String,
}

impl RosterRow {
    /// None when every required field is present.
    fn missing_fields(&self) -> Option<String> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("email", &self.email),
            ("usn", &self.usn),
            ("department", &self.department),
            ("year", &self.year),
            ("semester", &self.semester),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            None
        } else {
            Some(missing.join(", "))
        }
    }
}

/// Parses the upload into rows, normalizing headers by trimming and
/// lowercasing. Returns the rows in file order.
fn parse_rows(csv_bytes: &[u8]) -> Result<Vec<RosterRow>, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(csv_bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| RosterError::Parse(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let indexes: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|c| column(c)).collect();

    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| RosterError::Parse(e.to_string()))?;
        let field = |slot: usize| -> String {
            indexes[slot]
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .trim()
                .to_string()
        };

        rows.push(RosterRow {
            name: field(0),
            email: field(1),
            usn: field(2),
            department: field(3),
            year: field(4),
            semester: field(5),
        });
    }

    Ok(rows)
}

#[async_trait]
impl RosterService for SeaOrmRosterService {
    async fn import(&self, csv_bytes: &[u8]) -> Result<ImportReport, RosterError> {
        let rows = parse_rows(csv_bytes)?;

        let mut report = ImportReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            // Header occupies line 1, so data rows start at 2.
            let line = index + 2;

            if let Some(missing) = row.missing_fields() {
                report.errors.push(format!(
                    "Row {line}: Missing required fields ({missing})."
                ));
                report.skipped += 1;
                continue;
            }

            let Ok(year) = row.year.parse::<i32>() else {
                report.errors.push(format!(
                    "Row {line} (Email: {}): year '{}' is not a number.",
                    row.email, row.year
                ));
                report.skipped += 1;
                continue;
            };

            let email = row.email.to_lowercase();
            let usn = row.usn.to_lowercase();

            let already_user = self.store.user_exists_by_email_or_usn(&email, &usn).await?;
            let already_pending = self
                .store
                .roster_exists_by_email_or_usn(&email, &usn)
                .await?;

            if already_user || already_pending {
                report.skipped += 1;
                continue;
            }

            match self
                .store
                .insert_roster_entry(NewRosterEntry {
                    name: row.name,
                    email: email.clone(),
                    usn,
                    department: row.department,
                    year,
                    semester: row.semester,
                })
                .await
            {
                Ok(_) => report.added += 1,
                Err(e) => {
                    report
                        .errors
                        .push(format!("Row {line} (Email: {email}): {e}"));
                    report.skipped += 1;
                }
            }
        }

        info!(
            "Roster import complete: {} added, {} skipped, {} errors",
            report.added,
            report.skipped,
            report.errors.len()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_untidy_headers() {
        let csv = " Name , EMAIL ,usn, Department ,Year,Semester\n\
                    Jane Doe,jane@x.com,1ks21mc001,MCA,2021,3rd\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Jane Doe");
        assert_eq!(rows[0].usn, "1ks21mc001");
        assert_eq!(rows[0].semester, "3rd");
    }

    #[test]
    fn missing_fields_are_named() {
        let row = RosterRow {
            name: "Jane".to_string(),
            email: String::new(),
            usn: "1ks21mc001".to_string(),
            department: "MCA".to_string(),
            year: String::new(),
            semester: "3rd".to_string(),
        };
        assert_eq!(row.missing_fields().unwrap(), "email, year");
    }

    #[test]
    fn short_records_become_rows_with_empty_fields() {
        let csv = "name,email,usn,department,year,semester\nJane,jane@x.com\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].missing_fields().is_some());
    }

    #[test]
    fn garbage_input_is_a_parse_error_or_empty() {
        // Binary junk that is not CSV still fails or yields no usable rows
        // rather than panicking.
        let result = parse_rows(&[0xff, 0xfe, 0x00, 0x01]);
        match result {
            Ok(rows) => assert!(rows.iter().all(|r| r.missing_fields().is_some())),
            Err(RosterError::Parse(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
