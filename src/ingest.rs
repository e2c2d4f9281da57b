// Ingestion Engine - idempotent bulk merge of an external food table
// into the catalog. Bad rows are counted, not fatal; a known name is a
// skip; the whole batch commits in one transaction.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::db::insert_food_if_absent;
use crate::error::TrackerError;

/// Columns the source table must carry. Extra columns are ignored.
const REQUIRED_COLUMNS: [&str; 5] = ["name", "calories", "protein", "fat", "carbohydrates"];

// ============================================================================
// ROW SOURCE
// ============================================================================

/// One row as it arrives from the tabular source, before coercion.
///
/// Every field is text: the source format guarantees nothing about
/// types, so coercion to the declared column types happens here, per
/// row, and failures reject that row alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFoodRow {
    pub name: String,
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbohydrates: String,
}

/// A row after coercion, carrying the catalog's declared types.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodRow {
    pub name: String,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

impl RawFoodRow {
    /// Coerce the text fields to their declared types.
    ///
    /// `calories` also accepts integral-valued float text ("120.0"),
    /// which is how spreadsheet exports render integer cells. Fractional
    /// calories are a rejection, not a rounding.
    pub fn coerce(&self) -> Result<FoodRow, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("name is empty".to_string());
        }

        let calories = parse_calories(&self.calories).ok_or_else(|| {
            format!(
                "calories '{}' is not a non-negative integer",
                self.calories.trim()
            )
        })?;
        let protein = parse_grams("protein", &self.protein)?;
        let fat = parse_grams("fat", &self.fat)?;
        let carbohydrates = parse_grams("carbohydrates", &self.carbohydrates)?;

        Ok(FoodRow {
            name: name.to_string(),
            calories,
            protein,
            fat,
            carbohydrates,
        })
    }
}

fn parse_calories(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return (value >= 0).then_some(value);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
            Some(value as i64)
        }
        _ => None,
    }
}

fn parse_grams(field: &str, text: &str) -> Result<f64, String> {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(format!(
            "{field} '{}' is not a non-negative number",
            text.trim()
        )),
    }
}

// ============================================================================
// INGEST REPORT
// ============================================================================

/// Why a single row was rejected. `row` is the 1-based data row in the
/// source, header excluded.
#[derive(Debug, Clone, Serialize)]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

/// Outcome of one ingestion call.
///
/// `added + skipped + rejected` accounts for every row the source
/// yielded. `fatal` is set when the source itself could not be read; in
/// that case the catalog is untouched and all counts are zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub added: usize,
    pub skipped: usize,
    pub rejected: Vec<RowRejection>,
    pub fatal: Option<String>,
}

impl IngestReport {
    fn source_failure(message: String) -> Self {
        IngestReport {
            fatal: Some(message),
            ..Default::default()
        }
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    /// One-line description for the caller's status display.
    pub fn summary(&self) -> String {
        match &self.fatal {
            Some(reason) => format!("ingestion failed: {reason}"),
            None => format!(
                "{} added, {} skipped, {} rejected",
                self.added,
                self.skipped,
                self.rejected.len()
            ),
        }
    }
}

// ============================================================================
// INGESTION
// ============================================================================

/// Merge raw rows into the catalog.
///
/// A row that fails coercion is rejected and the batch continues. A row
/// whose name the catalog already knows is skipped, which makes a re-run
/// of the same source a no-op. Everything else is added. The batch runs
/// inside a single transaction: a storage failure partway through rolls
/// back, so no partially-applied batch is ever visible.
pub fn ingest_rows<I>(conn: &mut Connection, rows: I) -> Result<IngestReport, TrackerError>
where
    I: IntoIterator<Item = RawFoodRow>,
{
    ingest_decoded(conn, rows.into_iter().map(Ok).collect())
}

/// Ingest a CSV file with a `name,calories,protein,fat,carbohydrates`
/// header.
///
/// An unreadable file or a table missing required columns yields a
/// report with the fatal flag set, never an `Err` and never a partial
/// batch: the caller decides how to surface it and the process keeps
/// running. Only storage failures propagate as `Err`.
pub fn ingest_csv(conn: &mut Connection, path: &Path) -> Result<IngestReport, TrackerError> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            return Ok(IngestReport::source_failure(format!(
                "cannot read {}: {e}",
                path.display()
            )))
        }
    };

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return Ok(IngestReport::source_failure(format!("malformed table: {e}"))),
    };
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == column) {
            return Ok(IngestReport::source_failure(format!(
                "missing column '{column}'"
            )));
        }
    }

    // Row-level decode problems (broken quoting, short records) are
    // rejections like any other bad row, not a reason to stop.
    let decoded = reader
        .deserialize::<RawFoodRow>()
        .map(|result| result.map_err(|e| format!("unreadable row: {e}")))
        .collect();

    ingest_decoded(conn, decoded)
}

fn ingest_decoded(
    conn: &mut Connection,
    rows: Vec<Result<RawFoodRow, String>>,
) -> Result<IngestReport, TrackerError> {
    let mut report = IngestReport::default();

    let tx = conn.transaction()?;
    for (index, decoded) in rows.into_iter().enumerate() {
        match decoded.and_then(|raw| raw.coerce()) {
            Ok(row) => {
                let added = insert_food_if_absent(
                    &tx,
                    &row.name,
                    row.calories,
                    row.protein,
                    row.fat,
                    row.carbohydrates,
                )?;
                if added {
                    report.added += 1;
                } else {
                    report.skipped += 1;
                }
            }
            Err(reason) => report.rejected.push(RowRejection {
                row: index + 1,
                reason,
            }),
        }
    }
    tx.commit()?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{count_foods, find_food, list_foods, setup_database};
    use std::io::Write;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn raw(name: &str, calories: &str, protein: &str, fat: &str, carbs: &str) -> RawFoodRow {
        RawFoodRow {
            name: name.to_string(),
            calories: calories.to_string(),
            protein: protein.to_string(),
            fat: fat.to_string(),
            carbohydrates: carbs.to_string(),
        }
    }

    #[test]
    fn test_ingest_twice_is_idempotent() {
        let mut conn = test_conn();
        let rows = vec![
            raw("Apple", "52", "0.3", "0.2", "14"),
            raw("Oats", "389", "16.9", "6.9", "66.3"),
        ];

        let first = ingest_rows(&mut conn, rows.clone()).unwrap();
        let after_first = list_foods(&conn).unwrap();

        let second = ingest_rows(&mut conn, rows).unwrap();
        let after_second = list_foods(&conn).unwrap();

        assert_eq!(first.added, 2);
        assert_eq!(first.skipped, 0);
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(after_first, after_second, "re-run must not change the catalog");
    }

    #[test]
    fn test_rejected_row_does_not_abort_the_batch() {
        let mut conn = test_conn();
        let rows = vec![
            raw("A", "100", "10", "2", "20"),
            raw("B", "not-a-number", "5", "8", "30"),
        ];

        let report = ingest_rows(&mut conn, rows).unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.rejected[0].row, 2);
        assert!(find_food(&conn, "A").unwrap().is_some());
        assert!(find_food(&conn, "B").unwrap().is_none());
    }

    #[test]
    fn test_rejects_negative_values_and_empty_name() {
        let mut conn = test_conn();
        let rows = vec![
            raw("", "100", "10", "2", "20"),
            raw("Ghost", "-5", "10", "2", "20"),
            raw("Phantom", "100", "-1", "2", "20"),
        ];

        let report = ingest_rows(&mut conn, rows).unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.rejected_count(), 3);
        assert_eq!(count_foods(&conn).unwrap(), 0);
    }

    #[test]
    fn test_calories_accept_integral_float_text() {
        let mut conn = test_conn();
        let rows = vec![
            raw("Rice", "130.0", "2.7", "0.3", "28.2"),
            raw("Halfway", "130.5", "2.7", "0.3", "28.2"),
        ];

        let report = ingest_rows(&mut conn, rows).unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(find_food(&conn, "Rice").unwrap().unwrap().calories, 130);
    }

    #[test]
    fn test_ingest_csv_file() {
        let mut conn = test_conn();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foods.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name,calories,protein,fat,carbohydrates").unwrap();
        writeln!(file, "Apple,52,0.3,0.2,14").unwrap();
        writeln!(file, "Egg,155,13,11,1.1").unwrap();
        writeln!(file, "Broken,abc,1,1,1").unwrap();

        let report = ingest_csv(&mut conn, &path).unwrap();

        assert!(!report.is_fatal());
        assert_eq!(report.added, 2);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(count_foods(&conn).unwrap(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal_report_not_error() {
        let mut conn = test_conn();

        let report = ingest_csv(&mut conn, Path::new("/no/such/file.csv")).unwrap();

        assert!(report.is_fatal());
        assert_eq!(report.added, 0);
        assert_eq!(report.skipped, 0);
        assert_eq!(count_foods(&conn).unwrap(), 0);
    }

    #[test]
    fn test_missing_column_is_fatal_report() {
        let mut conn = test_conn();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foods.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "name,calories,protein,fat").unwrap();
        writeln!(file, "Apple,52,0.3,0.2").unwrap();

        let report = ingest_csv(&mut conn, &path).unwrap();

        assert!(report.is_fatal());
        assert!(report.fatal.unwrap().contains("carbohydrates"));
        assert_eq!(count_foods(&conn).unwrap(), 0);
    }

    #[test]
    fn test_report_summary_lines() {
        let report = IngestReport {
            added: 3,
            skipped: 1,
            rejected: vec![RowRejection {
                row: 5,
                reason: "name is empty".to_string(),
            }],
            fatal: None,
        };
        assert_eq!(report.summary(), "3 added, 1 skipped, 1 rejected");

        let failed = IngestReport::source_failure("cannot read foods.csv".to_string());
        assert_eq!(failed.summary(), "ingestion failed: cannot read foods.csv");
    }
}
