use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TrackerError;

/// A catalog food with its macro profile.
///
/// `name` is the natural key: the UNIQUE constraint on `foods.name`
/// guarantees at most one row per distinct name. Catalog rows are written
/// only by ingestion and never mutated in place — a re-import of a known
/// name is a no-op, not an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub name: String,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

/// One logged consumption, dated.
///
/// Macro values are copied from the catalog at recording time rather than
/// joined back to `foods`. There is deliberately no foreign key: a later
/// catalog change must not rewrite what was already eaten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeEntry {
    pub id: i64,
    pub date: chrono::NaiveDate,
    pub food_name: String,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

/// Open (or create) the tracker database at `path` and ensure the schema.
pub fn open_database(path: &Path) -> Result<Connection, TrackerError> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<(), TrackerError> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Foods Table (the catalog: one row per distinct name)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS foods (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            calories INTEGER NOT NULL,
            protein REAL NOT NULL,
            fat REAL NOT NULL,
            carbohydrates REAL NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Food Entries Table (the ledger: append-only, dated snapshots)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS food_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            food_name TEXT NOT NULL,
            calories INTEGER NOT NULL,
            protein REAL NOT NULL,
            fat REAL NOT NULL,
            carbohydrates REAL NOT NULL
        )",
        [],
    )?;

    // Daily aggregation scans by date
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_food_entries_date ON food_entries(date)",
        [],
    )?;

    Ok(())
}

/// Insert a food only if the catalog has no row with that name.
///
/// Duplicates are the expected steady state on repeated ingestion: the
/// UNIQUE constraint violation is caught and reported as `Ok(false)`,
/// never as an error. Returns whether a row was actually inserted.
pub fn insert_food_if_absent(
    conn: &Connection,
    name: &str,
    calories: i64,
    protein: f64,
    fat: f64,
    carbohydrates: f64,
) -> Result<bool, TrackerError> {
    let result = conn.execute(
        "INSERT INTO foods (name, calories, protein, fat, carbohydrates)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, calories, protein, fat, carbohydrates],
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Every known food, ordered by name so a single call is deterministic.
pub fn list_foods(conn: &Connection) -> Result<Vec<Food>, TrackerError> {
    let mut stmt = conn.prepare(
        "SELECT name, calories, protein, fat, carbohydrates
         FROM foods
         ORDER BY name",
    )?;

    let foods = stmt
        .query_map([], |row| {
            Ok(Food {
                name: row.get(0)?,
                calories: row.get(1)?,
                protein: row.get(2)?,
                fat: row.get(3)?,
                carbohydrates: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(foods)
}

/// Exact-match lookup. Absence is a normal outcome, not an error.
pub fn find_food(conn: &Connection, name: &str) -> Result<Option<Food>, TrackerError> {
    let food = conn
        .query_row(
            "SELECT name, calories, protein, fat, carbohydrates
             FROM foods
             WHERE name = ?1",
            params![name],
            |row| {
                Ok(Food {
                    name: row.get(0)?,
                    calories: row.get(1)?,
                    protein: row.get(2)?,
                    fat: row.get(3)?,
                    carbohydrates: row.get(4)?,
                })
            },
        )
        .optional()?;

    Ok(food)
}

pub fn count_foods(conn: &Connection) -> Result<i64, TrackerError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_reports_whether_a_row_was_added() {
        let conn = test_conn();

        let first = insert_food_if_absent(&conn, "Apple", 52, 0.3, 0.2, 14.0).unwrap();
        let second = insert_food_if_absent(&conn, "Apple", 95, 9.9, 9.9, 99.0).unwrap();

        assert!(first, "first insert of a name should add a row");
        assert!(!second, "second insert of the same name should be a no-op");
        assert_eq!(count_foods(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert_keeps_original_values() {
        let conn = test_conn();

        insert_food_if_absent(&conn, "Oats", 389, 16.9, 6.9, 66.3).unwrap();
        insert_food_if_absent(&conn, "Oats", 100, 1.0, 1.0, 1.0).unwrap();

        let food = find_food(&conn, "Oats").unwrap().unwrap();
        assert_eq!(food.calories, 389);
        assert_eq!(food.protein, 16.9);
    }

    #[test]
    fn test_find_food_absent_is_none() {
        let conn = test_conn();

        insert_food_if_absent(&conn, "Apple", 52, 0.3, 0.2, 14.0).unwrap();

        assert!(find_food(&conn, "Dragonfruit").unwrap().is_none());
        // Lookup is case-sensitive: "apple" is not "Apple"
        assert!(find_food(&conn, "apple").unwrap().is_none());
    }

    #[test]
    fn test_list_foods_ordered_by_name() {
        let conn = test_conn();

        insert_food_if_absent(&conn, "Walnut", 654, 15.2, 65.2, 13.7).unwrap();
        insert_food_if_absent(&conn, "Apple", 52, 0.3, 0.2, 14.0).unwrap();
        insert_food_if_absent(&conn, "Oats", 389, 16.9, 6.9, 66.3).unwrap();

        let names: Vec<String> = list_foods(&conn)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Apple", "Oats", "Walnut"]);
    }

    #[test]
    fn test_uncommitted_transaction_rolls_back() {
        let mut conn = test_conn();

        {
            let tx = conn.transaction().unwrap();
            insert_food_if_absent(&tx, "Apple", 52, 0.3, 0.2, 14.0).unwrap();
            // Dropped without commit
        }

        assert_eq!(count_foods(&conn).unwrap(), 0);
    }
}
