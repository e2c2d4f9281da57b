// Entry Recorder - snapshots a catalog food into the append-only ledger.
// Entries are write-once: there is no update or undo path.

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::db::{find_food, IntakeEntry};
use crate::error::TrackerError;

/// Record that `food_name` was eaten on `date`.
///
/// Looks the name up in the catalog and copies its current macro values
/// into a new ledger row stamped with `date`. The copy is the point:
/// later catalog changes must not reach back into history. Fails with
/// [`TrackerError::FoodNotFound`] and writes nothing when the catalog
/// does not know the name. Never mutates the catalog.
pub fn record_intake(
    conn: &Connection,
    food_name: &str,
    date: NaiveDate,
) -> Result<IntakeEntry, TrackerError> {
    let food = find_food(conn, food_name)?
        .ok_or_else(|| TrackerError::FoodNotFound(food_name.to_string()))?;

    conn.execute(
        "INSERT INTO food_entries (date, food_name, calories, protein, fat, carbohydrates)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            date.to_string(),
            food.name,
            food.calories,
            food.protein,
            food.fat,
            food.carbohydrates,
        ],
    )?;

    Ok(IntakeEntry {
        id: conn.last_insert_rowid(),
        date,
        food_name: food.name,
        calories: food.calories,
        protein: food.protein,
        fat: food.fat,
        carbohydrates: food.carbohydrates,
    })
}

/// Everything logged for one date, in the order it was recorded.
pub fn entries_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<IntakeEntry>, TrackerError> {
    let mut stmt = conn.prepare(
        "SELECT id, date, food_name, calories, protein, fat, carbohydrates
         FROM food_entries
         WHERE date = ?1
         ORDER BY id",
    )?;

    let entries = stmt
        .query_map(params![date.to_string()], |row| {
            let date_text: String = row.get(1)?;
            let date = date_text.parse::<NaiveDate>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

            Ok(IntakeEntry {
                id: row.get(0)?,
                date,
                food_name: row.get(2)?,
                calories: row.get(3)?,
                protein: row.get(4)?,
                fat: row.get(5)?,
                carbohydrates: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

pub fn count_entries(conn: &Connection) -> Result<i64, TrackerError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM food_entries", [], |row| row.get(0))?;

    Ok(count)
}
