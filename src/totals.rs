// Aggregation Engine - rolls ledger entries up into per-day totals.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::TrackerError;

/// Roll-up across every entry logged for one date.
///
/// Calories stay integral through the sum; macros accumulate as gram
/// totals with no intermediate rounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotals {
    pub date: NaiveDate,
    pub entry_count: i64,
    pub calories: i64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrates: f64,
}

/// Macro shares in percent of total macro grams. Derived on demand,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroBreakdown {
    pub protein_pct: f64,
    pub fat_pct: f64,
    pub carbohydrates_pct: f64,
}

impl DailyTotals {
    /// Percentage view of the macro split.
    ///
    /// A day whose entries carry zero macro grams has no meaningful
    /// split; that case is `None`, not a division fault.
    pub fn breakdown(&self) -> Option<MacroBreakdown> {
        let grams = self.protein + self.fat + self.carbohydrates;
        if grams == 0.0 {
            return None;
        }

        Some(MacroBreakdown {
            protein_pct: self.protein / grams * 100.0,
            fat_pct: self.fat / grams * 100.0,
            carbohydrates_pct: self.carbohydrates / grams * 100.0,
        })
    }
}

/// Total calories and macros for one date.
///
/// `Ok(None)` means nothing was logged that day. That is distinct from a
/// day of zero-calorie entries, which comes back as `Some` with zero
/// sums and a nonzero `entry_count`.
pub fn daily_totals(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Option<DailyTotals>, TrackerError> {
    let (entry_count, calories, protein, fat, carbohydrates) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(calories), 0),
                COALESCE(SUM(protein), 0.0),
                COALESCE(SUM(fat), 0.0),
                COALESCE(SUM(carbohydrates), 0.0)
         FROM food_entries
         WHERE date = ?1",
        params![date.to_string()],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        },
    )?;

    if entry_count == 0 {
        return Ok(None);
    }

    Ok(Some(DailyTotals {
        date,
        entry_count,
        calories,
        protein,
        fat,
        carbohydrates,
    }))
}
