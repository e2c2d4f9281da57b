// Macro Tracker - Core Library
// Food catalog + daily intake ledger, usable from the CLI and tests

pub mod db;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod totals;

// Re-export commonly used types
pub use db::{
    count_foods, find_food, insert_food_if_absent, list_foods, open_database, setup_database,
    Food, IntakeEntry,
};
pub use error::TrackerError;
pub use ingest::{ingest_csv, ingest_rows, FoodRow, IngestReport, RawFoodRow, RowRejection};
pub use ledger::{count_entries, entries_for_date, record_intake};
pub use totals::{daily_totals, DailyTotals, MacroBreakdown};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
