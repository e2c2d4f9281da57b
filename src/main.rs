use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::env;
use std::path::PathBuf;

use macro_tracker::{
    count_foods, daily_totals, entries_for_date, ingest_csv, list_foods, open_database,
    record_intake,
};

const DEFAULT_DB: &str = "macro_tracker.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let Some(command) = args.first() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "import" => run_import(&args[1..]),
        "foods" => run_foods(&args[1..]),
        "log" => run_log(&args[1..]),
        "today" => run_today(&args[1..]),
        "entries" => run_entries(&args[1..]),
        "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            bail!("unknown command '{other}'")
        }
    }
}

fn print_usage() {
    println!("macro-tracker {}", macro_tracker::VERSION);
    println!();
    println!("Usage:");
    println!("  macro-tracker import <foods.csv>   merge a food table into the catalog");
    println!("  macro-tracker foods                list the catalog");
    println!("  macro-tracker log <name>           record an intake (default: today)");
    println!("  macro-tracker today [--json]       calorie/macro totals for the day");
    println!("  macro-tracker entries              list the day's recorded intakes");
    println!();
    println!("Options:");
    println!("  --db <path>     database file (default: {DEFAULT_DB})");
    println!("  --date <Y-M-D>  act on a specific date instead of today");
}

fn run_import(args: &[String]) -> Result<()> {
    let Some(csv_path) = positionals(args).first().copied().map(PathBuf::from) else {
        bail!("import needs a CSV file path");
    };
    let mut conn = open_database(&db_path(args))?;

    println!("📂 Importing foods from {}", csv_path.display());
    let report = ingest_csv(&mut conn, &csv_path)?;

    for rejection in &report.rejected {
        println!("✗ Row {}: {}", rejection.row, rejection.reason);
    }
    if let Some(reason) = &report.fatal {
        bail!("import failed: {reason}");
    }

    println!("✓ Added: {}", report.added);
    println!("✓ Skipped (already known): {}", report.skipped);
    println!("✓ Rejected: {}", report.rejected_count());
    println!("✓ Catalog now holds {} foods", count_foods(&conn)?);

    Ok(())
}

fn run_foods(args: &[String]) -> Result<()> {
    let conn = open_database(&db_path(args))?;
    let foods = list_foods(&conn)?;

    if foods.is_empty() {
        println!("Catalog is empty. Run: macro-tracker import <foods.csv>");
        return Ok(());
    }

    for food in &foods {
        println!(
            "{:<24} {:>5} kcal  P {:>5.1}g  F {:>5.1}g  C {:>5.1}g",
            food.name, food.calories, food.protein, food.fat, food.carbohydrates
        );
    }
    println!("\n{} foods in the catalog", foods.len());

    Ok(())
}

fn run_log(args: &[String]) -> Result<()> {
    let Some(name) = positionals(args).first().map(|s| s.to_string()) else {
        bail!("log needs a food name");
    };
    let date = target_date(args)?;
    let conn = open_database(&db_path(args))?;

    let entry = record_intake(&conn, &name, date)?;
    println!(
        "✓ Added {} to {}'s intake ({} kcal)",
        entry.food_name, entry.date, entry.calories
    );

    Ok(())
}

fn run_today(args: &[String]) -> Result<()> {
    let date = target_date(args)?;
    let conn = open_database(&db_path(args))?;
    let totals = daily_totals(&conn, date)?;

    if has_flag(args, "--json") {
        let body = match &totals {
            Some(totals) => serde_json::json!({
                "totals": totals,
                "breakdown": totals.breakdown(),
            }),
            None => serde_json::json!({ "totals": null, "breakdown": null }),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let Some(totals) = totals else {
        println!("Nothing logged for {date} yet.");
        return Ok(());
    };

    println!("📊 {} — {} entries", totals.date, totals.entry_count);
    println!("Total calories: {}", totals.calories);
    println!(
        "Protein {:.1}g  Fat {:.1}g  Carbs {:.1}g",
        totals.protein, totals.fat, totals.carbohydrates
    );
    match totals.breakdown() {
        Some(split) => println!(
            "Split: {:.1}% protein / {:.1}% fat / {:.1}% carbs",
            split.protein_pct, split.fat_pct, split.carbohydrates_pct
        ),
        None => println!("Split: no macro grams logged"),
    }

    Ok(())
}

fn run_entries(args: &[String]) -> Result<()> {
    let date = target_date(args)?;
    let conn = open_database(&db_path(args))?;
    let entries = entries_for_date(&conn, date)?;

    if entries.is_empty() {
        println!("Nothing logged for {date} yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "#{:<4} {:<24} {:>5} kcal  P {:>5.1}g  F {:>5.1}g  C {:>5.1}g",
            entry.id, entry.food_name, entry.calories, entry.protein, entry.fat,
            entry.carbohydrates
        );
    }
    println!("\n{} entries on {date}", entries.len());

    Ok(())
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn db_path(args: &[String]) -> PathBuf {
    flag_value(args, "--db")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn target_date(args: &[String]) -> Result<NaiveDate> {
    match flag_value(args, "--date") {
        Some(text) => text
            .parse::<NaiveDate>()
            .with_context(|| format!("invalid date '{text}', expected YYYY-MM-DD")),
        None => Ok(Local::now().date_naive()),
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Arguments that are neither flags nor values consumed by a flag.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg == "--db" || arg == "--date" {
            skip = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}
