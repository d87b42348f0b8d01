//! # Seed Data Generator
//!
//! Fills a store with a demo trading day, then runs a report over it.
//!
//! ## Usage
//! ```bash
//! # Seed today into ./tally_dev.db and print the all-operators report
//! cargo run -p tally-store --bin seed
//!
//! # A specific day, one cashier's shift, as JSON
//! cargo run -p tally-store --bin seed -- --date 2026-03-14 --operator op-1 --json
//!
//! # More logging
//! RUST_LOG=tally=debug cargo run -p tally-store --bin seed
//! ```

use chrono::{NaiveDate, Utc};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tally_core::{OperatorFilter, OperatorId, Report};
use tally_engine::{CancellationToken, EngineConfig, Gateways, ReportEngine, ReportRequest};
use tally_store::demo::{day_window, seed_shift};
use tally_store::{Database, DbConfig, SqliteGateways};

struct Args {
    db_path: String,
    date: NaiveDate,
    filter: OperatorFilter,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", args.db_path);
    println!("Day:      {}", args.date);
    println!("Scope:    {}", args.filter);
    println!();

    let db = Database::new(DbConfig::new(&args.db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sales().count_sales().await?;
    let window = if existing > 0 {
        warn!(existing, "Store already has sales, skipping seed");
        println!("⚠ Database already has {} sales, not seeding again", existing);
        day_window(args.date)?
    } else {
        let shift = seed_shift(&db, args.date).await?;
        println!("✓ Seeded demo shift for {}", args.date);
        shift.window
    };

    // The manager can see every scope.
    let gateways = SqliteGateways::new(db.clone(), OperatorId::new("mgr-1"));
    let engine = ReportEngine::new(
        Gateways::from_single(Arc::new(gateways)),
        EngineConfig::load_or_default(None),
    );

    let request = ReportRequest {
        window,
        operator_filter: args.filter,
    };
    let report = engine.generate(&request, &CancellationToken::new()).await?;
    info!(report_number = %report.report_number(), "Report ready");

    println!();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    db.close().await;
    Ok(())
}

fn parse_args() -> Result<Option<Args>, Box<dyn std::error::Error>> {
    let argv: Vec<String> = env::args().collect();
    let mut args = Args {
        db_path: "./tally_dev.db".to_string(),
        date: Utc::now().date_naive(),
        filter: OperatorFilter::All,
        json: false,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = argv.get(i + 1) {
                    args.db_path = path.clone();
                    i += 1;
                }
            }
            "--date" => {
                if let Some(date) = argv.get(i + 1) {
                    args.date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
                    i += 1;
                }
            }
            "--operator" | "-o" => {
                if let Some(id) = argv.get(i + 1) {
                    args.filter = OperatorFilter::Specific(OperatorId::new(id.as_str()));
                    i += 1;
                }
            }
            "--json" => args.json = true,
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./tally_dev.db)");
                println!("      --date <YYYY-MM-DD> Day to seed and report on (default: today, UTC)");
                println!("  -o, --operator <ID>    Report on one operator (default: all)");
                println!("      --json             Print the report as JSON");
                println!("  -h, --help             Show this help message");
                return Ok(None);
            }
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    Ok(Some(args))
}

fn print_summary(report: &Report) {
    println!("Report {}", report.report_number());
    println!("  window:    {}", report.window());
    println!("  operators: {}", report.operator_filter());
    println!("  lines:     {}", report.line_count());
    println!();

    match report.payment_totals().as_complete() {
        Some(payments) => {
            println!("Payments");
            for (method, entry) in payments {
                println!("  {:<12} {:>3} × {:>10}", method, entry.count, entry.net_total);
            }
        }
        None => println!("Payments: unavailable ({:?})", report.payment_totals().missing()),
    }

    if let Some(summary) = report.revenue_summary().as_complete() {
        println!();
        println!("  gross sales  {:>10}", summary.gross_sales);
        println!("  returns      {:>10}", summary.total_returns);
        println!("  purchases    {:>10}", summary.total_purchases);
        println!("  charges      {:>10}", summary.total_charges);
        println!("  net result   {:>10}", summary.net_result);
    }

    println!();
    match report.cash_position().as_complete() {
        Some(cash) => println!("Expected cash in drawer: {}", cash.expected),
        None => println!("Cash position unavailable"),
    }

    if report.has_warnings() {
        println!();
        println!("Warnings");
        for diag in report.diagnostics() {
            println!("  ⚠ {}", diag);
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - Default: warnings only, so the printed report stays readable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
