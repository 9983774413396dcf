mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use company_registry::{
    apply_pass, count_companies, load_registry, read_batch, run_pass, setup_database, BatchSummary,
    PassKind, PassReport,
};

#[derive(Serialize)]
struct RunSummary {
    dry_run: bool,
    batch: BatchSummary,
    passes: Vec<PassReport>,
    companies: i64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => run_init(&cli.db),
        Commands::Reconcile { ref input_dir, date, dry_run } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            run_reconcile(&cli.db, input_dir, date, dry_run, cli.json)
        }
        Commands::Snapshot => run_snapshot(&cli.db, cli.json),
    }
}

fn open_registry(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open registry {}", db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_init(db_path: &Path) -> Result<()> {
    open_registry(db_path)?;
    println!("✓ Registry ready at {}", db_path.display());
    Ok(())
}

fn run_reconcile(
    db_path: &Path,
    input_dir: &Path,
    date: chrono::NaiveDate,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    // 1. Read batch
    let batch = read_batch(input_dir, date)?;
    if !json {
        println!("📂 Loaded {} rows from {} file(s)", batch.summary.rows_loaded, batch.summary.files.len());
        println!("✓ Kept {} companies after dropping blanks and duplicate names", batch.summary.rows_kept);
    }

    // 2. Open registry
    let mut conn = open_registry(db_path)?;

    // 3. Name pass, then contact pass against the refreshed snapshot
    let mut passes = Vec::new();
    for kind in [PassKind::Name, PassKind::Contact] {
        let registry = load_registry(&conn)?;
        let outcome = run_pass(&batch.records, &registry, kind)
            .with_context(|| format!("{} pass failed", kind.as_str()))?;

        if !json {
            println!("🔄 {}", outcome.report.summary());
            for ambiguous in &outcome.ambiguous {
                println!(
                    "   ⚠ '{}' matches companies {:?}, using {}",
                    ambiguous.candidate_name, ambiguous.matching_ids, ambiguous.adopted_id
                );
            }
        }

        if !dry_run {
            let inserted = apply_pass(&mut conn, &outcome, "batch_reconciler")?;
            if !json {
                println!("💾 Inserted {} rows", inserted);
            }
        }

        passes.push(outcome.report);
    }

    let companies = count_companies(&conn)?;

    if json {
        let summary = RunSummary {
            dry_run,
            batch: batch.summary,
            passes,
            companies,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if dry_run {
            println!("✓ Dry run: nothing written");
        }
        println!("✓ Registry holds {} companies", companies);
    }

    Ok(())
}

fn run_snapshot(db_path: &Path, json: bool) -> Result<()> {
    let conn = open_registry(db_path)?;
    let registry = load_registry(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&registry)?);
        return Ok(());
    }

    for row in &registry {
        println!(
            "{:>6}  {:<40} {:<12} {:<16} {}",
            row.company_id,
            row.name.as_deref().unwrap_or("-"),
            row.ipo_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            row.phone.as_deref().unwrap_or("-"),
            row.web_url.as_deref().unwrap_or("-"),
        );
    }
    println!("✓ {} companies", registry.len());

    Ok(())
}
