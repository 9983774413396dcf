use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "registry.db";

#[derive(Parser, Debug)]
#[command(
    name = "company-registry",
    version,
    about = "Reconcile company profile exports against the company registry"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "REGISTRY_DB",
        default_value = DEFAULT_DB_PATH,
        help = "SQLite registry database"
    )]
    pub db: PathBuf,
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the registry tables if they do not exist
    Init,
    /// Read the profile batch and write new, renamed and re-contacted companies
    Reconcile {
        #[arg(long, env = "PROFILE_DIR", default_value = ".", help = "Folder holding company_profile2_*.csv")]
        input_dir: PathBuf,
        #[arg(long, help = "Processing date (YYYY-MM-DD), defaults to today")]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = false, help = "Classify without writing")]
        dry_run: bool,
    },
    /// Print the current registry snapshot
    Snapshot,
}
