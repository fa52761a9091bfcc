use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod aggregate;
mod bucket;
mod db;
mod error;
mod models;
mod ops;
mod period;
mod ranking;
mod scope;

use models::Category;
use ranking::RankBy;

#[derive(Parser)]
#[command(name = "points-ledger-analytics")]
#[command(about = "Scoped points ledger and trend analytics for school reward platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import point transactions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Monthly rollup for the current educational year (Aug-Jun)
    YearRollup {
        #[arg(long)]
        staff: Uuid,
        /// Restrict to one student (must be inside the caller's scope)
        #[arg(long)]
        subject: Option<Uuid>,
    },
    /// Seven-day rollup for one category, Sunday-start week
    WeekRollup {
        #[arg(long)]
        staff: Uuid,
        /// Any date inside the requested week (default: today)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value = "award")]
        category: Category,
    },
    /// Per-day totals over a relative window (1W, 1M, 3M, 6M, 1Y)
    History {
        #[arg(long)]
        staff: Uuid,
        #[arg(long)]
        period: String,
        #[arg(long, value_enum, default_value = "award")]
        category: Category,
    },
    /// Leaderboard by submitting staff or by student
    Ranking {
        #[arg(long)]
        staff: Uuid,
        #[arg(long, value_enum)]
        by: RankBy,
        #[arg(long, value_enum, default_value = "award")]
        category: Category,
        /// Lookback token (default: the current week)
        #[arg(long)]
        period: Option<String>,
    },
    /// Category totals and feedback for one student since the
    /// educational-year start
    SubjectSummary {
        #[arg(long)]
        staff: Uuid,
        #[arg(long)]
        subject: Uuid,
    },
    /// Irreversibly delete a school's ledger and student roster
    RosterReset {
        #[arg(long)]
        school: Uuid,
        /// Must match the school's name exactly
        #[arg(long)]
        confirm: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} transactions from {}.", csv.display());
        }
        Commands::YearRollup { staff, subject } => {
            let rollup = match subject {
                Some(subject) => ops::year_rollup_for_subject(&pool, staff, subject).await?,
                None => ops::year_rollup(&pool, staff).await?,
            };
            println!("{}", serde_json::to_string_pretty(&rollup)?);
        }
        Commands::WeekRollup {
            staff,
            start_date,
            category,
        } => {
            let buckets = ops::week_rollup(&pool, staff, start_date, category).await?;
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
        Commands::History {
            staff,
            period,
            category,
        } => {
            let series = ops::historical_series(&pool, staff, &period, category).await?;
            println!("{}", serde_json::to_string_pretty(&series)?);
        }
        Commands::Ranking {
            staff,
            by,
            category,
            period,
        } => {
            let entries = ops::ranking(&pool, staff, by, category, period.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::SubjectSummary { staff, subject } => {
            let summary = ops::subject_lifetime_summary(&pool, staff, subject).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::RosterReset { school, confirm } => {
            let name = db::fetch_school_name(&pool, school)
                .await?
                .with_context(|| format!("no school with id {school}"))?;
            if confirm != name {
                anyhow::bail!(
                    "refusing roster reset: --confirm must match the school name {name:?}"
                );
            }
            let (transactions, students) = db::roster_reset(&pool, school).await?;
            println!(
                "Deleted {transactions} transactions and {students} students for {name}. \
                 This cannot be undone."
            );
        }
    }

    Ok(())
}
