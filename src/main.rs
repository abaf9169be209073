use std::path::PathBuf;

use anyhow::Context;
use are_you_safe::cache::RecommendationCache;
use are_you_safe::config::AppConfig;
use are_you_safe::db::{self, PgRecommendationCache};
use are_you_safe::models::ReportStatus;
use are_you_safe::service::{Outcome, RecommendationService};
use are_you_safe::{report, trend};
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "are-you-safe")]
#[command(about = "Incident recommendations and trend analysis for Are You Safe reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed reports
    Seed,
    /// Import reports from a CSV or JSON file
    #[command(group(
        ArgGroup::new("source")
            .args(["csv", "json"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Export every report as JSON
    Export {
        #[arg(long, default_value = "reports.json")]
        out: PathBuf,
    },
    /// Show the teacher dashboard
    List {
        #[arg(long)]
        student: Option<String>,
    },
    /// Change a report's status or teacher notes
    #[command(group(
        ArgGroup::new("change")
            .args(["status", "notes"])
            .required(true)
            .multiple(true)
    ))]
    Update {
        id: Uuid,
        #[arg(long, value_parser = parse_status)]
        status: Option<ReportStatus>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show recommendations for a report
    Recommend {
        id: Uuid,
        /// Ignore the cached result and score the report again
        #[arg(long)]
        regenerate: bool,
    },
    /// Analyze every report filed by a student
    Analyze {
        student: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write a markdown summary of one report and its recommendations
    Summary {
        id: Uuid,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_status(value: &str) -> Result<ReportStatus, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let database_url = config.require_database_url()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} seed reports.");
        }
        Commands::Import { csv, json } => {
            let (inserted, path) = match (csv, json) {
                (Some(path), _) => (db::import_csv(&pool, &path).await?, path),
                (None, Some(path)) => (db::import_json(&pool, &path).await?, path),
                (None, None) => anyhow::bail!("pass --csv or --json"),
            };
            println!("Inserted {inserted} reports from {}.", path.display());
        }
        Commands::Export { out } => {
            let json = db::export_json(&pool).await?;
            std::fs::write(&out, json)?;
            println!("Reports exported to {}.", out.display());
        }
        Commands::List { student } => {
            let reports = db::fetch_reports(&pool, student.as_deref()).await?;
            print!("{}", report::build_dashboard(&reports));
        }
        Commands::Update { id, status, notes } => {
            let updated = db::update_report(&pool, id, status, notes).await?;
            println!("Report {} is now {}.", updated.id, updated.status);
        }
        Commands::Recommend { id, regenerate } => {
            let incident = db::fetch_report(&pool, id).await?;
            let service =
                RecommendationService::new(PgRecommendationCache::new(pool.clone()), config.engine);
            let outcome = if regenerate {
                service.regenerate(&incident).await?
            } else {
                service.cached_or_generate(&incident).await?
            };

            match &outcome {
                Outcome::Superseded => println!("A newer request replaced this recommendation."),
                Outcome::Cached(rec) | Outcome::Fresh(rec) => {
                    print!("{}", report::build_incident_summary(&incident, Some(rec)));
                }
            }
        }
        Commands::Analyze { student, out } => {
            let reports = db::fetch_reports(&pool, Some(student.as_str())).await?;
            let analysis = trend::analyze_student_reports(&reports);
            let name = reports
                .first()
                .map(|r| r.student_name.clone())
                .unwrap_or_else(|| student.clone());
            let output = report::build_student_report(&name, &analysis);
            write_or_print(output, out.as_ref())?;
        }
        Commands::Summary { id, out } => {
            let incident = db::fetch_report(&pool, id).await?;
            let cache = PgRecommendationCache::new(pool.clone());
            let rec = cache.get(id).await?;
            if rec.is_none() {
                info!(report_id = %id, "no cached recommendation; run `recommend` first to include one");
            }
            let output = report::build_incident_summary(&incident, rec.as_ref());
            write_or_print(output, out.as_ref())?;
        }
    }

    Ok(())
}

fn write_or_print(output: String, out: Option<&PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, output)?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}
