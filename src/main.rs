use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod config;
mod db;
mod error;
mod ingest;
mod models;
mod ranking;
mod report;
mod roster;
mod telemetry;

use config::{AppSettings, ScoringConfig};
use ranking::RankTarget;
use report::ReportFormat;

#[derive(Parser)]
#[command(name = "cadet-score-report")]
#[command(about = "Cohort-relative score reports for cadet evaluations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the cadet registry schema
    InitDb,
    /// Merge roster CSV exports into the cadet registry
    ///
    /// Existing cadets keep the flight already stored in the registry; the
    /// roster never clears it.
    ImportRoster {
        #[arg(long, required = true, num_args = 1..)]
        csv: Vec<PathBuf>,
    },
    /// Write a blank score-entry sheet for registered cadets
    Sheet {
        #[arg(long, default_value = "score_sheet.csv")]
        out: PathBuf,
        /// AS year labels to include
        #[arg(long = "cohort", default_values_t = ["100".to_string(), "200".to_string()])]
        cohorts: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Rank a completed score sheet and write the per-cadet report
    Report {
        #[arg(long)]
        scores: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "Score Report.md")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = "Score Report")]
        title: String,
    },
    /// Print standings for one metric (or "overall") by cohort pool
    Rank {
        #[arg(long)]
        scores: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = ranking::OVERALL)]
        metric: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

async fn connect(settings: &AppSettings) -> anyhow::Result<PgPool> {
    let database_url = settings
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set to reach the cadet registry")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn load_ranked(
    scores: &Path,
    config: Option<&Path>,
) -> anyhow::Result<(ScoringConfig, Vec<models::RankedCadet>)> {
    let config = ScoringConfig::load(config).context("failed to load scoring config")?;
    let cadets = ingest::load_cadets(scores, &config)?;
    let ranked = ranking::rank(cadets, &config);
    Ok((config, ranked))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = AppSettings::load();
    telemetry::init(&settings)?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::ImportRoster { csv } => {
            let pool = connect(&settings).await?;
            for path in csv {
                let summary = db::import_roster(&pool, &path).await?;
                println!(
                    "Merged {}: {} new, {} updated.",
                    path.display(),
                    summary.inserted,
                    summary.updated
                );
            }
        }
        Commands::Sheet {
            out,
            cohorts,
            config,
        } => {
            let config =
                ScoringConfig::load(config.as_deref()).context("failed to load scoring config")?;
            let pool = connect(&settings).await?;
            let cadets = db::fetch_cadets(&pool, &cohorts).await?;

            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            roster::write_score_sheet(file, &config.metrics, &cadets)?;
            info!(cadets = cadets.len(), ?cohorts, "score sheet written");
            println!("Score sheet for {} cadets written to {}.", cadets.len(), out.display());
        }
        Commands::Report {
            scores,
            config,
            out,
            format,
            title,
        } => {
            let (config, ranked) = load_ranked(&scores, config.as_deref())?;
            let today = chrono::Local::now().date_naive();
            let report = report::assemble(&title, today, &ranked, &config);
            let document = report::render(&report, format)?;

            std::fs::write(&out, document)
                .with_context(|| format!("failed to write report {}", out.display()))?;
            info!(cadets = report.cadets.len(), out = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
        Commands::Rank {
            scores,
            config,
            metric,
            limit,
        } => {
            let (config, ranked) = load_ranked(&scores, config.as_deref())?;
            let target = RankTarget::parse(&config.metrics, &metric)?;
            let board = ranking::leaderboard(&ranked, target);

            if board.is_empty() {
                println!("No ranked cadets for {}.", target.name(&config.metrics));
                return Ok(());
            }

            for (pool, members) in board {
                println!(
                    "{} / {} ({} ranked):",
                    pool,
                    target.name(&config.metrics),
                    members.len()
                );
                for entry in members.iter().take(limit) {
                    let cadet = &entry.cadet;
                    let standing = match target {
                        RankTarget::Metric(id) => entry.standing(id),
                        RankTarget::Overall => entry.overall,
                    };
                    let value = match target {
                        RankTarget::Metric(id) => cadet
                            .score(id)
                            .and_then(|score| score.points())
                            .map(|points| points.to_string())
                            .unwrap_or_default(),
                        RankTarget::Overall => {
                            format!("{:.1}%", cadet.totals().percent * 100.0)
                        }
                    };
                    println!(
                        "- {} ({}) {} {}",
                        cadet.identity().display_name(),
                        cadet.identity().a_number,
                        value,
                        standing.label()
                    );
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_roster_help_says_flight_is_kept() {
        let command = Cli::command();
        let import = command
            .find_subcommand("import-roster")
            .expect("import-roster registered");
        let help = import
            .get_long_about()
            .map(|text| text.to_string())
            .unwrap_or_default();
        assert!(help.contains("keep the flight"), "{help}");
    }
}
