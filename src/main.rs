use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod alerts;
mod db;
mod ingest;
mod models;
mod normalize;
mod report;
mod risk;

use models::StudentMetrics;

#[derive(Parser)]
#[command(name = "roster-risk")]
#[command(about = "Academic risk scoring and insights for student rosters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a realistic sample roster
    Seed,
    /// Import a roster CSV, scoring every student on the way in
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Recompute every stored student's decision from its metrics
    Analyze,
    /// List at-risk students, highest risk first
    AtRisk {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Compose and record risk alerts for at-risk students
    SendAlerts {
        #[arg(long)]
        advisor_email: Option<String>,
        /// Print the composed alert bodies
        #[arg(long)]
        show_bodies: bool,
    },
    /// Compose and record progress reports for every student
    SendReports,
    /// Print dashboard statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

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
            println!("Seed roster inserted and scored.");
        }
        Commands::Import { csv } => {
            let (stored, skipped) = import_roster(&pool, &csv).await?;
            println!(
                "Stored {stored} students from {} ({skipped} rows skipped).",
                csv.display()
            );
        }
        Commands::Analyze => {
            let recomputed = reanalyze_all(&pool).await?;
            println!("Recomputed decisions for {recomputed} students.");
        }
        Commands::AtRisk { limit } => {
            let students = db::fetch_at_risk(&pool).await?;
            if students.is_empty() {
                println!("No students at risk.");
                return Ok(());
            }
            println!("At-risk students:");
            for student in students.iter().take(limit) {
                println!(
                    "- {} ({}) {} risk, performance {:.1}%, attendance {:.1}%",
                    student.name,
                    student.student_id,
                    student.risk_level,
                    student.overall_performance,
                    student.attendance
                );
            }
        }
        Commands::Report { out } => {
            let students = db::fetch_students(&pool).await?;
            let report = report::build_report(&students);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::SendAlerts {
            advisor_email,
            show_bodies,
        } => {
            let outcomes =
                alerts::dispatch_risk_alerts(&pool, advisor_email.as_deref()).await?;
            if outcomes.is_empty() {
                println!("No at-risk students found.");
                return Ok(());
            }
            for outcome in &outcomes {
                println!(
                    "- {} ({}): {}",
                    outcome.student_name, outcome.student_id, outcome.note
                );
                if show_bodies {
                    if let Some(body) = &outcome.body {
                        println!("{body}");
                    }
                }
            }
            let sent = outcomes.iter().filter(|o| o.sent).count();
            println!("Processed {} at-risk students, {sent} alerts recorded.", outcomes.len());
        }
        Commands::SendReports => {
            let outcomes = alerts::dispatch_progress_reports(&pool).await?;
            println!("Recorded progress reports for {} students.", outcomes.len());
        }
        Commands::Stats => {
            let students = db::fetch_students(&pool).await?;
            let stats = report::dashboard_stats(&students);
            println!("Total students: {}", stats.total_students);
            println!(
                "At risk: {} ({:.1}%)",
                stats.at_risk_students, stats.at_risk_percentage
            );
            println!("High risk: {}", stats.high_risk_students);
            println!("Medium risk: {}", stats.medium_risk_students);
            println!(
                "Performance: {} excellent / {} good / {} average / {} poor",
                stats.distribution.excellent,
                stats.distribution.good,
                stats.distribution.average,
                stats.distribution.poor
            );
        }
    }

    Ok(())
}

/// Roster import pipeline: normalize each raw row, classify the snapshot,
/// persist student and decision together. A row that cannot be normalized
/// is skipped without aborting the batch.
async fn import_roster(pool: &PgPool, csv: &std::path::Path) -> anyhow::Result<(usize, usize)> {
    let rows = ingest::read_roster(csv)?;
    let mut stored = 0usize;
    let mut skipped = 0usize;

    for row in &rows {
        let (metrics, grades) = match normalize::normalize(&row.raw) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("Skipping {}: {err}", row.student_id);
                skipped += 1;
                continue;
            }
        };
        let decision = risk::classify(&metrics);
        db::upsert_student(
            pool,
            &row.student_id,
            &row.name,
            row.email.as_deref(),
            &metrics,
            normalize::final_grade(&row.raw),
            &grades,
            &decision,
        )
        .await?;
        stored += 1;
    }

    Ok((stored, skipped))
}

/// Rebuilds each stored student's canonical metrics and replaces the
/// attached decision wholesale.
async fn reanalyze_all(pool: &PgPool) -> anyhow::Result<usize> {
    let students = db::fetch_students(pool).await?;

    for student in &students {
        let metrics = StudentMetrics {
            overall_performance: normalize::overall_performance(
                &student.grades,
                student.final_grade,
            ),
            attendance: student.attendance,
            study_hours: student.study_hours,
        };
        let decision = risk::classify(&metrics);
        db::store_decision(pool, student.id, &decision).await?;
    }

    Ok(students.len())
}
