/// Summarize, append to, or export the water consumption readings
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use water_tracker_service::config::{Config, DataSource};
use water_tracker_service::services::DashboardService;
use water_tracker_service::store::ReadingStore;
use water_tracker_service::summary::SummaryOutcome;

#[derive(Parser)]
#[command(name = "water-report")]
#[command(about = "Report on metered water consumption readings", long_about = None)]
struct Cli {
    /// Read a local CSV file instead of the configured data source
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print total, maximum, minimum and mean consumption
    Summary,
    /// Append one reading
    Add {
        /// Reading date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Meter volume in cubic meters
        #[arg(long)]
        volume: f64,
    },
    /// Write all readings as CSV, sorted by date
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so exports on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match cli.file {
        Some(path) => DataSource::File { path },
        None => Config::from_env()?.data_source,
    };
    let store = ReadingStore::from_source(&source);
    info!("Using {}", store.describe());
    let service = DashboardService::new(store);

    match cli.command {
        Command::Summary => {
            let dashboard = service.load_dashboard().await?;
            match dashboard.outcome {
                SummaryOutcome::Empty => println!("No readings yet."),
                SummaryOutcome::Ok { summary, .. } => {
                    println!(
                        "Readings: {} ({} to {})",
                        summary.reading_count, summary.first_date, summary.last_date
                    );
                    println!("Total consumption:   {:.3} m³", summary.total);
                    println!("Maximum consumption: {:.3} m³", summary.max);
                    println!("Minimum consumption: {:.3} m³", summary.min);
                    println!("Mean consumption:    {:.3} m³", summary.mean);
                }
            }
            if dashboard.dropped > 0 {
                println!(
                    "Skipped {} records missing a date or volume",
                    dashboard.dropped
                );
            }
        }
        Command::Add { date, volume } => {
            if !volume.is_finite() || volume < 0.0 {
                return Err("--volume must be a non-negative number".into());
            }
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let reading = service.add_reading(date, volume).await?;
            println!("Recorded {} m³ for {}", reading.volume, reading.date);
        }
        Command::Export { output } => {
            let csv = service.export_csv().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
    }

    Ok(())
}
