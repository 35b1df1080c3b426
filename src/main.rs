pub mod types;
pub mod config;
pub mod geodesy;
pub mod coverage;
pub mod data;
pub mod wrap;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load balloon snapshots and places once and print coverage
    Report {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Hour offset to summarize (0 = most recent)
        #[arg(long, default_value_t = 0)]
        hour: u32,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load the data and serve it to the map front end
    Serve {
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Report { config, hour, json } => {
            let app_config = config::AppConfig::load(config.as_deref())?;
            let dataset = data::load_data(&app_config).await?;
            let summary = dataset.coverage(&app_config.coverage, *hour);

            if *json {
                let out = serde_json::json!({
                    "hour": hour,
                    "summary": summary,
                    "hours": dataset.reports(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for report in dataset.reports() {
                    match &report.error {
                        None => println!("  {:>2}h  {:>5} balloons", report.hour, report.count),
                        Some(e) => println!("  {:>2}h  failed: {}", report.hour, e),
                    }
                }
                println!("{} ({} places loaded)", types::hour_label(*hour), dataset.places.len());
                println!("  Balloons:         {}", summary.total_positions);
                println!("  Over populated:   {} ({:.1}%)", summary.positions_covered, summary.coverage_percentage);
                println!("  Cities covered:   {}", summary.cities_covered);
                println!("  Population (M):   {}", summary.population_covered_millions);
            }
        }
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load(config.as_deref())?;
            let client = data::http_client()?;
            let dataset = data::load_data_with(&client, &app_config).await;

            server::start_server(app_config, client, dataset).await?;
        }
    }

    Ok(())
}
