use std::path::Path;

use anyhow::Context;
use clap::Parser;
use insider_ingestor::cache::csv_format::from_csv_bytes;
use insider_ingestor::cli::commands::{Cli, Commands};
use insider_ingestor::cli::params::symbols_from_args;
use insider_ingestor::io::{CsvSink, DataSink};
use insider_ingestor::merge::merge_datasets;
use insider_ingestor::models::dataset::Dataset;
use insider_ingestor::pipeline::{INSIDERS_OUTPUT, MERGED_OUTPUT, sink_for};
use insider_ingestor::requests::RunReport;
use insider_ingestor::{Credentials, Ingestor, IngestorConfig};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = IngestorConfig::from_file_or_default(&cli.config)?;
    config.validate()?;

    match cli.command {
        Commands::Insiders => {
            let ingestor = build_ingestor(config)?;
            let insiders = ingestor.live_insiders().await?;
            let path = ingestor.persist(INSIDERS_OUTPUT, &insiders).await?;
            println!("{}", path.display());
            eprintln!("SUMMARY: {} rows", insiders.len());
        }

        Commands::Prices {
            symbols,
            symbols_file,
        } => {
            let symbols = symbols_from_args(symbols.as_deref(), symbols_file.as_deref())?;
            let ingestor = build_ingestor(config)?;
            let report = ingestor.daily_prices(symbols).await?;
            print_report(&report);
        }

        Commands::Run => {
            let ingestor = build_ingestor(config)?;
            let report = ingestor.run().await?;
            print_report(&report.prices);
            println!("{}", report.insiders_output.display());
            println!("{}", report.merged_output.display());
            eprintln!(
                "MERGED: {} insider rows -> {} merged rows",
                report.insider_rows, report.merged_rows
            );
        }

        Commands::Merge {
            insiders,
            prices,
            out,
        } => {
            let insiders = read_dataset(&insiders)?;
            let prices = read_dataset(&prices)?;
            let merged = merge_datasets(&insiders, &prices)?;
            let path = match out {
                Some(out) => {
                    let dir = out.parent().unwrap_or_else(|| Path::new("."));
                    let stem = out
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .context("--out must name a file")?;
                    CsvSink::new(dir).write(stem, &merged).await?
                }
                None => sink_for(&config.output).write(MERGED_OUTPUT, &merged).await?,
            };
            println!("{}", path.display());
            eprintln!("SUMMARY: {} rows", merged.len());
        }
    }
    Ok(())
}

/// Builds the ingestor and cancels a windowed run between windows on Ctrl-C.
fn build_ingestor(config: IngestorConfig) -> anyhow::Result<Ingestor> {
    let credentials = Credentials::from_env(&config);
    let ingestor = Ingestor::new(config, credentials)?;
    let cancel = ingestor.cancel_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current window");
            cancel.cancel();
        }
    });
    Ok(ingestor)
}

fn read_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(from_csv_bytes(&bytes, path)?)
}

fn print_report(report: &RunReport) {
    for (value, error) in &report.skipped {
        eprintln!("ERROR: {} - {}", value, error);
    }
    if let Some(path) = &report.output {
        println!("{}", path.display());
    }
    // Summary goes to stderr so stdout stays a list of paths.
    eprintln!(
        "SUMMARY: {} succeeded, {} skipped",
        report.succeeded,
        report.skipped.len()
    );
}
