mod pipeline;

use clap::{Parser, Subcommand};
use reportsync_core::{AppConfig, ExportMode, ReportDefinition, ReportKind};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reportsync-cli")]
#[command(about = "Sync Zoho Analytics reports into MySQL tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one report pipeline until its table has been replaced
    Run {
        /// `analytics` or `best-selling`
        report: ReportKind,
    },
    /// List the configured reports and their schedule
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = reportsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // WARN and ERROR to stderr, everything else to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr.with_max_level(Level::WARN).or_else(std::io::stdout))
        .init();

    match cli.command {
        Commands::Run { report } => {
            let missing = config.missing_settings();
            if !missing.is_empty() {
                tracing::warn!(
                    missing = %missing.join(", "),
                    "settings are empty; affected stages will keep failing and retrying"
                );
            }
            let summary = pipeline::run_report(report, &config).await?;
            tracing::info!(
                report = %summary.report,
                table = %summary.table,
                rows_loaded = summary.rows_loaded,
                "run complete"
            );
        }
        Commands::List => print_reports(&config),
    }

    Ok(())
}

fn print_reports(config: &AppConfig) {
    for kind in ReportKind::ALL {
        let definition = ReportDefinition::for_kind(kind, config);
        let at = match kind {
            ReportKind::Analytics => config.schedule.analytics_at,
            ReportKind::BestSelling => config.schedule.best_selling_at,
        };
        let export = match definition.export_mode {
            ExportMode::Sync => "sync",
            ExportMode::Job => "export job",
        };
        let limit = definition
            .row_limit
            .map_or_else(|| "all".to_string(), |n| n.to_string());
        println!(
            "{:<14} daily at {}  table={}  export={export}  rows={limit}  retry={}s  snapshot={}",
            kind.as_str(),
            at.format("%H:%M"),
            definition.table_name,
            definition.retry_delay.as_secs(),
            definition.snapshot_path.display(),
        );
    }
}

#[cfg(test)]
mod tests;
