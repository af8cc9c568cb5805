//! Catalog gap report CLI.
//!
//! Usage:
//!     skugap summary --min 5 --sort count
//!     skugap detail "JEAN FABIO" --format json
//!     skugap --file vendas.xlsx --year 2024 --month dez summary

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{Overrides, ReportConfig};
use skugap_model::RepresentativeSummary;
use skugap_report::compute_gap_report_with;
use skugap_scope::ReportScope;
use skugap_source::{RowSource, Source};
use skugap_view::{
    detail_json, filter_by_unsold_count, find_representative, render_detail,
    render_summary_table, sort_view, summary_table_json, CountRange, SortKey,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "skugap")]
#[command(about = "Report the catalog SKUs each sales representative did not sell")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: skugap.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Local sales extract (.xlsx, .xls, .ods, .csv)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Remote sales extract (raw file or Google Sheets link)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Reporting year
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Reporting month code (e.g. dez)
    #[arg(long, global = true)]
    month: Option<String>,

    /// Representative to include (repeatable; replaces the configured roster)
    #[arg(long = "rep", global = true)]
    reps: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Unsold SKU count per representative
    Summary {
        /// Sort column (count, representative)
        #[arg(short, long, default_value = "count")]
        sort: SortKey,

        /// Sort ascending instead of descending
        #[arg(long)]
        ascending: bool,

        /// Only show representatives with at least this many unsold SKUs
        #[arg(long)]
        min: Option<usize>,

        /// Only show representatives with at most this many unsold SKUs
        #[arg(long)]
        max: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Unsold SKUs of one representative
    Detail {
        /// Representative name
        representative: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skugap=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ReportConfig::load(cli.config.as_deref())?;
    config.apply(Overrides {
        file: cli.file,
        url: cli.url,
        year: cli.year,
        month: cli.month,
        roster: cli.reps,
    })?;
    config.labels.validate().context("Invalid [labels] rules")?;

    let period = config
        .period
        .clone()
        .context("No reporting period configured")?;
    let scope = ReportScope::new(period, config.roster.clone()).context("Invalid report scope")?;

    let source = Source::from_config(&config.source, config.columns.clone())?;
    let records = match source.load().await {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Failed to load sales data from {}: {}", source.describe(), e);
            std::process::exit(1);
        }
    };
    tracing::info!(rows = records.len(), "Loaded sales extract");

    let summaries =
        match compute_gap_report_with(&records, scope.period(), scope.roster(), &config.labels) {
            Ok(summaries) => summaries,
            Err(e) => {
                tracing::warn!(period = %scope.period(), "Empty report");
                eprintln!("Warning: {}", e);
                std::process::exit(2);
            }
        };

    match cli.command {
        Commands::Summary {
            sort,
            ascending,
            min,
            max,
            format,
        } => {
            run_summary(&summaries, &scope, sort, !ascending, CountRange::new(min, max), &format)?;
        }
        Commands::Detail {
            representative,
            format,
        } => {
            run_detail(&summaries, &scope, &representative, &format)?;
        }
    }

    Ok(())
}

fn run_summary(
    summaries: &[RepresentativeSummary],
    scope: &ReportScope,
    sort: SortKey,
    descending: bool,
    range: CountRange,
    format: &str,
) -> Result<()> {
    let mut rows = filter_by_unsold_count(summaries, range);
    sort_view(&mut rows, sort, descending);

    if format == "json" {
        println!("{}", summary_table_json(&rows)?);
        return Ok(());
    }

    let catalog_size = summaries
        .first()
        .map_or(0, |s| s.sold_labels.len() + s.unsold_labels.len());

    println!("Unsold SKUs by representative ({})", scope.period());
    println!("---");
    print!("{}", render_summary_table(&rows));
    println!("---");
    println!(
        "Showing {} of {} representatives, {} SKUs in catalog",
        rows.len(),
        summaries.len(),
        catalog_size
    );

    Ok(())
}

fn run_detail(
    summaries: &[RepresentativeSummary],
    scope: &ReportScope,
    representative: &str,
    format: &str,
) -> Result<()> {
    let Some(summary) = find_representative(summaries, representative) else {
        if let Some(name) = scope.roster().find_ignore_case(representative) {
            bail!(
                "{} has no sales in {}; representatives without sales are not listed",
                name,
                scope.period()
            );
        }
        bail!("Unknown representative '{}'", representative.trim());
    };

    if format == "json" {
        println!("{}", detail_json(summary)?);
    } else {
        print!("{}", render_detail(summary));
    }

    Ok(())
}
