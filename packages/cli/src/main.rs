#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front-end for MDL trends.
//!
//! Every subcommand prints one pretty JSON document on stdout. Logs and
//! progress bars go to stderr (via
//! [`mdl_trends_cli_utils::init_logger`]).

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use mdl_trends_analytics::drivers::breakdown;
use mdl_trends_analytics_models::{
    DeltaMetric, DistrictBreakdown, DriverBreakdown, EntityLevel, TrendMode,
};
use mdl_trends_cli_utils::{IndicatifProgress, MultiProgress};
use mdl_trends_dashboard::config::SourceConfig;
use mdl_trends_dashboard::{DashboardConfig, DashboardError, Session};
use mdl_trends_records_models::{PeriodKey, Selection};
use serde::Serialize;

/// Explore monthly MDL pending-action reports.
#[derive(Parser)]
#[command(name = "mdl_trends")]
#[command(about = "Explore monthly MDL pending-action reports")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read records over HTTP from this base URL.
    #[arg(long, global = true, conflicts_with = "data_dir")]
    data_url: Option<String>,

    /// Read records from this local directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List published periods.
    Periods,

    /// Compare two periods.
    Summary {
        #[command(flatten)]
        range: RangeArgs,

        /// Rank movers by absolute or percentage change.
        #[arg(long, default_value = "absolute", value_parser = parse_label::<DeltaMetric>)]
        metric: DeltaMetric,
    },

    /// Attribute the pending change between two periods.
    Drivers {
        #[command(flatten)]
        range: RangeArgs,

        /// Contributors listed individually per level.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Judge activity, most active groups and drivers.
    Insights {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Groups of one district in the end period.
    District {
        /// District abbreviation (e.g. "NJ").
        district: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Totals and dominant groups for every period.
    Trends {
        /// Measure to chart.
        #[arg(long, default_value = "pending", value_parser = parse_label::<TrendMode>)]
        mode: TrendMode,
    },

    /// National forecast and momentum rankings.
    Forecast,

    /// New and removed entities in the latest period.
    Latest,
}

/// Period selection shared by comparison subcommands.
#[derive(clap::Args)]
struct RangeArgs {
    /// Prior period (defaults to the one before the latest).
    #[arg(long)]
    start: Option<String>,

    /// Current period (defaults to the latest).
    #[arg(long)]
    end: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PeriodListing {
    period: PeriodKey,
    label: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DriversOutput {
    start: PeriodKey,
    end: PeriodKey,
    net_change: i64,
    districts: DriverBreakdown,
    groups: DriverBreakdown,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DistrictOutput {
    name: String,
    #[serde(flatten)]
    breakdown: DistrictBreakdown,
}

impl Cli {
    fn dashboard_config(&self) -> Result<DashboardConfig, DashboardError> {
        let config = match &self.config {
            Some(path) => DashboardConfig::load(path)?,
            None => DashboardConfig::default(),
        };
        let mut config = config.with_env_overrides();

        if let Some(base_url) = &self.data_url {
            config.source = match config.source {
                SourceConfig::Http { max_retries, .. } => SourceConfig::Http {
                    base_url: base_url.clone(),
                    max_retries,
                },
                SourceConfig::Directory { .. } => SourceConfig::http(base_url.clone()),
            };
        }
        if let Some(directory) = &self.data_dir {
            config.source = SourceConfig::Directory {
                directory: directory.clone(),
            };
        }

        Ok(config)
    }
}

fn parse_label<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("unrecognized value '{value}'"))
}

fn apply_range(session: &Session, range: &RangeArgs) -> Result<Selection, DashboardError> {
    let current = session.selection();
    let start = range.start.as_deref().map_or(current.start, PeriodKey::new);
    let end = range.end.as_deref().map_or(current.end, PeriodKey::new);
    session.select(&start, &end)
}

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = mdl_trends_cli_utils::init_logger();
    let cli = Cli::parse();

    let session = Session::connect(cli.dashboard_config()?)
        .await?
        .with_progress(IndicatifProgress::periods_bar(
            &multi,
            "Loading report history",
        ));

    run(&session, &cli.command, &multi).await
}

async fn run(
    session: &Session,
    command: &Commands,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Periods => {
            let periods: Vec<PeriodListing> = session
                .catalog()
                .periods()
                .iter()
                .map(|period| PeriodListing {
                    label: period.label(),
                    period: period.clone(),
                })
                .collect();
            print_json(&periods)?;
        }
        Commands::Summary { range, metric } => {
            apply_range(session, range)?;
            session.set_metric(EntityLevel::District, *metric);
            session.set_metric(EntityLevel::Group, *metric);
            match session.recompute().await {
                Some(view) => print_json(&view)?,
                None => log::warn!("Selection changed while computing; nothing to show"),
            }
        }
        Commands::Drivers { range, top } => {
            let selection = apply_range(session, range)?;
            let view = session.recompute().await;
            match view.and_then(|view| view.drivers) {
                Some(drivers) => print_json(&DriversOutput {
                    districts: breakdown(&drivers.districts, *top, drivers.net_change),
                    groups: breakdown(&drivers.groups, *top, drivers.net_change),
                    start: drivers.start,
                    end: drivers.end,
                    net_change: drivers.net_change,
                })?,
                None => log::warn!(
                    "No drivers for {} -> {}: pick two different periods",
                    selection.start,
                    selection.end
                ),
            }
        }
        Commands::Insights { range } => {
            apply_range(session, range)?;
            print_json(&session.key_summaries().await)?;
        }
        Commands::District { district, range } => {
            apply_range(session, range)?;
            print_json(&DistrictOutput {
                name: session.districts().display_name(district),
                breakdown: session.district_breakdown(district).await,
            })?;
        }
        Commands::Trends { mode } => {
            print_json(&session.trends_overview(*mode).await)?;
        }
        Commands::Forecast => {
            print_json(&session.forecast_report().await)?;
        }
        Commands::Latest => match session.latest_changes().await {
            Some(summary) => print_json(&summary)?,
            None => log::warn!("At least two published periods are needed"),
        },
    }

    multi.clear()?;
    Ok(())
}
