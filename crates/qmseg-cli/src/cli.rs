use std::path::PathBuf;

use clap::{Parser, Subcommand};
use qmseg_client::config::ThresholdScope;

pub fn parse_threshold_scope(value: &str) -> Result<ThresholdScope, String> {
    ThresholdScope::parse(value)
        .ok_or_else(|| "threshold scope must be one of: per_cohort, global_apply".to_string())
}

pub fn parse_execution_id(value: &str) -> Result<i64, String> {
    match value.trim().parse::<i64>() {
        Ok(parsed) if parsed >= 0 => Ok(parsed),
        _ => Err("execution id must be a non-negative integer (Unix seconds)".to_string()),
    }
}

pub fn parse_limit(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err("limit must be a positive integer".to_string()),
    }
}

/// Extended help shown after `qmseg run --help`.
pub const RUN_AFTER_HELP: &str = "\
How a run works:
  1. Fetch tea items from the configured source (SQLite warehouse or CSV/JSON export).
  2. Derive MonetaryValue = Amount - Cost for every item.
  3. Split items with sales (Count != 0) from items without sales.
  4. Per department cohort, compute p25/p50/p75 of Quantity and MonetaryValue and
     score each item as QuantityQuartile * 10 + MonetaryQuartile (11 best, 44 worst).
  5. Score items without sales: 0 discontinued, 1 older than stale_days, 2 otherwise.
  6. Append scores, quantiles and one audit record to the datastore.

Configuration (qmseg.toml in the home directory, or --config <file>):
  [source]
  kind = \"warehouse\"            # or \"file\"
  path = \"/data/warehouse.db\"

  [source.filter]
  category_code = \"TE\"
  window_months = 12

  [segmentation]
  department_grouping = true
  threshold_scope = \"per_cohort\" # or \"global_apply\"
  stale_days = 90

  [destination]
  segmentation_table = \"seg_item_segmentation\"
  quantiles_table = \"seg_item_segmentation_quantiles\"
  log_table = \"dbo_log\"

  Every setting can be overridden with QMSEG_<SECTION>__<KEY>, for example
  QMSEG_SEGMENTATION__STALE_DAYS=120.

Export columns for file sources:
  ItemNo,Status,Quantity,Amount,Cost,Days,Count[,Department]

What to do next:
  1. Run `qmseg run --dry-run` and review the cohort summary.
  2. Run `qmseg run` to append the results.
  3. Run `qmseg runs list` to confirm the run was logged.
";

#[derive(Debug, Parser)]
#[command(
    name = "qmseg",
    version,
    about = "quantity/monetary segmentation of tea items",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Directory holding the datastore and default config (defaults to QMSEG_HOME or ~/.qmseg)
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
    /// Configuration file to load instead of <home>/qmseg.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Score every item and append the results to the datastore
    #[command(after_long_help = RUN_AFTER_HELP)]
    Run {
        /// Compute and report without writing to the datastore
        #[arg(long)]
        dry_run: bool,
        /// Read items from a CSV or JSON export instead of the configured source
        #[arg(long, value_name = "PATH")]
        source_file: Option<PathBuf>,
        /// Override the configured threshold scope (per_cohort or global_apply)
        #[arg(long, value_parser = parse_threshold_scope)]
        threshold_scope: Option<ThresholdScope>,
        /// Score all sales items as one cohort instead of per department
        #[arg(long)]
        no_department_grouping: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Inspect past runs recorded in the audit log
    #[command(arg_required_else_help = true)]
    Runs {
        #[command(subcommand)]
        command: RunsCommand,
    },
    /// Show the persisted quantile breakpoints of one run
    Quantiles {
        /// Execution id of the run (see `qmseg runs list`)
        #[arg(value_parser = parse_execution_id)]
        execution_id: i64,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RunsCommand {
    /// List recent runs, newest first
    List {
        /// Maximum number of runs to show
        #[arg(long, value_parser = parse_limit)]
        limit: Option<usize>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
