use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::ClientResult;
use crate::commands::common::load_settings;
use crate::config::{RunConfig, SourceKind, ThresholdScope};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    CohortSummary, NoSalesSummary, QuantileEntry, RunData, RunSummary, ScoreCount, WrittenSummary,
};
use crate::segmentation::assemble::{assemble, type_label};
use crate::segmentation::no_sales::{DISCONTINUED_SCORE, STALE_SCORE};
use crate::segmentation::segment;
use crate::segmentation::types::{CohortResult, QuantileLevel, RunContext, Segmentation};
use crate::setup::ensure_initialized_at;
use crate::sink::{DatastoreSink, write_run};
use crate::source::fetcher_for;

#[derive(Debug, Default)]
pub struct RunOptions<'a> {
    pub config_path: Option<&'a Path>,
    pub home_override: Option<&'a Path>,
    /// Reads items from this CSV/JSON export instead of the configured source.
    pub source_file: Option<&'a Path>,
    pub threshold_scope: Option<ThresholdScope>,
    pub department_grouping: Option<bool>,
    pub dry_run: bool,
    /// Run start; defaults to the current time.
    pub started_at: Option<DateTime<Utc>>,
}

pub fn run(config_path: Option<&Path>, dry_run: bool) -> ClientResult<SuccessEnvelope> {
    run_with_options(RunOptions {
        config_path,
        dry_run,
        ..RunOptions::default()
    })
}

#[doc(hidden)]
pub fn run_with_options(options: RunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let (home, loaded) = load_settings(options.config_path, options.home_override)?;
    let config = apply_overrides(loaded.config, &options);
    let settings = &config.segmentation;

    let context = match options.started_at {
        Some(started_at) => RunContext::new(started_at, &settings.script_name, &settings.type_tag),
        None => RunContext::start(&settings.script_name, &settings.type_tag),
    };

    // Open the destination first so a bad datastore fails before the fetch.
    let datastore = if options.dry_run {
        None
    } else {
        Some(ensure_initialized_at(&home, &config.destination)?)
    };

    let fetcher = fetcher_for(&config.source, &settings.discontinued_marker)?;
    info!(
        execution_id = context.execution_id,
        source = %fetcher.describe(),
        dry_run = options.dry_run,
        "run started"
    );
    let items = fetcher.fetch(context.timestamp)?;
    let items_read = items.len();

    let segmentation = segment(items, settings);
    let assembled = assemble(&segmentation, &context, settings.department_grouping);

    let written = match datastore {
        Some(datastore) => {
            let mut sink = DatastoreSink::new(&datastore.connection, &datastore.db_path);
            let counts = write_run(&mut sink, &config.destination, &assembled)?;
            Some(WrittenSummary {
                datastore: datastore.db_path.display().to_string(),
                segmentation_table: config.destination.segmentation_table.clone(),
                quantiles_table: config.destination.quantiles_table.clone(),
                log_table: config.destination.log_table.clone(),
                counts,
            })
        }
        None => None,
    };

    let data = RunData {
        dry_run: options.dry_run,
        execution_id: context.execution_id,
        timestamp: context.timestamp_text(),
        script: context.script_name.clone(),
        source: fetcher.describe(),
        config_path: loaded.path.map(|path| path.display().to_string()),
        threshold_scope: settings.threshold_scope.as_str().to_string(),
        department_grouping: settings.department_grouping,
        summary: RunSummary {
            items_read,
            sales_items: segmentation.sales_record_count(),
            no_sales_items: segmentation.no_sales.len(),
            cohorts: segmentation.cohorts.len(),
        },
        cohorts: cohort_summaries(&segmentation, &context, settings.department_grouping),
        no_sales: no_sales_summary(&segmentation),
        written,
    };

    success("run", data)
}

fn apply_overrides(mut config: RunConfig, options: &RunOptions<'_>) -> RunConfig {
    if let Some(path) = options.source_file {
        config.source.kind = SourceKind::File;
        config.source.path = Some(PathBuf::from(path));
    }
    if let Some(scope) = options.threshold_scope {
        config.segmentation.threshold_scope = scope;
    }
    if let Some(grouping) = options.department_grouping {
        config.segmentation.department_grouping = grouping;
    }
    config
}

fn cohort_summaries(
    segmentation: &Segmentation,
    context: &RunContext,
    department_grouping: bool,
) -> Vec<CohortSummary> {
    segmentation
        .cohorts
        .iter()
        .map(|cohort| CohortSummary {
            type_label: type_label(cohort.key.department(), department_grouping, &context.type_tag),
            records: cohort.records.len(),
            quantiles: QuantileLevel::ALL
                .iter()
                .map(|level| QuantileEntry {
                    quantile: level.fraction(),
                    quantity: cohort.quantiles.quantity.at(*level),
                    monetary_value: cohort.quantiles.monetary_value.at(*level),
                })
                .collect(),
            score_counts: score_counts(cohort),
        })
        .collect()
}

/// Item counts per composite score, best score (11) first.
fn score_counts(cohort: &CohortResult) -> Vec<ScoreCount> {
    let mut counts = BTreeMap::<u8, usize>::new();
    for record in &cohort.records {
        *counts.entry(record.score).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(score, items)| ScoreCount { score, items })
        .collect()
}

fn no_sales_summary(segmentation: &Segmentation) -> NoSalesSummary {
    let mut summary = NoSalesSummary::default();
    for record in &segmentation.no_sales {
        match record.score {
            DISCONTINUED_SCORE => summary.discontinued += 1,
            STALE_SCORE => summary.stale += 1,
            _ => summary.recent += 1,
        }
    }
    summary
}
