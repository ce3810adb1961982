pub mod assemble;
pub mod cohort;
pub mod derive;
pub mod no_sales;
pub mod quantile;
pub mod scoring;
pub mod types;

use tracing::{debug, info};

use crate::config::SegmentationSettings;
use crate::segmentation::cohort::{sales_cohorts, split_by_sales};
use crate::segmentation::derive::derive_profitability;
use crate::segmentation::no_sales::score_no_sales;
use crate::segmentation::scoring::score_cohort;
use crate::segmentation::types::{CohortResult, ItemRecord, Segmentation};

/// Derives profitability, splits by sales activity and scores every cohort.
/// Each cohort is scored in isolation; results are collected in cohort order.
pub fn segment(items: Vec<ItemRecord>, settings: &SegmentationSettings) -> Segmentation {
    let derived = derive_profitability(items);
    let split = split_by_sales(derived);
    debug!(
        with_sales = split.with_sales.len(),
        without_sales = split.without_sales.len(),
        "split records by sales activity"
    );

    let cohorts = sales_cohorts(&split.with_sales, settings.department_grouping)
        .iter()
        .filter_map(|cohort| score_cohort(cohort, &split.with_sales, settings.threshold_scope))
        .collect::<Vec<CohortResult>>();
    let no_sales = score_no_sales(split.without_sales, settings);

    let segmentation = Segmentation { cohorts, no_sales };
    info!(
        cohorts = segmentation.cohorts.len(),
        sales_items = segmentation.sales_record_count(),
        no_sales_items = segmentation.no_sales.len(),
        "segmentation complete"
    );
    segmentation
}
