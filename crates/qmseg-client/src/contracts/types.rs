use serde::Serialize;

use crate::sink::WriteCounts;

#[derive(Debug, Clone, Serialize)]
pub struct RunData {
    pub dry_run: bool,
    pub execution_id: i64,
    pub timestamp: String,
    pub script: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    pub threshold_scope: String,
    pub department_grouping: bool,
    pub summary: RunSummary,
    pub cohorts: Vec<CohortSummary>,
    pub no_sales: NoSalesSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<WrittenSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub items_read: usize,
    pub sales_items: usize,
    pub no_sales_items: usize,
    pub cohorts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortSummary {
    #[serde(rename = "type")]
    pub type_label: String,
    pub records: usize,
    pub quantiles: Vec<QuantileEntry>,
    pub score_counts: Vec<ScoreCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileEntry {
    pub quantile: f64,
    pub quantity: f64,
    pub monetary_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreCount {
    pub score: u8,
    pub items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoSalesSummary {
    pub discontinued: usize,
    pub stale: usize,
    pub recent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrittenSummary {
    pub datastore: String,
    pub segmentation_table: String,
    pub quantiles_table: String,
    pub log_table: String,
    pub counts: WriteCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunsListData {
    pub datastore: String,
    pub log_table: String,
    pub runs: Vec<RunEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEntry {
    pub execution_id: i64,
    pub date: String,
    pub event: String,
    pub segmentation_rows: i64,
    pub quantile_rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuantilesData {
    pub execution_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub quantiles_table: String,
    pub rows: Vec<PersistedQuantile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedQuantile {
    #[serde(rename = "type")]
    pub type_label: String,
    pub quantile: f64,
    pub quantity: f64,
    pub monetary_value: f64,
}
