use serde::Serialize;

use crate::segmentation::types::{
    CohortKey, QuantileLevel, RunContext, ScoredNoSalesRecord, ScoredSalesRecord, Segmentation,
};

/// Prefix of the audit note; the execution id follows it.
pub const EXECUTION_NOTE_PREFIX: &str = "Execution id: ";

/// Row of the segmentation table. Sales and no-sales items share this shape;
/// no-sales rows carry no quantity or monetary value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationRow {
    pub execution_id: i64,
    pub timestamp: String,
    pub item_no: String,
    pub quantity: Option<f64>,
    pub monetary_value: Option<f64>,
    pub score: i64,
    #[serde(rename = "type")]
    pub type_label: String,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileRow {
    pub execution_id: i64,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub type_label: String,
    pub quantile: f64,
    pub quantity: f64,
    pub monetary_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub date: String,
    pub event: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledRun {
    pub sales_rows: Vec<SegmentationRow>,
    pub no_sales_rows: Vec<SegmentationRow>,
    pub quantile_rows: Vec<QuantileRow>,
    pub audit: AuditRecord,
}

pub fn type_label(department: Option<&str>, department_grouping: bool, type_tag: &str) -> String {
    match department {
        Some(name) if department_grouping => format!("{name}/{type_tag}"),
        _ => type_tag.to_string(),
    }
}

fn cohort_label(key: &CohortKey, department_grouping: bool, type_tag: &str) -> String {
    type_label(key.department(), department_grouping, type_tag)
}

pub fn assemble(
    segmentation: &Segmentation,
    context: &RunContext,
    department_grouping: bool,
) -> AssembledRun {
    let timestamp = context.timestamp_text();

    let mut sales_rows = Vec::with_capacity(segmentation.sales_record_count());
    let mut quantile_rows = Vec::with_capacity(segmentation.cohorts.len() * 3);
    for cohort in &segmentation.cohorts {
        let label = cohort_label(&cohort.key, department_grouping, &context.type_tag);
        sales_rows.extend(
            cohort
                .records
                .iter()
                .map(|record| sales_row(record, context, &timestamp, &label)),
        );
        quantile_rows.extend(QuantileLevel::ALL.iter().map(|level| QuantileRow {
            execution_id: context.execution_id,
            timestamp: timestamp.clone(),
            type_label: label.clone(),
            quantile: level.fraction(),
            quantity: cohort.quantiles.quantity.at(*level),
            monetary_value: cohort.quantiles.monetary_value.at(*level),
        }));
    }

    let no_sales_rows = segmentation
        .no_sales
        .iter()
        .map(|record| no_sales_row(record, context, &timestamp, department_grouping))
        .collect::<Vec<SegmentationRow>>();

    AssembledRun {
        sales_rows,
        no_sales_rows,
        quantile_rows,
        audit: audit_record(context),
    }
}

pub fn audit_record(context: &RunContext) -> AuditRecord {
    AuditRecord {
        date: context.timestamp_text(),
        event: context.script_name.clone(),
        note: format!("{EXECUTION_NOTE_PREFIX}{}", context.execution_id),
    }
}

fn sales_row(
    record: &ScoredSalesRecord,
    context: &RunContext,
    timestamp: &str,
    label: &str,
) -> SegmentationRow {
    SegmentationRow {
        execution_id: context.execution_id,
        timestamp: timestamp.to_string(),
        item_no: record.item.item_no.clone(),
        quantity: Some(record.item.quantity),
        monetary_value: Some(record.monetary_value),
        score: i64::from(record.score),
        type_label: label.to_string(),
        script: context.script_name.clone(),
    }
}

fn no_sales_row(
    record: &ScoredNoSalesRecord,
    context: &RunContext,
    timestamp: &str,
    department_grouping: bool,
) -> SegmentationRow {
    let department = record
        .item
        .department
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    SegmentationRow {
        execution_id: context.execution_id,
        timestamp: timestamp.to_string(),
        item_no: record.item.item_no.clone(),
        quantity: None,
        monetary_value: None,
        score: i64::from(record.score),
        type_label: type_label(department, department_grouping, &context.type_tag),
        script: context.script_name.clone(),
    }
}
