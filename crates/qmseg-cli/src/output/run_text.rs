use std::io;

use serde_json::Value;

use super::format::{
    Align, Column, format_decimal, key_value_rows, render_table_or_blocks, terminal_width,
};

const QUANTILE_COLUMNS: [Column<'static>; 4] = [
    Column {
        name: "Type",
        align: Align::Left,
    },
    Column {
        name: "Quantile",
        align: Align::Right,
    },
    Column {
        name: "Quantity",
        align: Align::Right,
    },
    Column {
        name: "MonetaryValue",
        align: Align::Right,
    },
];

pub fn render_run(data: &Value) -> io::Result<String> {
    let summary = data
        .get("summary")
        .and_then(Value::as_object)
        .ok_or_else(|| io::Error::other("run output requires summary"))?;
    let cohorts = data
        .get("cohorts")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("run output requires cohorts"))?;
    let dry_run = data.get("dry_run").and_then(Value::as_bool).unwrap_or(false);

    let heading = if dry_run {
        "Segmentation dry run (nothing was written):"
    } else {
        "Segmentation run complete:"
    };
    let mut lines = vec![heading.to_string(), String::new()];

    let count = |key: &str| {
        summary
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(0)
            .to_string()
    };
    lines.extend(key_value_rows(
        &[
            ("Execution id", number_text(data, "execution_id")),
            ("Timestamp", string_field(data, "timestamp")),
            ("Script", string_field(data, "script")),
            ("Source", string_field(data, "source")),
            ("Threshold scope", string_field(data, "threshold_scope")),
            (
                "Department grouping",
                yes_no(data.get("department_grouping").and_then(Value::as_bool)),
            ),
            ("Items read", count("items_read")),
            ("With sales", count("sales_items")),
            ("Without sales", count("no_sales_items")),
        ],
        2,
    ));

    lines.push(String::new());
    if cohorts.is_empty() {
        lines.push("No items with sales, so no quantiles were computed.".to_string());
    } else {
        lines.push("Quantiles:".to_string());
        let rows = cohorts
            .iter()
            .flat_map(|cohort| {
                let label = cohort.get("type").and_then(Value::as_str).unwrap_or("");
                quantile_rows(label, cohort.get("quantiles"))
            })
            .collect::<Vec<_>>();
        lines.extend(render_table_or_blocks(
            &QUANTILE_COLUMNS,
            &rows,
            terminal_width(),
            "Quantile",
        ));

        lines.push(String::new());
        lines.push("Scores per cohort:".to_string());
        for cohort in cohorts {
            lines.push(format!(
                "  {} ({} items): {}",
                cohort.get("type").and_then(Value::as_str).unwrap_or(""),
                cohort.get("records").and_then(Value::as_u64).unwrap_or(0),
                score_counts_text(cohort.get("score_counts"))
            ));
        }
    }

    if let Some(no_sales) = data.get("no_sales") {
        let field = |key: &str| no_sales.get(key).and_then(Value::as_u64).unwrap_or(0);
        lines.push(String::new());
        lines.push("Items without sales:".to_string());
        lines.extend(key_value_rows(
            &[
                ("Discontinued (0)", field("discontinued").to_string()),
                ("Stale (1)", field("stale").to_string()),
                ("Recent (2)", field("recent").to_string()),
            ],
            2,
        ));
    }

    lines.push(String::new());
    match data.get("written") {
        Some(written) if !dry_run => {
            let counts = written.get("counts");
            let counted = |key: &str| {
                counts
                    .and_then(|value| value.get(key))
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
            };
            lines.push(format!(
                "Written to {}:",
                written.get("datastore").and_then(Value::as_str).unwrap_or("")
            ));
            let table = |key: &str| {
                written
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            lines.extend(key_value_rows(
                &[
                    (
                        "Scores",
                        format!("{} rows -> {}", counted("segmentation_rows"), table("segmentation_table")),
                    ),
                    (
                        "Quantiles",
                        format!("{} rows -> {}", counted("quantile_rows"), table("quantiles_table")),
                    ),
                    (
                        "Audit log",
                        format!("{} row -> {}", counted("audit_rows"), table("log_table")),
                    ),
                ],
                2,
            ));
        }
        _ => {
            lines.push("Next step:".to_string());
            lines.push("  Run `qmseg run` without --dry-run to append these results.".to_string());
        }
    }

    Ok(lines.join("\n"))
}

pub fn render_runs_list(data: &Value) -> io::Result<String> {
    let runs = data
        .get("runs")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("runs list output requires runs"))?;

    if runs.is_empty() {
        return Ok([
            "No segmentation runs recorded yet.".to_string(),
            String::new(),
            "Record one first:".to_string(),
            "  1. qmseg run --dry-run".to_string(),
            "  2. qmseg run".to_string(),
        ]
        .join("\n"));
    }

    let columns = [
        Column {
            name: "Execution id",
            align: Align::Right,
        },
        Column {
            name: "Date",
            align: Align::Left,
        },
        Column {
            name: "Event",
            align: Align::Left,
        },
        Column {
            name: "Scores",
            align: Align::Right,
        },
        Column {
            name: "Quantiles",
            align: Align::Right,
        },
    ];
    let rows = runs
        .iter()
        .map(|run| {
            vec![
                number_text(run, "execution_id"),
                string_field(run, "date"),
                string_field(run, "event"),
                number_text(run, "segmentation_rows"),
                number_text(run, "quantile_rows"),
            ]
        })
        .collect::<Vec<_>>();

    let mut lines = vec![
        format!(
            "Segmentation runs in {} (newest first):",
            data.get("log_table").and_then(Value::as_str).unwrap_or("")
        ),
        String::new(),
    ];
    lines.extend(render_table_or_blocks(&columns, &rows, terminal_width(), "Run"));
    lines.push(String::new());
    lines.push("Inspect one run: qmseg quantiles <execution-id>".to_string());
    Ok(lines.join("\n"))
}

pub fn render_quantiles(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("quantiles output requires rows"))?;

    let mut lines = vec![format!(
        "Quantiles for execution {}:",
        number_text(data, "execution_id")
    )];
    if let Some(timestamp) = data.get("timestamp").and_then(Value::as_str) {
        lines.push(format!("  Recorded at {timestamp}"));
    }
    lines.push(String::new());

    if rows.is_empty() {
        lines.push("This run scored no items with sales, so no quantiles were stored.".to_string());
        return Ok(lines.join("\n"));
    }

    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                string_field(row, "type"),
                decimal_field(row, "quantile"),
                decimal_field(row, "quantity"),
                decimal_field(row, "monetary_value"),
            ]
        })
        .collect::<Vec<_>>();
    lines.extend(render_table_or_blocks(
        &QUANTILE_COLUMNS,
        &table_rows,
        terminal_width(),
        "Quantile",
    ));
    Ok(lines.join("\n"))
}

fn quantile_rows(label: &str, quantiles: Option<&Value>) -> Vec<Vec<String>> {
    quantiles
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    vec![
                        label.to_string(),
                        decimal_field(entry, "quantile"),
                        decimal_field(entry, "quantity"),
                        decimal_field(entry, "monetary_value"),
                    ]
                })
                .collect()
        })
        .unwrap_or_default()
}

fn score_counts_text(score_counts: Option<&Value>) -> String {
    let parts = score_counts
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    format!(
                        "{}x{}",
                        entry.get("score").and_then(Value::as_u64).unwrap_or(0),
                        entry.get("items").and_then(Value::as_u64).unwrap_or(0)
                    )
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn number_text(value: &Value, key: &str) -> String {
    value.get(key).map(Value::to_string).unwrap_or_default()
}

fn decimal_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_f64)
        .map(format_decimal)
        .unwrap_or_default()
}

fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        _ => "no".to_string(),
    }
}
