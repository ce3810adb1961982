use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::info;

use crate::segmentation::types::ItemRecord;
use crate::source::RecordFetcher;
use crate::{ClientError, ClientResult};

const REQUIRED_COLUMNS: [&str; 7] = [
    "ItemNo", "Status", "Quantity", "Amount", "Cost", "Days", "Count",
];
const OPTIONAL_COLUMNS: [&str; 1] = ["Department"];

/// Reads a pre-filtered item export: a CSV file with a header row, or a JSON
/// array of objects, using the warehouse column names.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecordFetcher for FileFetcher {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self, _as_of: DateTime<Utc>) -> ClientResult<Vec<ItemRecord>> {
        let location = self.path.display().to_string();
        let content = fs::read_to_string(&self.path)
            .map_err(|error| ClientError::source_unavailable(&location, &error.to_string()))?;
        let items = parse_items(&content, &location)?;
        info!(source = %location, items = items.len(), "read item export");
        Ok(items)
    }
}

pub(crate) fn parse_items(content: &str, location: &str) -> ClientResult<Vec<ItemRecord>> {
    let trimmed = content.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return parse_json_array(trimmed, location);
    }
    parse_csv(trimmed, location)
}

fn parse_json_array(content: &str, location: &str) -> ClientResult<Vec<ItemRecord>> {
    let parsed = serde_json::from_str::<Value>(content).map_err(|error| {
        ClientError::source_unavailable(location, &format!("invalid JSON: {error}"))
    })?;
    let Some(entries) = parsed.as_array() else {
        return Err(ClientError::source_unavailable(
            location,
            "JSON input must be a top-level array of item objects",
        ));
    };

    let mut items = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let row = index + 1;
        let Some(object) = entry.as_object() else {
            return Err(ClientError::source_row_invalid(
                location,
                row,
                "entry is not an object",
            ));
        };
        let fields = RawFields {
            item_no: json_text(object, "ItemNo"),
            status: json_text(object, "Status"),
            quantity: json_text(object, "Quantity"),
            amount: json_text(object, "Amount"),
            cost: json_text(object, "Cost"),
            days: json_text(object, "Days"),
            count: json_text(object, "Count"),
            department: json_text(object, "Department"),
        };
        items.push(fields.into_item(location, row)?);
    }
    Ok(items)
}

fn parse_csv(content: &str, location: &str) -> ClientResult<Vec<ItemRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| ClientError::source_unavailable(location, &error.to_string()))?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();
    if !headers_are_valid(&headers) {
        return Err(ClientError::source_schema_mismatch(
            location,
            REQUIRED_COLUMNS.iter().map(|value| value.to_string()).collect(),
            headers,
        ));
    }

    let index_by_name = headers
        .iter()
        .enumerate()
        .map(|(index, name)| (name.clone(), index))
        .collect::<HashMap<String, usize>>();

    let mut items = Vec::new();
    for (index, result_row) in reader.records().enumerate() {
        let row = index + 1;
        let record = result_row
            .map_err(|error| ClientError::source_row_invalid(location, row, &error.to_string()))?;
        let value_for = |name: &str| -> Option<String> {
            let position = index_by_name.get(name)?;
            record.get(*position).map(str::to_string)
        };
        let fields = RawFields {
            item_no: value_for("ItemNo"),
            status: value_for("Status"),
            quantity: value_for("Quantity"),
            amount: value_for("Amount"),
            cost: value_for("Cost"),
            days: value_for("Days"),
            count: value_for("Count"),
            department: value_for("Department"),
        };
        items.push(fields.into_item(location, row)?);
    }
    Ok(items)
}

struct RawFields {
    item_no: Option<String>,
    status: Option<String>,
    quantity: Option<String>,
    amount: Option<String>,
    cost: Option<String>,
    days: Option<String>,
    count: Option<String>,
    department: Option<String>,
}

impl RawFields {
    fn into_item(self, location: &str, row: usize) -> ClientResult<ItemRecord> {
        let item_no = non_empty(self.item_no)
            .ok_or_else(|| ClientError::source_row_invalid(location, row, "ItemNo is missing"))?;
        Ok(ItemRecord {
            item_no,
            status: self.status.map(|value| value.trim().to_string()).unwrap_or_default(),
            quantity: decimal_or_zero(self.quantity, "Quantity", location, row)?,
            amount: decimal_or_zero(self.amount, "Amount", location, row)?,
            cost: decimal_or_zero(self.cost, "Cost", location, row)?,
            days: integer_or_zero(self.days, "Days", location, row)?,
            count: integer_or_zero(self.count, "Count", location, row)?,
            department: non_empty(self.department),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn decimal_or_zero(
    value: Option<String>,
    field: &str,
    location: &str,
    row: usize,
) -> ClientResult<f64> {
    let Some(text) = non_empty(value) else {
        return Ok(0.0);
    };
    text.parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| {
            ClientError::source_row_invalid(
                location,
                row,
                &format!("{field} `{text}` is not a number"),
            )
        })
}

fn integer_or_zero(
    value: Option<String>,
    field: &str,
    location: &str,
    row: usize,
) -> ClientResult<i64> {
    let Some(text) = non_empty(value) else {
        return Ok(0);
    };
    if let Ok(parsed) = text.parse::<i64>() {
        return Ok(parsed);
    }
    // Exports written by dataframe tools render integer columns as `12.0`.
    match text.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() && parsed.fract() == 0.0 => Ok(parsed as i64),
        _ => Err(ClientError::source_row_invalid(
            location,
            row,
            &format!("{field} `{text}` is not a whole number"),
        )),
    }
}

fn json_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    let current = object.get(key)?;
    if current.is_null() {
        return None;
    }
    if let Some(text) = current.as_str() {
        return Some(text.to_string());
    }
    if let Some(number) = current.as_i64() {
        return Some(number.to_string());
    }
    if let Some(number) = current.as_f64() {
        return Some(number.to_string());
    }
    Some(current.to_string())
}

fn headers_are_valid(actual_headers: &[String]) -> bool {
    let has_required = REQUIRED_COLUMNS
        .iter()
        .all(|required| actual_headers.iter().any(|header| header == required));
    let all_known = actual_headers.iter().all(|header| {
        REQUIRED_COLUMNS.contains(&header.as_str()) || OPTIONAL_COLUMNS.contains(&header.as_str())
    });
    has_required && all_known
}
