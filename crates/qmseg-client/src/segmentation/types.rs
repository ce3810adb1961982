use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// One item as supplied by a record fetcher. Numeric measures are already
/// coalesced to zero when the source had no matching sales.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRecord {
    pub item_no: String,
    pub status: String,
    pub quantity: f64,
    pub amount: f64,
    pub cost: f64,
    pub days: i64,
    pub count: i64,
    pub department: Option<String>,
}

/// An item plus its profitability, tagged with its position in the fetched
/// record set so ranks can be aligned back to source rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub row: usize,
    pub item: ItemRecord,
    pub monetary_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CohortKey {
    /// The whole with-sales population (department grouping off).
    All,
    Department(String),
    /// With-sales items carrying no department while grouping is on.
    Unassigned,
}

impl CohortKey {
    pub fn department(&self) -> Option<&str> {
        match self {
            Self::Department(name) => Some(name.as_str()),
            Self::All | Self::Unassigned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakpoints {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl Breakpoints {
    pub fn at(&self, level: QuantileLevel) -> f64 {
        match level {
            QuantileLevel::P25 => self.p25,
            QuantileLevel::P50 => self.p50,
            QuantileLevel::P75 => self.p75,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantileSet {
    pub quantity: Breakpoints,
    pub monetary_value: Breakpoints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantileLevel {
    P25,
    P50,
    P75,
}

impl QuantileLevel {
    pub const ALL: [Self; 3] = [Self::P25, Self::P50, Self::P75];

    pub const fn fraction(self) -> f64 {
        match self {
            Self::P25 => 0.25,
            Self::P50 => 0.5,
            Self::P75 => 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSalesRecord {
    pub row: usize,
    pub item: ItemRecord,
    pub monetary_value: f64,
    pub quantity_quartile: u8,
    pub monetary_quartile: u8,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNoSalesRecord {
    pub row: usize,
    pub item: ItemRecord,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CohortResult {
    pub key: CohortKey,
    pub quantiles: QuantileSet,
    pub records: Vec<ScoredSalesRecord>,
}

/// Everything the scorers produced for one run, cohorts in first-appearance
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    pub cohorts: Vec<CohortResult>,
    pub no_sales: Vec<ScoredNoSalesRecord>,
}

impl Segmentation {
    pub fn sales_record_count(&self) -> usize {
        self.cohorts.iter().map(|cohort| cohort.records.len()).sum()
    }
}

/// Identity of one run. Captured once at start and shared by every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub execution_id: i64,
    pub timestamp: DateTime<Utc>,
    pub script_name: String,
    pub type_tag: String,
}

impl RunContext {
    pub fn new(timestamp: DateTime<Utc>, script_name: &str, type_tag: &str) -> Self {
        Self {
            execution_id: timestamp.timestamp(),
            timestamp,
            script_name: script_name.to_string(),
            type_tag: type_tag.to_string(),
        }
    }

    pub fn start(script_name: &str, type_tag: &str) -> Self {
        Self::new(Utc::now(), script_name, type_tag)
    }

    pub fn timestamp_text(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::RunContext;

    #[test]
    fn execution_id_is_unix_seconds_of_run_start() {
        let started = Utc.with_ymd_and_hms(2026, 3, 1, 6, 30, 0).single();
        assert!(started.is_some());
        if let Some(timestamp) = started {
            let context = RunContext::new(timestamp, "QM_Tea", "TE");
            assert_eq!(context.execution_id, 1_772_346_600);
            assert_eq!(context.timestamp_text(), "2026-03-01T06:30:00.000Z");
        }
    }
}
