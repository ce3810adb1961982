use std::path::PathBuf;

use chrono::{DateTime, Months, NaiveDate, Utc};
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::{debug, info};

use crate::config::SourceFilter;
use crate::segmentation::types::ItemRecord;
use crate::source::RecordFetcher;
use crate::state::open_readonly_connection;
use crate::{ClientError, ClientResult};

/// Sales entry type for invoiced sales; other entry types are purchases,
/// adjustments and transfers.
const SALES_ENTRY_TYPE: i64 = 1;

/// Reads items from a SQLite warehouse exposing an `items` master table and
/// a `sales_entries` fact table.
#[derive(Debug, Clone)]
pub struct WarehouseFetcher {
    path: PathBuf,
    filter: SourceFilter,
    discontinued_marker: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemQuery {
    pub(crate) sql: String,
    pub(crate) params: Vec<SqlValue>,
}

impl WarehouseFetcher {
    pub fn new(path: PathBuf, filter: SourceFilter, discontinued_marker: &str) -> Self {
        Self {
            path,
            filter,
            discontinued_marker: discontinued_marker.to_string(),
        }
    }
}

impl RecordFetcher for WarehouseFetcher {
    fn describe(&self) -> String {
        format!("warehouse:{}", self.path.display())
    }

    fn fetch(&self, as_of: DateTime<Utc>) -> ClientResult<Vec<ItemRecord>> {
        let location = self.path.display().to_string();
        if !self.path.is_file() {
            return Err(ClientError::source_unavailable(
                &location,
                "the warehouse file does not exist",
            ));
        }

        let connection = open_readonly_connection(&self.path)
            .map_err(|error| ClientError::source_unavailable(&location, &error.to_string()))?;

        let window_start = window_start(as_of.date_naive(), self.filter.window_months);
        let query = build_item_query(&self.filter, &self.discontinued_marker, window_start);
        debug!(window_start = %window_start, params = query.params.len(), "querying warehouse");

        let query_error =
            |error: rusqlite::Error| ClientError::source_query_failed(&location, &error.to_string());
        let mut statement = connection.prepare(&query.sql).map_err(query_error)?;
        let rows_iter = statement
            .query_map(params_from_iter(query.params.iter()), |row| {
                Ok(ItemRecord {
                    item_no: row.get(0)?,
                    status: row.get(1)?,
                    quantity: row.get(2)?,
                    amount: row.get(3)?,
                    cost: row.get(4)?,
                    days: row.get(5)?,
                    count: row.get(6)?,
                    department: row.get(7)?,
                })
            })
            .map_err(query_error)?;

        let mut items = Vec::new();
        for row in rows_iter {
            items.push(row.map_err(query_error)?);
        }

        info!(source = %location, items = items.len(), "fetched warehouse items");
        Ok(items)
    }
}

pub(crate) fn window_start(as_of: NaiveDate, window_months: u32) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(window_months))
        .unwrap_or(NaiveDate::MIN)
}

/// Builds the item query. Quantity is net weight times the negated invoiced
/// quantity (sales are booked as outflows); every aggregate coalesces to 0
/// when an item had no sales in the window, and discontinued items report a
/// sales count of 0. The window is date-granular: entries posted on
/// `window_start` itself are included.
///
/// Items with a NULL subgroup never pass the subgroup exclusion.
pub(crate) fn build_item_query(
    filter: &SourceFilter,
    discontinued_marker: &str,
    window_start: NaiveDate,
) -> ItemQuery {
    let mut params: Vec<SqlValue> = vec![
        SqlValue::Text(discontinued_marker.to_string()),
        SqlValue::Integer(SALES_ENTRY_TYPE),
        SqlValue::Text(window_start.format("%Y-%m-%d").to_string()),
        SqlValue::Text(filter.category_code.clone()),
    ];

    let mut sql = String::from(
        "SELECT
            CAST(V.item_no AS TEXT) AS item_no,
            COALESCE(V.status, '') AS status,
            COALESCE(V.net_weight, 0) * COALESCE(S.qty, 0) AS quantity,
            COALESCE(S.amount, 0) AS amount,
            COALESCE(S.cost, 0) AS cost,
            COALESCE(V.days_since_created, 0) AS days,
            CASE WHEN V.status = ? THEN 0 ELSE COALESCE(S.entry_count, 0) END AS entry_count,
            V.department AS department
         FROM items AS V
         LEFT JOIN (
            SELECT
                item_no,
                -1 * SUM(COALESCE(invoiced_qty, 0)) AS qty,
                SUM(COALESCE(amount, 0)) AS amount,
                SUM(COALESCE(cost, 0)) AS cost,
                COUNT(*) AS entry_count
            FROM sales_entries
            WHERE entry_type = ?
              AND posting_date >= ?
            GROUP BY item_no
         ) AS S ON V.item_no = S.item_no
         WHERE V.category_code = ?",
    );

    for prefix in &filter.excluded_item_prefixes {
        if prefix.is_empty() {
            continue;
        }
        sql.push_str("\n           AND instr(CAST(V.item_no AS TEXT), ?) <> 1");
        params.push(SqlValue::Text(prefix.clone()));
    }

    if filter.sales_items_only {
        sql.push_str("\n           AND V.is_sales_item = 1");
    }

    let production = in_clause("V.production_code", &filter.production_codes, &mut params);
    let included = in_clause("V.subgroup_code", &filter.included_subgroup_codes, &mut params);
    match (production, included) {
        (Some(left), Some(right)) => {
            sql.push_str(&format!("\n           AND ({left} OR {right})"));
        }
        (Some(only), None) | (None, Some(only)) => {
            sql.push_str(&format!("\n           AND {only}"));
        }
        (None, None) => {}
    }

    if !filter.excluded_subgroup_codes.is_empty() {
        let placeholders = placeholders(filter.excluded_subgroup_codes.len());
        sql.push_str(&format!(
            "\n           AND V.subgroup_code NOT IN ({placeholders})"
        ));
        params.extend(
            filter
                .excluded_subgroup_codes
                .iter()
                .map(|code| SqlValue::Text(code.clone())),
        );
    }

    if let Some(account) = &filter.account {
        sql.push_str("\n           AND V.account = ?");
        params.push(SqlValue::Text(account.clone()));
    }

    sql.push_str("\n         ORDER BY V.item_no ASC");
    ItemQuery { sql, params }
}

fn in_clause(column: &str, values: &[String], params: &mut Vec<SqlValue>) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    params.extend(values.iter().map(|value| SqlValue::Text(value.clone())));
    Some(format!("{column} IN ({})", placeholders(values.len())))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::{Connection, params_from_iter};

    use super::{build_item_query, window_start};
    use crate::config::SourceFilter;

    fn warehouse_with_item(subgroup_code: Option<&str>) -> rusqlite::Result<Connection> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch(
            "CREATE TABLE items (
                item_no TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                net_weight REAL,
                days_since_created INTEGER,
                department TEXT,
                category_code TEXT NOT NULL,
                production_code TEXT,
                subgroup_code TEXT,
                is_sales_item INTEGER NOT NULL,
                account TEXT
            );
            CREATE TABLE sales_entries (
                entry_no INTEGER PRIMARY KEY,
                item_no TEXT NOT NULL,
                entry_type INTEGER NOT NULL,
                posting_date TEXT NOT NULL,
                invoiced_qty REAL,
                amount REAL,
                cost REAL
            );",
        )?;
        connection.execute(
            "INSERT INTO items (
                item_no, status, net_weight, days_since_created, department,
                category_code, production_code, subgroup_code, is_sales_item, account
            ) VALUES ('2001', 'Aktiv', 0.25, 30, 'Te', 'TE', 'PAKKET TE', ?1, 1, 'BKI foods a/s')",
            [subgroup_code],
        )?;
        Ok(connection)
    }

    fn fetched_item_count(connection: &Connection) -> rusqlite::Result<usize> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN);
        let query = build_item_query(&SourceFilter::default(), "Er udgået", start);
        let mut statement = connection.prepare(&query.sql)?;
        let mut rows = statement.query(params_from_iter(query.params.iter()))?;
        let mut count = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    #[test]
    fn window_is_trailing_calendar_months() {
        let as_of = NaiveDate::from_ymd_opt(2026, 3, 31);
        assert!(as_of.is_some());
        if let Some(date) = as_of {
            assert_eq!(
                window_start(date, 12),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap_or(NaiveDate::MIN)
            );
            assert_eq!(
                window_start(date, 1),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap_or(NaiveDate::MIN)
            );
        }
    }

    #[test]
    fn placeholder_count_matches_parameters() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN);
        let query = build_item_query(&SourceFilter::default(), "Er udgået", start);
        let placeholder_count = query.sql.matches('?').count();
        assert_eq!(placeholder_count, query.params.len());
        // marker, entry type, window, category, prefix, 2 production codes,
        // 4 included subgroups, 2 excluded subgroups, account
        assert_eq!(query.params.len(), 14);
        assert!(query.sql.contains("OR V.subgroup_code IN"));
    }

    #[test]
    fn empty_lists_drop_their_conditions() {
        let filter = SourceFilter {
            excluded_item_prefixes: Vec::new(),
            production_codes: Vec::new(),
            included_subgroup_codes: vec!["815".to_string()],
            excluded_subgroup_codes: Vec::new(),
            account: None,
            sales_items_only: false,
            ..SourceFilter::default()
        };
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN);
        let query = build_item_query(&filter, "Er udgået", start);
        assert_eq!(query.sql.matches('?').count(), query.params.len());
        assert_eq!(query.params.len(), 5);
        assert!(!query.sql.contains("production_code"));
        assert!(!query.sql.contains("NOT IN"));
        assert!(!query.sql.contains("is_sales_item"));
        assert!(query.sql.contains("AND V.subgroup_code IN (?)"));
    }

    #[test]
    fn null_subgroup_items_are_not_fetched() {
        let connection = warehouse_with_item(None);
        assert!(connection.is_ok());
        if let Ok(connection) = connection {
            let count = fetched_item_count(&connection);
            assert!(count.is_ok());
            if let Ok(count) = count {
                assert_eq!(count, 0);
            }
        }
    }

    #[test]
    fn packed_tea_with_a_subgroup_is_fetched() {
        let connection = warehouse_with_item(Some("800"));
        assert!(connection.is_ok());
        if let Ok(connection) = connection {
            let count = fetched_item_count(&connection);
            assert!(count.is_ok());
            if let Ok(count) = count {
                assert_eq!(count, 1);
            }
        }
    }
}
