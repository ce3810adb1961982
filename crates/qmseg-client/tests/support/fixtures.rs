use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use qmseg_client::SuccessEnvelope;
use rusqlite::{Connection, params};
use serde_json::Value;
use tempfile::{Builder, TempDir};

/// 2026-03-01T06:30:00Z; the trailing 12-month window starts 2025-03-01.
pub fn run_started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 6, 30, 0)
        .single()
        .unwrap_or_default()
}

pub const RUN_EXECUTION_ID: i64 = 1_772_346_600;

pub fn temp_workspace(prefix: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = Builder::new().prefix(prefix).tempdir()?;
    let home = dir.path().join("qmseg-home");
    fs::create_dir_all(&home)?;
    Ok((dir, home))
}

struct FixtureItem {
    item_no: &'static str,
    status: &'static str,
    net_weight: f64,
    days: i64,
    department: Option<&'static str>,
    category_code: &'static str,
    production_code: &'static str,
    subgroup_code: &'static str,
    is_sales_item: i64,
    account: &'static str,
}

const TEA_ACCOUNT: &str = "BKI foods a/s";

fn tea(
    item_no: &'static str,
    status: &'static str,
    net_weight: f64,
    days: i64,
    department: Option<&'static str>,
) -> FixtureItem {
    FixtureItem {
        item_no,
        status,
        net_weight,
        days,
        department,
        category_code: "TE",
        production_code: "PAK PL TE",
        subgroup_code: "800",
        is_sales_item: 1,
        account: TEA_ACCOUNT,
    }
}

fn fixture_items() -> Vec<FixtureItem> {
    vec![
        tea("10001", "Aktiv", 0.5, 400, Some("Te")),
        tea("10002", "Aktiv", 1.0, 380, Some("Te")),
        tea("10003", "Aktiv", 2.0, 365, Some("Te")),
        tea("10004", "Aktiv", 1.0, 720, Some("Te")),
        tea("10005", "Aktiv", 1.0, 150, Some("Urtete")),
        tea("10006", "Aktiv", 1.0, 200, Some("Te")),
        tea("10007", "Er udgået", 1.0, 10, Some("Urtete")),
        tea("10008", "Aktiv", 1.0, 30, Some("Te")),
        FixtureItem {
            subgroup_code: "815",
            production_code: "",
            ..tea("10013", "Aktiv", 1.0, 500, None)
        },
        // Everything below is filtered out by the default source filter.
        tea("90001", "Aktiv", 1.0, 400, Some("Te")),
        FixtureItem {
            category_code: "KA",
            ..tea("10009", "Aktiv", 1.0, 400, Some("Kaffe"))
        },
        FixtureItem {
            production_code: "PAKKET TE",
            subgroup_code: "940",
            ..tea("10010", "Aktiv", 1.0, 400, Some("Te"))
        },
        FixtureItem {
            account: "Other foods",
            ..tea("10011", "Aktiv", 1.0, 400, Some("Te"))
        },
        FixtureItem {
            is_sales_item: 0,
            ..tea("10012", "Aktiv", 1.0, 400, Some("Te"))
        },
    ]
}

/// (item_no, entry_type, posting_date, invoiced_qty, amount, cost)
const SALES_ENTRIES: [(&str, i64, &str, f64, f64, f64); 14] = [
    ("10001", 1, "2025-06-15", -10.0, 100.0, 40.0),
    ("10001", 1, "2025-11-02", -30.0, 300.0, 110.0),
    ("10002", 1, "2025-04-01", -10.0, 100.0, 60.0),
    ("10003", 1, "2025-09-09", -15.0, 600.0, 200.0),
    ("10004", 1, "2025-12-24", -40.0, 900.0, 300.0),
    ("10005", 1, "2026-01-10", -5.0, 50.0, 20.0),
    ("10007", 1, "2025-07-01", -3.0, 30.0, 10.0),
    ("10013", 1, "2024-12-31", -8.0, 80.0, 30.0),
    ("90001", 1, "2025-06-01", -1.0, 10.0, 5.0),
    ("10009", 1, "2025-06-01", -1.0, 10.0, 5.0),
    ("10010", 1, "2025-06-01", -1.0, 10.0, 5.0),
    ("10011", 1, "2025-06-01", -1.0, 10.0, 5.0),
    // Purchases never count as sales.
    ("10006", 2, "2025-06-01", 50.0, 500.0, 500.0),
    ("10008", 2, "2025-08-01", 20.0, 200.0, 200.0),
];

/// Builds a SQLite warehouse with nine in-scope tea items: four `Te` items
/// and one `Urtete` item with sales, four without.
pub fn build_warehouse(path: &Path) -> rusqlite::Result<()> {
    let connection = Connection::open(path)?;
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

    for item in fixture_items() {
        connection.execute(
            "INSERT INTO items (
                item_no, status, net_weight, days_since_created, department,
                category_code, production_code, subgroup_code, is_sales_item, account
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.item_no,
                item.status,
                item.net_weight,
                item.days,
                item.department,
                item.category_code,
                item.production_code,
                item.subgroup_code,
                item.is_sales_item,
                item.account,
            ],
        )?;
    }

    for (item_no, entry_type, posting_date, invoiced_qty, amount, cost) in SALES_ENTRIES {
        connection.execute(
            "INSERT INTO sales_entries (item_no, entry_type, posting_date, invoiced_qty, amount, cost)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![item_no, entry_type, posting_date, invoiced_qty, amount, cost],
        )?;
    }
    Ok(())
}

/// Writes a warehouse fixture plus a config file pointing at it and returns
/// the config path.
pub fn warehouse_config(dir: &Path, extra_toml: &str) -> std::io::Result<PathBuf> {
    let warehouse = dir.join("warehouse.db");
    build_warehouse(&warehouse).map_err(std::io::Error::other)?;
    let config_path = dir.join("qmseg.toml");
    let content = format!(
        "[source]\nkind = \"warehouse\"\npath = \"{}\"\n\n{extra_toml}",
        warehouse.display()
    );
    fs::write(&config_path, content)?;
    Ok(config_path)
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path)
}

pub fn envelope_data(result: Result<SuccessEnvelope, qmseg_client::ClientError>) -> Value {
    assert!(result.is_ok(), "command failed: {:?}", result.as_ref().err());
    if let Ok(envelope) = result {
        assert!(envelope.ok);
        return envelope.data;
    }
    Value::Null
}

pub fn count_rows(db_path: &Path, table: &str) -> Option<i64> {
    let connection = Connection::open(db_path).ok()?;
    connection
        .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get::<_, i64>(0)
        })
        .ok()
}

/// (ItemNo, Score, Type) for one run, ordered by item number.
pub fn segmentation_scores(db_path: &Path, execution_id: i64) -> Vec<(String, i64, String)> {
    let Ok(connection) = Connection::open(db_path) else {
        return Vec::new();
    };
    let Ok(mut statement) = connection.prepare(
        "SELECT ItemNo, Score, Type FROM seg_item_segmentation
         WHERE ExecutionId = ?1 ORDER BY ItemNo",
    ) else {
        return Vec::new();
    };
    let Ok(rows) = statement.query_map([execution_id], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    }) else {
        return Vec::new();
    };
    rows.filter_map(Result::ok).collect()
}
