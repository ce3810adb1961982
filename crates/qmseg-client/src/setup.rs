use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::config::{DestinationConfig, is_plain_identifier};
use crate::state::{datastore_db_path, ensure_home_directory, map_sqlite_error, open_connection};
use crate::{ClientError, ClientResult};

pub(crate) const SEGMENTATION_COLUMNS: [(&str, &str); 8] = [
    ("ExecutionId", "INTEGER NOT NULL"),
    ("Timestamp", "TEXT NOT NULL"),
    ("ItemNo", "TEXT NOT NULL"),
    ("Quantity", "REAL"),
    ("MonetaryValue", "REAL"),
    ("Score", "INTEGER NOT NULL"),
    ("Type", "TEXT NOT NULL"),
    ("Script", "TEXT NOT NULL"),
];
pub(crate) const QUANTILE_COLUMNS: [(&str, &str); 6] = [
    ("ExecutionId", "INTEGER NOT NULL"),
    ("Timestamp", "TEXT NOT NULL"),
    ("Type", "TEXT NOT NULL"),
    ("Quantile", "REAL NOT NULL"),
    ("Quantity", "REAL NOT NULL"),
    ("MonetaryValue", "REAL NOT NULL"),
];
pub(crate) const LOG_COLUMNS: [(&str, &str); 3] = [
    ("Date", "TEXT NOT NULL"),
    ("Event", "TEXT NOT NULL"),
    ("Note", "TEXT NOT NULL"),
];

/// Open destination datastore with every configured table present and
/// carrying the expected columns.
#[derive(Debug)]
pub struct Datastore {
    pub connection: Connection,
    pub db_path: PathBuf,
    pub tables: DestinationConfig,
}

pub fn ensure_initialized_at(
    home: &Path,
    destination: &DestinationConfig,
) -> ClientResult<Datastore> {
    destination.validate()?;
    ensure_home_directory(home)?;

    let db_path = datastore_db_path(home);
    let connection = open_connection(&db_path)?;

    for (table_name, columns) in required_tables(destination) {
        ensure_table(&connection, table_name, columns, &db_path)?;
        verify_table(&connection, table_name, columns, &db_path)?;
    }
    debug!(datastore = %db_path.display(), "destination tables verified");

    Ok(Datastore {
        connection,
        db_path,
        tables: destination.clone(),
    })
}

/// Opens an existing datastore for reading history. Unlike
/// [`ensure_initialized_at`] nothing is created; a missing file means no run
/// has been recorded yet and yields `None`.
pub fn open_existing_at(
    home: &Path,
    destination: &DestinationConfig,
) -> ClientResult<Option<Datastore>> {
    destination.validate()?;
    let db_path = datastore_db_path(home);
    if !db_path.is_file() {
        return Ok(None);
    }

    let connection = open_connection(&db_path)?;
    for (table_name, columns) in required_tables(destination) {
        if !sqlite_object_exists(&connection, "table", table_name, &db_path)? {
            return Ok(None);
        }
        verify_table(&connection, table_name, columns, &db_path)?;
    }

    Ok(Some(Datastore {
        connection,
        db_path,
        tables: destination.clone(),
    }))
}

type ColumnSpec = &'static [(&'static str, &'static str)];

fn required_tables(destination: &DestinationConfig) -> [(&str, ColumnSpec); 3] {
    [
        (destination.segmentation_table.as_str(), &SEGMENTATION_COLUMNS[..]),
        (destination.quantiles_table.as_str(), &QUANTILE_COLUMNS[..]),
        (destination.log_table.as_str(), &LOG_COLUMNS[..]),
    ]
}

fn ensure_table(
    connection: &Connection,
    table_name: &str,
    columns: &[(&str, &str)],
    db_path: &Path,
) -> ClientResult<()> {
    let sql = create_table_sql(table_name, columns)?;
    connection
        .execute_batch(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub(crate) fn create_table_sql(table_name: &str, columns: &[(&str, &str)]) -> ClientResult<String> {
    if !is_plain_identifier(table_name) {
        return Err(ClientError::invalid_table_name("destination", table_name));
    }

    let column_sql = columns
        .iter()
        .map(|(name, definition)| format!("\"{name}\" {definition}"))
        .collect::<Vec<String>>()
        .join(",\n    ");
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS \"{table_name}\" (\n    {column_sql}\n);"
    ))
}

fn verify_table(
    connection: &Connection,
    table_name: &str,
    required_columns: &[(&str, &str)],
    db_path: &Path,
) -> ClientResult<()> {
    let columns = table_columns(connection, table_name, db_path)?;
    for (required_column, _) in required_columns {
        if !columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(required_column))
        {
            return Err(ClientError::datastore_corrupt(
                db_path,
                &format!("table `{table_name}` is missing column `{required_column}`"),
            ));
        }
    }
    Ok(())
}

fn sqlite_object_exists(
    connection: &Connection,
    object_type: &str,
    object_name: &str,
    db_path: &Path,
) -> ClientResult<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 COLLATE NOCASE LIMIT 1",
            params![object_type, object_name],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?
        .unwrap_or(false);

    Ok(exists)
}

fn table_columns(
    connection: &Connection,
    table_name: &str,
    db_path: &Path,
) -> ClientResult<Vec<String>> {
    if !is_plain_identifier(table_name) {
        return Err(ClientError::invalid_table_name("destination", table_name));
    }

    // `table_name` passed the identifier check above, so it cannot escape the quotes.
    let sql = format!("PRAGMA table_info(\"{table_name}\")");
    let mut statement = connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let column_iter = statement
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut columns: Vec<String> = Vec::new();
    for row in column_iter {
        let column = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        columns.push(column);
    }

    Ok(columns)
}
