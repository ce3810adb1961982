use std::path::Path;

use rusqlite::params;

use crate::commands::common::{execution_id_from_note, load_settings};
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{RunEntry, RunsListData};
use crate::setup::{Datastore, open_existing_at};
use crate::state::{datastore_db_path, map_sqlite_error};
use crate::{ClientError, ClientResult};

pub const DEFAULT_RUNS_LIMIT: usize = 20;

#[derive(Debug, Default)]
pub struct RunsListOptions<'a> {
    pub config_path: Option<&'a Path>,
    pub home_override: Option<&'a Path>,
    pub limit: Option<usize>,
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(RunsListOptions::default())
}

#[doc(hidden)]
pub fn list_with_options(options: RunsListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let limit = options.limit.unwrap_or(DEFAULT_RUNS_LIMIT);
    if limit == 0 {
        return Err(ClientError::invalid_argument_for_command(
            "`--limit` must be at least 1.",
            Some("runs list"),
        ));
    }

    let (home, loaded) = load_settings(options.config_path, options.home_override)?;
    let destination = loaded.config.destination;

    let runs = match open_existing_at(&home, &destination)? {
        Some(datastore) => recent_runs(&datastore, limit)?,
        None => Vec::new(),
    };

    let data = RunsListData {
        datastore: datastore_db_path(&home).display().to_string(),
        log_table: destination.log_table,
        runs,
    };
    success("runs list", data)
}

/// Newest audit entries first. Log rows written by other jobs share the
/// table and are skipped when their note carries no execution id.
fn recent_runs(datastore: &Datastore, limit: usize) -> ClientResult<Vec<RunEntry>> {
    let db_path = datastore.db_path.as_path();
    let tables = &datastore.tables;
    let sql = format!(
        "SELECT \"Date\", \"Event\", \"Note\" FROM \"{}\" ORDER BY rowid DESC",
        tables.log_table
    );
    let mut statement = datastore
        .connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut entries = Vec::new();
    for row in rows_iter {
        let (date, event, note) = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        let Some(execution_id) = execution_id_from_note(&note) else {
            continue;
        };
        entries.push(RunEntry {
            execution_id,
            date,
            event,
            segmentation_rows: 0,
            quantile_rows: 0,
        });
        if entries.len() == limit {
            break;
        }
    }

    for entry in &mut entries {
        entry.segmentation_rows =
            count_rows(datastore, &tables.segmentation_table, entry.execution_id)?;
        entry.quantile_rows = count_rows(datastore, &tables.quantiles_table, entry.execution_id)?;
    }
    Ok(entries)
}

fn count_rows(datastore: &Datastore, table: &str, execution_id: i64) -> ClientResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM \"{table}\" WHERE \"ExecutionId\" = ?1");
    datastore
        .connection
        .query_row(&sql, params![execution_id], |row| row.get::<_, i64>(0))
        .map_err(|error| map_sqlite_error(&datastore.db_path, &error))
}
