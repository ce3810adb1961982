use std::path::Path;

use rusqlite::{OptionalExtension, params};

use crate::commands::common::load_settings;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{PersistedQuantile, QuantilesData};
use crate::segmentation::assemble::EXECUTION_NOTE_PREFIX;
use crate::setup::{Datastore, open_existing_at};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct QuantilesShowOptions<'a> {
    pub execution_id: i64,
    pub config_path: Option<&'a Path>,
    pub home_override: Option<&'a Path>,
}

pub fn show(execution_id: i64) -> ClientResult<SuccessEnvelope> {
    show_with_options(QuantilesShowOptions {
        execution_id,
        ..QuantilesShowOptions::default()
    })
}

#[doc(hidden)]
pub fn show_with_options(options: QuantilesShowOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let (home, loaded) = load_settings(options.config_path, options.home_override)?;
    let destination = loaded.config.destination;
    let Some(datastore) = open_existing_at(&home, &destination)? else {
        return Err(ClientError::run_not_found(options.execution_id));
    };

    let (timestamp, rows) = persisted_quantiles(&datastore, options.execution_id)?;
    // A run whose items all lacked sales has no quantile rows but still logged.
    let timestamp = match timestamp {
        Some(value) => Some(value),
        None => logged_run_date(&datastore, options.execution_id)?,
    };
    if rows.is_empty() && timestamp.is_none() {
        return Err(ClientError::run_not_found(options.execution_id));
    }

    let data = QuantilesData {
        execution_id: options.execution_id,
        timestamp,
        quantiles_table: destination.quantiles_table,
        rows,
    };
    success("quantiles", data)
}

fn persisted_quantiles(
    datastore: &Datastore,
    execution_id: i64,
) -> ClientResult<(Option<String>, Vec<PersistedQuantile>)> {
    let db_path = datastore.db_path.as_path();
    let sql = format!(
        "SELECT \"Timestamp\", \"Type\", \"Quantile\", \"Quantity\", \"MonetaryValue\"
         FROM \"{}\"
         WHERE \"ExecutionId\" = ?1
         ORDER BY rowid ASC",
        datastore.tables.quantiles_table
    );
    let mut statement = datastore
        .connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map(params![execution_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                PersistedQuantile {
                    type_label: row.get(1)?,
                    quantile: row.get(2)?,
                    quantity: row.get(3)?,
                    monetary_value: row.get(4)?,
                },
            ))
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut timestamp = None;
    let mut rows = Vec::new();
    for row in rows_iter {
        let (row_timestamp, quantile) = row.map_err(|error| map_sqlite_error(db_path, &error))?;
        timestamp.get_or_insert(row_timestamp);
        rows.push(quantile);
    }
    Ok((timestamp, rows))
}

fn logged_run_date(datastore: &Datastore, execution_id: i64) -> ClientResult<Option<String>> {
    let sql = format!(
        "SELECT \"Date\" FROM \"{}\" WHERE \"Note\" = ?1 ORDER BY rowid DESC LIMIT 1",
        datastore.tables.log_table
    );
    datastore
        .connection
        .query_row(
            &sql,
            params![format!("{EXECUTION_NOTE_PREFIX}{execution_id}")],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(&datastore.db_path, &error))
}
