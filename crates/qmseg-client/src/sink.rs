use std::path::Path;

use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::info;

use crate::config::{DestinationConfig, is_plain_identifier};
use crate::segmentation::assemble::{AssembledRun, AuditRecord, QuantileRow, SegmentationRow};
use crate::state::map_sqlite_error;
use crate::{ClientError, ClientResult};

/// Append-only destination for one run's output. Each call writes to the
/// named table; nothing is updated or deleted.
pub trait SegmentationSink {
    fn append_segmentation(&mut self, table: &str, rows: &[SegmentationRow]) -> ClientResult<usize>;

    fn append_quantiles(&mut self, table: &str, rows: &[QuantileRow]) -> ClientResult<usize>;

    fn append_audit(&mut self, table: &str, record: &AuditRecord) -> ClientResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteCounts {
    pub segmentation_rows: usize,
    pub quantile_rows: usize,
    pub audit_rows: usize,
}

/// Writes an assembled run: sales rows, no-sales rows, quantile rows, then
/// the audit record. The first failure aborts; earlier appends stay.
pub fn write_run<S: SegmentationSink + ?Sized>(
    sink: &mut S,
    tables: &DestinationConfig,
    run: &AssembledRun,
) -> ClientResult<WriteCounts> {
    let mut counts = WriteCounts::default();
    counts.segmentation_rows += sink.append_segmentation(&tables.segmentation_table, &run.sales_rows)?;
    counts.segmentation_rows +=
        sink.append_segmentation(&tables.segmentation_table, &run.no_sales_rows)?;
    counts.quantile_rows = sink.append_quantiles(&tables.quantiles_table, &run.quantile_rows)?;
    sink.append_audit(&tables.log_table, &run.audit)?;
    counts.audit_rows = 1;

    info!(
        segmentation_rows = counts.segmentation_rows,
        quantile_rows = counts.quantile_rows,
        "run written"
    );
    Ok(counts)
}

/// SQLite-backed sink over the local datastore.
pub struct DatastoreSink<'a> {
    connection: &'a Connection,
    db_path: &'a Path,
}

impl<'a> DatastoreSink<'a> {
    pub fn new(connection: &'a Connection, db_path: &'a Path) -> Self {
        Self {
            connection,
            db_path,
        }
    }

    fn checked_table<'t>(&self, table: &'t str) -> ClientResult<&'t str> {
        if is_plain_identifier(table) {
            Ok(table)
        } else {
            Err(ClientError::invalid_table_name("destination", table))
        }
    }
}

impl SegmentationSink for DatastoreSink<'_> {
    fn append_segmentation(&mut self, table: &str, rows: &[SegmentationRow]) -> ClientResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let table = self.checked_table(table)?;
        let sql = format!(
            "INSERT INTO \"{table}\"
                (\"ExecutionId\", \"Timestamp\", \"ItemNo\", \"Quantity\", \"MonetaryValue\", \"Score\", \"Type\", \"Script\")
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        );
        let mut statement = self
            .connection
            .prepare(&sql)
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        for row in rows {
            statement
                .execute(params![
                    row.execution_id,
                    row.timestamp,
                    row.item_no,
                    row.quantity,
                    row.monetary_value,
                    row.score,
                    row.type_label,
                    row.script,
                ])
                .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        }
        Ok(rows.len())
    }

    fn append_quantiles(&mut self, table: &str, rows: &[QuantileRow]) -> ClientResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let table = self.checked_table(table)?;
        let sql = format!(
            "INSERT INTO \"{table}\"
                (\"ExecutionId\", \"Timestamp\", \"Type\", \"Quantile\", \"Quantity\", \"MonetaryValue\")
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
        let mut statement = self
            .connection
            .prepare(&sql)
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        for row in rows {
            statement
                .execute(params![
                    row.execution_id,
                    row.timestamp,
                    row.type_label,
                    row.quantile,
                    row.quantity,
                    row.monetary_value,
                ])
                .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        }
        Ok(rows.len())
    }

    fn append_audit(&mut self, table: &str, record: &AuditRecord) -> ClientResult<()> {
        let table = self.checked_table(table)?;
        let sql = format!(
            "INSERT INTO \"{table}\" (\"Date\", \"Event\", \"Note\") VALUES (?1, ?2, ?3)"
        );
        self.connection
            .execute(&sql, params![record.date, record.event, record.note])
            .map_err(|error| map_sqlite_error(self.db_path, &error))?;
        Ok(())
    }
}
