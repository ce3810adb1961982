pub mod file;
pub mod warehouse;

use chrono::{DateTime, Utc};

use crate::config::{SourceConfig, SourceKind};
use crate::segmentation::types::ItemRecord;
use crate::{ClientError, ClientResult};

/// Supplies the flat item record set for one run.
pub trait RecordFetcher {
    /// Human-readable location used in summaries and error messages.
    fn describe(&self) -> String;

    /// `as_of` is the run start; trailing sales windows end there.
    fn fetch(&self, as_of: DateTime<Utc>) -> ClientResult<Vec<ItemRecord>>;
}

/// Builds the fetcher named by `source.kind`. The discontinued marker lets the
/// warehouse query zero the sales count of discontinued items.
pub fn fetcher_for(
    source: &SourceConfig,
    discontinued_marker: &str,
) -> ClientResult<Box<dyn RecordFetcher>> {
    let path = source.path.clone().ok_or_else(|| {
        ClientError::invalid_config(
            None,
            "`source.path` is required; point it at the warehouse database or an item export",
        )
    })?;

    Ok(match source.kind {
        SourceKind::Warehouse => Box::new(warehouse::WarehouseFetcher::new(
            path,
            source.filter.clone(),
            discontinued_marker,
        )),
        SourceKind::File => Box::new(file::FileFetcher::new(path)),
    })
}
