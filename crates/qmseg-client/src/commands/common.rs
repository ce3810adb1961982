use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ClientResult;
use crate::config::{self, LoadedConfig};
use crate::segmentation::assemble::EXECUTION_NOTE_PREFIX;
use crate::state::{default_config_path, resolve_home};

/// Resolves the home directory and loads the layered configuration: the
/// explicit file when given, otherwise `qmseg.toml` inside the home.
pub(crate) fn load_settings(
    config_path: Option<&Path>,
    home_override: Option<&Path>,
) -> ClientResult<(PathBuf, LoadedConfig)> {
    let home = resolve_home(home_override)?;
    let loaded = config::load(config_path, &default_config_path(&home))?;
    debug!(
        home = %home.display(),
        config = ?loaded.path,
        "configuration loaded"
    );
    Ok((home, loaded))
}

/// Extracts the execution id from an audit note written by this tool.
pub(crate) fn execution_id_from_note(note: &str) -> Option<i64> {
    note.trim()
        .strip_prefix(EXECUTION_NOTE_PREFIX)
        .and_then(|value| value.trim().parse::<i64>().ok())
}
