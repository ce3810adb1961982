use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const RUN_HELP_COMMAND: &str = "qmseg run --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `qmseg {cmd} --help` for usage."),
            None => "Run `qmseg --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_config(path: Option<&Path>, detail: &str) -> Self {
        let location = path
            .map(|value| value.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string());
        Self::new(
            "invalid_config",
            &format!("Configuration at `{location}` is invalid: {detail}"),
            vec![
                "Fix the reported setting in the TOML file or the matching `QMSEG_` variable."
                    .to_string(),
                format!("Run `{RUN_HELP_COMMAND}` to review the configuration layout."),
            ],
        )
        .with_data(json!({
            "config_path": location,
        }))
    }

    pub fn invalid_table_name(setting: &str, value: &str) -> Self {
        Self::new(
            "invalid_config",
            &format!("Destination table `{value}` configured for `{setting}` is not a plain SQL identifier."),
            vec![
                "Use only ASCII letters, digits and underscores, starting with a letter."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "setting": setting,
            "value": value,
        }))
    }

    pub fn source_unavailable(location: &str, detail: &str) -> Self {
        Self::new(
            "source_unavailable",
            &format!("Could not open item source `{location}`: {detail}"),
            vec![
                "Verify `source.path` points to a readable warehouse or export file.".to_string(),
                "Rerun `qmseg run --dry-run` once the source is reachable.".to_string(),
            ],
        )
        .with_data(json!({
            "source": location,
        }))
    }

    pub fn source_query_failed(location: &str, detail: &str) -> Self {
        Self::new(
            "source_query_failed",
            &format!("Item query against `{location}` failed: {detail}"),
            vec![
                "Check that the warehouse exposes the `items` and `sales_entries` tables."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "source": location,
        }))
    }

    pub fn source_schema_mismatch(
        location: &str,
        required_headers: Vec<String>,
        actual_headers: Vec<String>,
    ) -> Self {
        Self::new(
            "source_schema_mismatch",
            &format!("Item export `{location}` does not carry the required columns."),
            vec![
                "Include every required header; `Department` may be omitted.".to_string(),
                "Do not include unknown headers.".to_string(),
            ],
        )
        .with_data(json!({
            "source": location,
            "required_headers": required_headers,
            "actual_headers": actual_headers,
        }))
    }

    pub fn source_row_invalid(location: &str, row: usize, detail: &str) -> Self {
        Self::new(
            "source_row_invalid",
            &format!("Row {row} of `{location}` is invalid: {detail}"),
            vec!["Fix the listed row in the export and rerun.".to_string()],
        )
        .with_data(json!({
            "source": location,
            "row": row,
        }))
    }

    pub fn run_not_found(execution_id: i64) -> Self {
        Self::new(
            "run_not_found",
            &format!("Execution id `{execution_id}` was not found."),
            vec![
                "Run `qmseg runs list` to find a valid execution id.".to_string(),
                "Retry with `qmseg quantiles <execution-id>`.".to_string(),
            ],
        )
        .with_data(json!({
            "execution_id": execution_id,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn datastore_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "datastore_permission_denied",
            &format!("Cannot open datastore at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `QMSEG_HOME` to a writable directory."
            )],
        )
    }

    pub fn datastore_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "datastore_locked",
            &format!("Datastore is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn datastore_corrupt(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "datastore_corrupt",
            &format!("Datastore at `{location}` is not usable: {detail}"),
            vec![format!(
                "Replace `{location}` with a valid SQLite datastore or restore from backup."
            )],
        )
    }

    pub fn datastore_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "datastore_failed",
            &format!("Datastore operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
