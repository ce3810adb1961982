mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use qmseg_client::ClientError;
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "QMSEG_LOG";

const ROOT_HELP: &str = "qmseg - quantity/monetary segmentation of tea items

Usage:
  qmseg <command>

Start here:
  qmseg run --help
  qmseg run --dry-run
  qmseg runs list
";

const TOP_LEVEL_HELP: &str = "qmseg — quantity/monetary segmentation of tea items

USAGE: qmseg [--home <dir>] [--config <file>] <command>

Score items:
  1. qmseg run --help                                 Read the configuration layout and scoring rules
  2. qmseg run --dry-run                              Compute scores without writing to the datastore
  3. qmseg run                                        Score items and append the results

Review past runs:
  qmseg runs list                                     List runs recorded in the audit log
  qmseg quantiles <execution-id>                      Show the breakpoints one run persisted

Options on every command:
  --home <dir>                                        Datastore directory (default QMSEG_HOME or ~/.qmseg)
  --config <file>                                     Config file (default <home>/qmseg.toml)
  --json                                              Machine-readable output

Diagnostics go to stderr; set QMSEG_LOG=info (or debug) for pipeline detail.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

/// Logs go to stderr so stdout stays parseable in `--json` mode.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let body = if is_top_level_help_request(&raw_args) {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if write_stdout_text(&body).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_command(&cli.command);

    let dispatched = dispatch::dispatch(&cli);
    match dispatched {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing boilerplate (Usage line, "For more information" hint)
/// so the "What to do next" section is the single source of guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Subcommand path for help hints, e.g. "runs list". Values of the global
/// `--home`/`--config` flags are skipped so paths are not mistaken for commands.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    let mut skip_next = false;
    for value in raw_args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if matches!(
            value.as_str(),
            "--home" | "--config" | "--source-file" | "--threshold-scope" | "--limit"
        ) {
            skip_next = true;
            continue;
        }
        if !value.starts_with('-') {
            words.push(value.as_str());
        }
    }

    let hint = match words.as_slice() {
        ["runs", "list", ..] => Some("runs list"),
        ["runs", ..] => Some("runs"),
        ["run", ..] => Some("run"),
        ["quantiles", ..] => Some("quantiles"),
        _ => None,
    };
    hint.map(std::string::ToString::to_string)
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_") || error.code.starts_with("datastore_")
}

#[cfg(test)]
mod tests {
    use qmseg_client::ClientError;

    use super::{command_path_from_args, is_internal_error, strip_clap_boilerplate};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn command_hint_skips_flag_values() {
        assert_eq!(
            command_path_from_args(&args(&["qmseg", "--home", "runs", "runs", "list", "--bogus"])),
            Some("runs list".to_string())
        );
        assert_eq!(
            command_path_from_args(&args(&["qmseg", "run", "--source-file", "quantiles"])),
            Some("run".to_string())
        );
        assert_eq!(command_path_from_args(&args(&["qmseg", "--json"])), None);
    }

    #[test]
    fn clap_boilerplate_is_removed() {
        let message = "error: unexpected argument '--bogus' found\n\nUsage: qmseg run [OPTIONS]\n\nFor more information, try '--help'.\n";
        assert_eq!(
            strip_clap_boilerplate(message),
            "error: unexpected argument '--bogus' found"
        );
    }

    #[test]
    fn datastore_failures_are_internal() {
        let locked = ClientError::datastore_locked(std::path::Path::new("/tmp/datastore.db"));
        assert!(is_internal_error(&locked));
        let missing = ClientError::run_not_found(5);
        assert!(!is_internal_error(&missing));
    }
}
