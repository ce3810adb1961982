use qmseg_client::commands::quantiles::{self, QuantilesShowOptions};
use qmseg_client::commands::run::{self, RunOptions};
use qmseg_client::commands::runs::{self, RunsListOptions};
use qmseg_client::{ClientResult, SuccessEnvelope};
use tracing::debug;

use crate::cli::{Cli, Commands, RunsCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    let home_override = cli.home.as_deref();
    let config_path = cli.config.as_deref();
    debug!(
        home = ?home_override,
        config = ?config_path,
        command = ?cli.command,
        "dispatching command"
    );

    match &cli.command {
        Commands::Run {
            dry_run,
            source_file,
            threshold_scope,
            no_department_grouping,
            json: _,
        } => run::run_with_options(RunOptions {
            config_path,
            home_override,
            source_file: source_file.as_deref(),
            threshold_scope: *threshold_scope,
            department_grouping: no_department_grouping.then_some(false),
            dry_run: *dry_run,
            started_at: None,
        }),
        Commands::Runs { command } => match command {
            RunsCommand::List { limit, .. } => runs::list_with_options(RunsListOptions {
                config_path,
                home_override,
                limit: *limit,
            }),
        },
        Commands::Quantiles { execution_id, .. } => {
            quantiles::show_with_options(QuantilesShowOptions {
                execution_id: *execution_id,
                config_path,
                home_override,
            })
        }
    }
}
