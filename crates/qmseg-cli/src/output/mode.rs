use crate::cli::{Commands, RunsCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Run { json, .. }
        | Commands::Quantiles { json, .. }
        | Commands::Runs {
            command: RunsCommand::List { json, .. },
        } => *json,
    };
    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
