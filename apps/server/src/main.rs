mod api;
mod cli;
mod command;
mod config;
mod error;

use error::WrapErr;

use clap::CommandFactory;
use clap::Parser;
use kb_core::SearchOptions;

#[tokio::main]
async fn main() -> error::Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(command_line.log_level())
        .init();

    let cfg = config::Config::load().context("Load configuration error")?;

    if let Some(command) = command_line.command {
        let cmd: Box<dyn command::Command> = match command {
            cli::Commands::Serve { root, listen } => {
                Box::new(command::ServeCommand::new(cfg, root, listen))
            }
            cli::Commands::Index { root_path } => {
                Box::new(command::IndexCommand::new(cfg, root_path))
            }
            cli::Commands::Search {
                query,
                limit,
                offset,
                category,
                tags,
                sort_by,
                root,
            } => {
                let options = SearchOptions {
                    limit,
                    offset,
                    category,
                    tags,
                    sort_by,
                };
                Box::new(command::SearchCommand::new(cfg, root, query, options))
            }
        };
        cmd.execute().await?;
    } else {
        cli::Cli::command().print_help()?;
    }

    Ok(())
}
