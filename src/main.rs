use anyhow::Context;
use clap::Parser;
use rss_client::config::cli::{CliConfig, Command, ListableCommand, ResourceCommand};
use rss_client::utils::logger;
use rss_client::Connector;
use serde::Serialize;

fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if let Err(e) = run(&cli) {
        tracing::error!("❌ {:#}", e);
        eprintln!("❌ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &CliConfig) -> anyhow::Result<()> {
    let config = cli.resolve().context("invalid configuration")?;
    tracing::debug!("Using RSS at {} for {}/{}", config.base_uri, cli.tenant, cli.scope);

    let connector = Connector::new(config, cli.tenant.clone(), cli.scope.clone())
        .context("invalid configuration")?;

    match &cli.command {
        Command::Series(ResourceCommand::Get { id }) => print(&connector.get_series(id)?),
        Command::Series(ResourceCommand::Delete { id }) => print(&connector.delete_series(id)?),
        Command::Rule(ListableCommand::Get { id }) => print(&connector.get_rule(id)?),
        Command::Rule(ListableCommand::Delete { id }) => print(&connector.delete_rule(id)?),
        Command::Rule(ListableCommand::List(filter)) => {
            print(&connector.get_rules(&filter.to_attributes())?)
        }
        Command::Occurrence(ListableCommand::Get { id }) => {
            print(&connector.get_occurrence(id)?)
        }
        Command::Occurrence(ListableCommand::Delete { id }) => {
            print(&connector.delete_occurrence(id)?)
        }
        Command::Occurrence(ListableCommand::List(filter)) => {
            print(&connector.get_occurrences(&filter.to_attributes())?)
        }
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
