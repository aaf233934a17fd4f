use super::RssConfig;
use crate::domain::value::{AttrValue, Attributes};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, Validate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "rss-client")]
#[command(about = "Inspect and clean up resources on a recurring scheduling service")]
pub struct CliConfig {
    /// TOML file with base_uri, secret and time_zone
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "RSS_BASE_URI")]
    pub base_uri: Option<String>,

    #[arg(long, env = "RSS_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    #[arg(long, env = "RSS_TIME_ZONE")]
    pub time_zone: Option<String>,

    /// Organization the resources belong to
    #[arg(long)]
    pub tenant: String,

    #[arg(long)]
    pub scope: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Series operations
    #[command(subcommand)]
    Series(ResourceCommand),
    /// Rule operations
    #[command(subcommand)]
    Rule(ListableCommand),
    /// Occurrence operations
    #[command(subcommand)]
    Occurrence(ListableCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ResourceCommand {
    Get { id: String },
    Delete { id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ListableCommand {
    Get { id: String },
    Delete { id: String },
    List(IntervalFilter),
}

#[derive(Debug, Clone, Args)]
pub struct IntervalFilter {
    #[arg(long)]
    pub interval_starts_at: Option<String>,

    #[arg(long)]
    pub interval_ends_at: Option<String>,
}

impl IntervalFilter {
    pub fn to_attributes(&self) -> Attributes {
        let mut filters = Attributes::new();
        if let Some(starts_at) = &self.interval_starts_at {
            filters.insert("interval_starts_at".to_string(), AttrValue::from(starts_at.as_str()));
        }
        if let Some(ends_at) = &self.interval_ends_at {
            filters.insert("interval_ends_at".to_string(), AttrValue::from(ends_at.as_str()));
        }
        filters
    }
}

impl CliConfig {
    /// File (or defaults), then environment/flags on top, validated.
    pub fn resolve(&self) -> Result<RssConfig> {
        let mut config = match &self.config {
            Some(path) => RssConfig::from_file(path)?,
            None => RssConfig::default(),
        };

        if let Some(base_uri) = &self.base_uri {
            config.base_uri = base_uri.clone();
        }
        if let Some(secret) = &self.secret {
            config.secret = secret.clone();
        }
        if let Some(time_zone) = &self.time_zone {
            config.time_zone = time_zone.clone();
        }

        validate_non_empty_string("tenant", &self.tenant)?;
        validate_non_empty_string("scope", &self.scope)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule_list() {
        let cli = CliConfig::try_parse_from([
            "rss-client",
            "--base-uri",
            "http://rss.local",
            "--tenant",
            "shore",
            "--scope",
            "appointment",
            "rule",
            "list",
            "--interval-starts-at",
            "2015-01-01T00:00:00Z",
        ])
        .unwrap();

        let config = cli.resolve().unwrap();
        assert_eq!(config.base_uri, "http://rss.local");

        match cli.command {
            Command::Rule(ListableCommand::List(filter)) => {
                let filters = filter.to_attributes();
                assert_eq!(
                    filters.get("interval_starts_at"),
                    Some(&AttrValue::from("2015-01-01T00:00:00Z"))
                );
                assert!(!filters.contains_key("interval_ends_at"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_blank_tenant_is_rejected() {
        let cli = CliConfig::try_parse_from([
            "rss-client",
            "--tenant",
            " ",
            "--scope",
            "appointment",
            "series",
            "get",
            "abc",
        ])
        .unwrap();

        assert!(cli.resolve().is_err());
    }
}
