//! Command-line interface definitions for the article harvester.
//!
//! The configuration file carries almost everything; the flags here only
//! override individual settings for a single run.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the article harvester.
///
/// # Examples
///
/// ```sh
/// # Run with the settings in sites.json
/// article_harvester sites.json
///
/// # Write results elsewhere and crawl without pauses
/// article_harvester sites.yaml --output-dir /tmp/out --delay 0
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON or YAML configuration file
    pub config: PathBuf,

    /// Override the output directory from the config file
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Override the delay in seconds between requests
    #[arg(short, long)]
    pub delay: Option<u64>,

    /// Ledger database password, overrides `db.password`
    #[arg(long, env = "HARVESTER_DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&["article_harvester", "sites.json"]);

        assert_eq!(cli.config, PathBuf::from("sites.json"));
        assert!(cli.output_dir.is_none());
        assert!(cli.delay.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(&[
            "article_harvester",
            "sites.yaml",
            "-o",
            "/tmp/out",
            "-d",
            "0",
        ]);

        assert_eq!(cli.output_dir.as_deref(), Some("/tmp/out"));
        assert_eq!(cli.delay, Some(0));
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(&["article_harvester"]).is_err());
    }
}
