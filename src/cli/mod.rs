//! CLI module for chload.
//!
//! This module handles command-line argument parsing, logging setup and
//! subcommand dispatch.

pub mod load;
pub mod plan;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chload::schema::parse_type_override;
use chload::{Error, LoadConfig, Result, StoreConfig};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// Version string with git hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

include!("definition.rs");

impl SourceArgs {
    /// Turn the source flags into a validated load configuration.
    pub fn to_config(&self) -> Result<LoadConfig> {
        if !self.delimiter.is_ascii() {
            return Err(Error::Configuration(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }

        let mut config = LoadConfig::new(&self.table, &self.primary_key)
            .with_source(&self.file)
            .with_batch_size(self.batch_size);
        config.csv.delimiter = self.delimiter as u8;
        config.csv.na_values.extend(self.na_values.iter().cloned());
        for spec in &self.type_overrides {
            let (column, ch_type) = parse_type_override(spec)?;
            config = config.with_type_override(column, ch_type);
        }

        config.validate()?;
        Ok(config)
    }
}

impl ConnectionArgs {
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.url.clone(),
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Initialize `env_logger`. `RUST_LOG` wins over the verbosity flags.
fn init_logging(quiet: bool, verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if env::var("RUST_LOG").is_err() {
        let level = if quiet {
            LevelFilter::Warn
        } else if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        builder.filter_module("chload", level);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Load {
            source,
            connection,
            dry_run,
        } => load::run(&source, &connection, dry_run, cli.quiet),
        Commands::Plan {
            source,
            format,
            output,
        } => plan::run(&source, format, output.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(extra: &[&str]) -> SourceArgs {
        let mut args = vec!["chload", "plan", "data.csv", "--table", "t", "-k", "id"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Plan { source, .. } => source,
            Commands::Load { .. } => unreachable!("parsed a plan command"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_source_args_to_config() {
        let config = source(&["--batch-size", "10", "--delimiter", ";", "--na-value", "-", "--type", "id=UInt64"])
            .to_config()
            .unwrap();

        assert_eq!(config.csv.batch_size, 10);
        assert_eq!(config.csv.delimiter, b';');
        assert!(config.csv.na_values.contains(&"-".to_string()));
        assert_eq!(
            config.type_overrides,
            vec![("id".to_string(), "UInt64".to_string())]
        );
    }

    #[test]
    fn test_source_args_rejects_bad_values() {
        assert!(source(&["--delimiter", "§"]).to_config().unwrap_err().is_configuration());
        assert!(source(&["--batch-size", "0"]).to_config().unwrap_err().is_configuration());
        assert!(source(&["--type", "id"]).to_config().unwrap_err().is_configuration());
    }
}
