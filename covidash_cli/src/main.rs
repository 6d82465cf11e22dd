mod cli;
mod display;
mod error;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, RunCommand};
use covidash::config::Config;
use error::CovidashCliResult;
use log::debug;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config: Config = match &args.config {
        Some(path) => read_config_from_toml(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => read_default_config()?,
    };
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config)?;
    }
    Ok(())
}

fn read_config_from_toml(file_path: &Path) -> CovidashCliResult<Config> {
    debug!("Reading config from {}", file_path.display());
    let contents = std::fs::read_to_string(file_path)?;
    Ok(toml::from_str(&contents)?)
}

/// Config from the user config directory, or the defaults when there is none.
fn read_default_config() -> CovidashCliResult<Config> {
    // macOS: ~/Library/Application Support/covidash/config.toml
    let Some(file_path) = dirs::config_dir().map(|dir| dir.join("covidash").join("config.toml"))
    else {
        return Ok(Config::default());
    };
    if !file_path.exists() {
        return Ok(Config::default());
    }
    read_config_from_toml(&file_path)
}

#[cfg(test)]
mod tests {
    use covidash::config::OutputFormat;

    use crate::error::CovidashCliError;

    use super::*;

    #[test]
    fn config_file_should_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "output_format = \"parquet\"\n[sources]\nconfirmed = \"data/confirmed.csv\"\n",
        )
        .unwrap();

        let config = read_config_from_toml(&path).unwrap();
        assert_eq!(config.output_format, OutputFormat::Parquet);
        assert_eq!(config.sources.confirmed, "data/confirmed.csv");
        assert_eq!(config.output_dir, Config::default().output_dir);
    }

    #[test]
    fn missing_or_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_config_from_toml(&dir.path().join("absent.toml")),
            Err(CovidashCliError::IOError(_))
        ));

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "output_format = [").unwrap();
        assert!(matches!(
            read_config_from_toml(&path),
            Err(CovidashCliError::TomlError(_))
        ));
    }
}
