#[derive(thiserror::Error, Debug)]
pub enum CovidashCliError {
    #[error("Anyhow error: {0:#}")]
    Anyhow(#[from] anyhow::Error),
    #[error("serde JSON error")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("TOML error in config file: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("std IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type CovidashCliResult<T> = Result<T, CovidashCliError>;
