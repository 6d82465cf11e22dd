//! Loading of raw source tables from local files or remote CSV endpoints.

use std::io::Cursor;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::{debug, info};
use polars::prelude::*;

use crate::error::CovidashError;

/// Where a source table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(String),
    Path(PathBuf),
}

impl FromStr for SourceLocation {
    type Err = CovidashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CovidashError::InvalidSource("empty location".into()));
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else if s.contains("://") {
            Err(CovidashError::InvalidSource(format!(
                "unsupported scheme in '{s}'"
            )))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLocation::Url(url) => write!(f, "{url}"),
            SourceLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl SourceLocation {
    /// Blocking fetch of the raw bytes. Failures are returned to the caller as-is, there is no
    /// retry here.
    pub fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            SourceLocation::Url(url) => {
                info!("Fetching {url}");
                let response = reqwest::blocking::get(url)
                    .with_context(|| format!("Failed to request '{url}'"))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(CovidashError::FailedFetch {
                        url: url.clone(),
                        status: status.as_u16(),
                    }
                    .into());
                }
                Ok(response
                    .bytes()
                    .with_context(|| format!("Failed to read body of '{url}'"))?
                    .to_vec())
            }
            SourceLocation::Path(path) => {
                info!("Reading {}", path.display());
                std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))
            }
        }
    }
}

/// Parse CSV bytes (with a header row) into a `DataFrame`. Column types are inferred from every
/// row, so a decimal appearing late in an integer-looking column widens it to a float.
pub fn csv_from_bytes(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Fetch and parse the CSV table at `location`.
pub fn read_csv(location: &str) -> Result<DataFrame> {
    let location: SourceLocation = location.parse()?;
    let df = csv_from_bytes(location.fetch()?)
        .with_context(|| format!("Failed to parse CSV from '{location}'"))?;
    debug!("Loaded '{location}' with shape {:?}", df.shape());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    #[test]
    fn locations_should_parse() {
        assert_eq!(
            "https://example.com/a.csv".parse::<SourceLocation>().unwrap(),
            SourceLocation::Url("https://example.com/a.csv".into())
        );
        assert_eq!(
            "data/a.csv".parse::<SourceLocation>().unwrap(),
            SourceLocation::Path("data/a.csv".into())
        );
        assert!("ftp://example.com/a.csv".parse::<SourceLocation>().is_err());
        assert!("  ".parse::<SourceLocation>().is_err());
    }

    #[test]
    fn read_csv_from_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(&path, "country,population\nUSA,331000000\nUK,67000000\n").unwrap();

        let df = read_csv(path.to_str().unwrap()).unwrap();
        assert_eq!(df.shape(), (2, 2));
    }

    #[test]
    fn late_decimals_widen_integer_columns() {
        let mut csv = String::from("location,iso_code,date,total_vaccinations\n");
        for i in 0..20_000 {
            csv.push_str(&format!("A,AAA,2021-01-01,{i}\n"));
        }
        csv.push_str("A,AAA,2021-01-02,1.5\n");

        let df = csv_from_bytes(csv.into_bytes()).unwrap();
        assert_eq!(df.height(), 20_001);
        let values = df.column("total_vaccinations").unwrap();
        assert_eq!(values.dtype(), &DataType::Float64);
        assert_eq!(values.f64().unwrap().get(20_000), Some(1.5));
    }

    #[test]
    fn read_csv_from_remote_endpoint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/vaccinations.csv");
            then.status(200)
                .header("content-type", "text/csv")
                .body("location,iso_code,date\nItaly,ITA,2021-01-01\n");
        });

        let df = read_csv(&server.url("/vaccinations.csv")).unwrap();
        mock.assert();
        assert_eq!(df.shape(), (1, 3));
        assert!(df.column("iso_code").is_ok());
    }

    #[test]
    fn failed_fetch_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.csv");
            then.status(404);
        });

        let err = read_csv(&server.url("/missing.csv")).unwrap_err();
        match err.downcast_ref::<CovidashError>() {
            Some(CovidashError::FailedFetch { status, .. }) => assert_eq!(*status, 404),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
