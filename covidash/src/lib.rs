use std::path::PathBuf;

use aggregate::{DailyRecord, GlobalTotals, SummaryRecord};
use anyhow::{Context, Result};
use cases::CaseRecord;
use country_code::{CountryCodeResolver, CountryRegistry};
use formatters::{OutputFormatter, OutputGenerator};
use harmonize::CountryNameMap;
use log::{debug, info};
use polars::frame::DataFrame;
use serde::Serialize;
use sink::WrittenOutput;
use vaccination::VaccinationRecord;

use crate::config::Config;

// Re-exports
pub use column_names as COL;

// Modules
pub mod aggregate;
pub mod cases;
pub mod column_names;
pub mod config;
pub mod country_code;
pub mod error;
pub mod formatters;
pub mod frame;
pub mod harmonize;
pub mod reshape;
pub mod sink;
pub mod source;
pub mod vaccination;
pub mod worldometer;

/// File stems of the tables the pipeline writes. The extension follows the output format.
pub mod paths {
    pub const CASES: &str = "covid";
    pub const VACCINATIONS: &str = "df_vaccine";
    pub const SUMMARY: &str = "summary_df";
    pub const DAILY: &str = "df_daily";
}

/// Type for the covidash preprocessing pipeline
pub struct Covidash {
    pub config: Config,
    pub registry: CountryRegistry,
}

/// Outcome of a full pipeline run
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub outputs: Vec<WrittenOutput>,
    pub totals: Option<GlobalTotals>,
}

impl Covidash {
    /// Setup the Covidash object with default configuration
    pub fn new() -> Result<Self> {
        Self::new_with_config(Config::default())
    }

    /// Setup the Covidash object with custom configuration
    pub fn new_with_config(config: Config) -> Result<Self> {
        debug!("config: {config:?}");
        let registry = CountryRegistry::embedded()?;
        Ok(Self { config, registry })
    }

    pub fn formatter(&self) -> OutputFormatter {
        self.config.output_format.into()
    }

    /// Destination of the table with file stem `stem` under the configured output directory
    pub fn output_path(&self, stem: &str) -> PathBuf {
        PathBuf::from(&self.config.output_dir).join(format!("{stem}.{}", self.formatter().extension()))
    }

    /// Fetch the three JHU time series, reshape and merge them into case records
    pub fn cases(&self) -> Result<Vec<CaseRecord>> {
        let sources = &self.config.sources;
        let confirmed = reshape::reshape(&source::read_csv(&sources.confirmed)?, COL::CONFIRMED)?;
        let deaths = reshape::reshape(&source::read_csv(&sources.deaths)?, COL::DEATHS)?;
        let recovered = reshape::reshape(&source::read_csv(&sources.recovered)?, COL::RECOVERED)?;

        let mut resolver = CountryCodeResolver::new(&self.registry);
        Ok(cases::merge(&confirmed, &deaths, &recovered, &mut resolver))
    }

    /// Fetch the OWID vaccination series and location metadata and normalize them
    pub fn vaccinations(&self) -> Result<Vec<VaccinationRecord>> {
        let sources = &self.config.sources;
        let series = source::read_csv(&sources.vaccinations)?;
        let locations = source::read_csv(&sources.vaccination_locations)?;
        vaccination::normalize(&series, &locations).context("Failed to normalize vaccinations")
    }

    /// Rewrite vaccination country names to the worldometer vocabulary
    pub fn harmonized(&self, vaccinations: &[VaccinationRecord]) -> Vec<VaccinationRecord> {
        harmonize::harmonize(vaccinations, &CountryNameMap::default())
    }

    /// Daily cross-metric table. `harmonized` must come from [`Covidash::harmonized`].
    pub fn daily(&self, harmonized: &[VaccinationRecord]) -> Result<Vec<DailyRecord>> {
        let daily = worldometer::read_daily(&source::read_csv(&self.config.sources.worldometer_daily)?)?;
        let (countries, dates) = aggregate::vaccination_coverage(harmonized);
        Ok(aggregate::daily_rollup(&daily, harmonized, &countries, &dates))
    }

    /// Per-country summary table. `harmonized` must come from [`Covidash::harmonized`].
    pub fn summary(&self, harmonized: &[VaccinationRecord]) -> Result<Vec<SummaryRecord>> {
        let summaries =
            worldometer::read_summary(&source::read_csv(&self.config.sources.worldometer_summary)?)?;
        Ok(aggregate::build_summary(&summaries, harmonized))
    }

    /// Build every table and persist them together. Either all outputs are replaced or none are.
    pub fn run(&self) -> Result<RunReport> {
        let cases = self.cases()?;
        let vaccinations = self.vaccinations()?;
        let harmonized = self.harmonized(&vaccinations);
        let daily = self.daily(&harmonized)?;
        let summary = self.summary(&harmonized)?;

        let outputs: Vec<(PathBuf, DataFrame)> = vec![
            (self.output_path(paths::CASES), cases::to_dataframe(&cases)?),
            (
                self.output_path(paths::VACCINATIONS),
                vaccination::to_dataframe(&vaccinations)?,
            ),
            (
                self.output_path(paths::SUMMARY),
                aggregate::summary_to_dataframe(&summary)?,
            ),
            (
                self.output_path(paths::DAILY),
                aggregate::daily_to_dataframe(&daily)?,
            ),
        ];
        let outputs = sink::write_all(outputs, &self.formatter())?;
        info!("Pipeline wrote {} tables", outputs.len());
        Ok(RunReport {
            outputs,
            totals: aggregate::global_totals(&cases),
        })
    }
}
