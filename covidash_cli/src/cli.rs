use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use covidash::{
    aggregate,
    cases,
    config::{Config, OutputFormat},
    country_code::CountryCodeResolver,
    formatters::OutputFormatter,
    paths, sink, vaccination, Covidash,
};
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use polars::frame::DataFrame;
use spinners::{Spinner, Spinners};

use crate::display::{display_outputs, display_resolved, display_totals};
use crate::error::CovidashCliResult;

const DEFAULT_PROGRESS_SPINNER: Spinners = Spinners::Dots;
const COMPLETE_PROGRESS_STRING: &str = "✔";
const RUNNING_TAIL_STRING: &str = "...";

/// Run `f` behind a progress spinner unless `quiet` is set.
fn with_spinner<T>(quiet: bool, message: &str, f: impl FnOnce() -> T) -> T {
    let sp = (!quiet).then(|| {
        Spinner::with_timer(
            DEFAULT_PROGRESS_SPINNER,
            message.to_string() + RUNNING_TAIL_STRING,
        )
    });
    let result = f();
    if let Some(mut s) = sp {
        s.stop_with_symbol(COMPLETE_PROGRESS_STRING);
    }
    result
}

/// Trait that defines what to run when a given subcommand is invoked.
#[enum_dispatch]
pub trait RunCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()>;
}

/// The `run` command builds every table and writes them to the output directory.
#[derive(Args, Debug)]
pub struct RunPipelineCommand {
    #[arg(long, help = "Write a JSON report of the run to this file")]
    report: Option<PathBuf>,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for RunPipelineCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `run` subcommand");
        let covidash = Covidash::new_with_config(config)?;
        let report = with_spinner(self.quiet, "Fetching sources and building tables", || {
            covidash.run()
        })?;
        display_outputs(&report.outputs);
        display_totals(report.totals.as_ref());
        if let Some(report_path) = &self.report {
            let f = File::create(report_path)
                .with_context(|| format!("Failed to create '{}'", report_path.display()))?;
            serde_json::to_writer_pretty(f, &report)?;
        }
        Ok(())
    }
}

/// Options shared by the commands that build a single table.
#[derive(Args, Debug, Clone)]
pub struct TableOutputArgs {
    #[arg(short = 'o', long, help = "Output file, instead of the configured output directory")]
    output_file: Option<PathBuf>,
    #[arg(
        short = 'f',
        long,
        value_name = "csv|parquet",
        help = "Output format, instead of the configured one"
    )]
    output_format: Option<OutputFormat>,
}

impl TableOutputArgs {
    /// Apply the format override, then build the table with `build` and write it.
    fn write_table(
        &self,
        mut config: Config,
        stem: &str,
        quiet: bool,
        build: impl FnOnce(&Covidash) -> anyhow::Result<DataFrame>,
    ) -> CovidashCliResult<()> {
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        let covidash = Covidash::new_with_config(config)?;
        let mut df = with_spinner(quiet, &format!("Building {stem}"), || build(&covidash))?;
        debug!("{df:#?}");

        let path = self
            .output_file
            .clone()
            .unwrap_or_else(|| covidash.output_path(stem));
        let formatter: OutputFormatter = covidash.formatter();
        let written = sink::write(&mut df, &path, &formatter)?;
        display_outputs(&[written]);
        Ok(())
    }
}

/// The `cases` command merges the JHU time series into the case table.
#[derive(Args, Debug)]
pub struct CasesCommand {
    #[command(flatten)]
    output: TableOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for CasesCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `cases` subcommand");
        self.output.write_table(config, paths::CASES, self.quiet, |covidash| {
            Ok(cases::to_dataframe(&covidash.cases()?)?)
        })
    }
}

/// The `vaccinations` command builds the normalized vaccination table.
#[derive(Args, Debug)]
pub struct VaccinationsCommand {
    #[command(flatten)]
    output: TableOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for VaccinationsCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `vaccinations` subcommand");
        self.output
            .write_table(config, paths::VACCINATIONS, self.quiet, |covidash| {
                Ok(vaccination::to_dataframe(&covidash.vaccinations()?)?)
            })
    }
}

/// The `daily` command builds the daily cases and vaccinations table.
#[derive(Args, Debug)]
pub struct DailyCommand {
    #[command(flatten)]
    output: TableOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for DailyCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `daily` subcommand");
        self.output
            .write_table(config, paths::DAILY, self.quiet, |covidash| {
                let harmonized = covidash.harmonized(&covidash.vaccinations()?);
                Ok(aggregate::daily_to_dataframe(&covidash.daily(&harmonized)?)?)
            })
    }
}

/// The `summary` command builds the per-country summary table.
#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    output: TableOutputArgs,
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for SummaryCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `summary` subcommand");
        self.output
            .write_table(config, paths::SUMMARY, self.quiet, |covidash| {
                let harmonized = covidash.harmonized(&covidash.vaccinations()?);
                Ok(aggregate::summary_to_dataframe(&covidash.summary(&harmonized)?)?)
            })
    }
}

/// The `resolve` command looks names up in the ISO 3166-1 registry.
#[derive(Args, Debug)]
pub struct ResolveCommand {
    #[arg(required = true, help = "Country names or codes to resolve")]
    names: Vec<String>,
}

impl ResolveCommand {
    fn resolve(&self, covidash: &Covidash) -> Vec<(String, Option<String>)> {
        let mut resolver = CountryCodeResolver::new(&covidash.registry);
        self.names
            .iter()
            .map(|name| (name.clone(), resolver.resolve(name)))
            .collect()
    }
}

impl RunCommand for ResolveCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `resolve` subcommand");
        let covidash = Covidash::new_with_config(config)?;
        display_resolved(&self.resolve(&covidash));
        Ok(())
    }
}

/// The `totals` command prints global case totals at the latest date.
#[derive(Args, Debug)]
pub struct TotalsCommand {
    #[arg(from_global)]
    quiet: bool,
}

impl RunCommand for TotalsCommand {
    fn run(&self, config: Config) -> CovidashCliResult<()> {
        info!("Running `totals` subcommand");
        let covidash = Covidash::new_with_config(config)?;
        let cases = with_spinner(self.quiet, "Fetching case time series", || covidash.cases())?;
        display_totals(aggregate::global_totals(&cases).as_ref());
        Ok(())
    }
}

/// The entrypoint for the CLI.
#[derive(Parser, Debug)]
#[command(version, about="Covidash prepares COVID-19 case and vaccination tables for the dashboard", long_about = None, name="covidash")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to a TOML config file. Defaults to `covidash/config.toml` in the user config directory.",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[arg(
        short = 'q',
        long = "quiet",
        help = "\
            Do not print progress spinners to stdout. Results and logs (when `RUST_LOG`\n\
            is set) will still be printed.",
        global = true
    )]
    quiet: bool,
}

/// Commands contains the list of subcommands available for use in the CLI.
/// Each command should implement the RunCommand trait and specify the list
/// of required args for that command.
#[derive(Subcommand, Debug)]
#[enum_dispatch(RunCommand)]
pub enum Commands {
    /// Build every table and write them to the output directory
    Run(RunPipelineCommand),
    /// Build the merged case table
    Cases(CasesCommand),
    /// Build the normalized vaccination table
    Vaccinations(VaccinationsCommand),
    /// Build the daily cases and vaccinations table
    Daily(DailyCommand),
    /// Build the per-country summary table
    Summary(SummaryCommand),
    /// Resolve country names to ISO 3166-1 alpha-3 codes
    Resolve(ResolveCommand),
    /// Print global case totals at the latest date
    Totals(TotalsCommand),
}
