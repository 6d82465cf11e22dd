//! Typed readers for the worldometer summary and daily exports.

use chrono::NaiveDate;
use itertools::izip;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, EnumCount, EnumIter};

use crate::error::CovidashResult;
use crate::{frame, COL};

const SUMMARY_TABLE: &str = "worldometer summary";
const DAILY_TABLE: &str = "worldometer daily";

/// Numeric columns of the worldometer summary table, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SummaryFigure {
    TotalConfirmed,
    TotalDeaths,
    TotalRecovered,
    ActiveCases,
    SeriousOrCritical,
    #[strum(serialize = "total_cases_per_1m_population")]
    TotalCasesPer1mPopulation,
    #[strum(serialize = "total_deaths_per_1m_population")]
    TotalDeathsPer1mPopulation,
    TotalTests,
    #[strum(serialize = "total_tests_per_1m_population")]
    TotalTestsPer1mPopulation,
    Population,
}

/// One row of the worldometer summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub continent: Option<String>,
    pub figures: [Option<f64>; SummaryFigure::COUNT],
}

impl CountrySummary {
    pub fn get(&self, figure: SummaryFigure) -> Option<f64> {
        self.figures[figure as usize]
    }
}

/// One row of the worldometer daily table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCaseRecord {
    pub country: String,
    /// `None` when the source date is not `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    pub daily_new_cases: Option<f64>,
    pub cumulative_total_cases: Option<f64>,
    pub cumulative_total_deaths: Option<f64>,
    pub active_cases: Option<f64>,
}

pub fn read_summary(df: &DataFrame) -> CovidashResult<Vec<CountrySummary>> {
    let countries = frame::str_values(df, COL::COUNTRY, SUMMARY_TABLE)?;
    let continents = frame::optional_str_values(df, COL::CONTINENT)?;
    let figure_columns = SummaryFigure::iter()
        .map(|figure| frame::optional_f64_values(df, figure.as_ref()))
        .collect::<CovidashResult<Vec<_>>>()?;

    let summaries: Vec<_> = countries
        .into_iter()
        .zip(continents)
        .enumerate()
        .map(|(row, (country, continent))| {
            let mut figures = [None; SummaryFigure::COUNT];
            for (slot, column) in figures.iter_mut().zip(&figure_columns) {
                *slot = column[row];
            }
            CountrySummary {
                country: country.unwrap_or_default(),
                continent,
                figures,
            }
        })
        .collect();
    debug!("Read {} worldometer summary rows", summaries.len());
    Ok(summaries)
}

pub fn read_daily(df: &DataFrame) -> CovidashResult<Vec<DailyCaseRecord>> {
    let records: Vec<_> = izip!(
        frame::str_values(df, COL::COUNTRY, DAILY_TABLE)?,
        frame::str_values(df, COL::DAILY_DATE, DAILY_TABLE)?,
        frame::f64_values(df, COL::DAILY_NEW_CASES, DAILY_TABLE)?,
        frame::f64_values(df, COL::CUMULATIVE_TOTAL_CASES, DAILY_TABLE)?,
        frame::f64_values(df, COL::CUMULATIVE_TOTAL_DEATHS, DAILY_TABLE)?,
        frame::f64_values(df, COL::ACTIVE_CASES, DAILY_TABLE)?,
    )
    .map(
        |(country, date, daily_new_cases, cumulative_total_cases, cumulative_total_deaths, active_cases)| {
            DailyCaseRecord {
                country: country.unwrap_or_default(),
                date: date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
                daily_new_cases,
                cumulative_total_cases,
                cumulative_total_deaths,
                active_cases,
            }
        },
    )
    .collect();
    let undated = records.iter().filter(|r| r.date.is_none()).count();
    if undated > 0 {
        debug!("{undated} worldometer daily rows have no usable date");
    }
    Ok(records)
}
