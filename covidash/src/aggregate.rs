//! Cross-source rollups: per-country maxima, the daily table and the summary table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};

use crate::cases::CaseRecord;
use crate::vaccination::{VaccinationMetric, VaccinationRecord};
use crate::worldometer::{CountrySummary, DailyCaseRecord, SummaryFigure};
use crate::COL;

/// Per-country maximum of `metric`.
pub fn aggregate_max(records: &[VaccinationRecord], metric: VaccinationMetric) -> BTreeMap<String, f64> {
    let mut maxima: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        let value = record.get(metric);
        maxima
            .entry(record.country.clone())
            .and_modify(|max| *max = max.max(value))
            .or_insert(value);
    }
    maxima
}

/// Countries and dates for which vaccination data exists.
pub fn vaccination_coverage(records: &[VaccinationRecord]) -> (BTreeSet<String>, BTreeSet<NaiveDate>) {
    let countries = records.iter().map(|r| r.country.clone()).collect();
    let dates = records.iter().map(|r| r.date).collect();
    (countries, dates)
}

/// One date of the daily cross-metric table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub daily_new_cases: f64,
    pub cumulative_total_cases: f64,
    pub cumulative_total_deaths: f64,
    pub active_cases: f64,
    /// `None` when no vaccination record exists for the date.
    pub daily_vaccinations: Option<f64>,
    pub total_vaccinations: Option<f64>,
}

/// Sum the daily case metrics over `countries` for every date in `dates`, then attach the sum
/// of daily and cumulative vaccinations on that date. Missing case values count as zero.
pub fn daily_rollup(
    cases: &[DailyCaseRecord],
    vaccinations: &[VaccinationRecord],
    countries: &BTreeSet<String>,
    dates: &BTreeSet<NaiveDate>,
) -> Vec<DailyRecord> {
    let mut case_sums: BTreeMap<NaiveDate, [f64; 4]> = BTreeMap::new();
    for case in cases {
        let Some(date) = case.date else { continue };
        if !dates.contains(&date) || !countries.contains(&case.country) {
            continue;
        }
        let sums = case_sums.entry(date).or_default();
        let values = [
            case.daily_new_cases,
            case.cumulative_total_cases,
            case.cumulative_total_deaths,
            case.active_cases,
        ];
        for (sum, value) in sums.iter_mut().zip(values) {
            *sum += value.unwrap_or(0.0);
        }
    }

    let mut vaccination_sums: HashMap<NaiveDate, (f64, f64)> = HashMap::new();
    for record in vaccinations {
        let sums = vaccination_sums.entry(record.date).or_default();
        sums.0 += record.get(VaccinationMetric::DailyVaccinations);
        sums.1 += record.get(VaccinationMetric::TotalVaccinations);
    }

    let rows: Vec<_> = case_sums
        .into_iter()
        .map(|(date, [daily_new_cases, cumulative_total_cases, cumulative_total_deaths, active_cases])| {
            let vaccinated = vaccination_sums.get(&date);
            DailyRecord {
                date,
                daily_new_cases,
                cumulative_total_cases,
                cumulative_total_deaths,
                active_cases,
                daily_vaccinations: vaccinated.map(|v| v.0),
                total_vaccinations: vaccinated.map(|v| v.1),
            }
        })
        .collect();
    info!(
        "Daily rollup: {} dates over {} countries with vaccination data",
        rows.len(),
        countries.len()
    );
    rows
}

/// A worldometer country summary enriched with vaccination aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub summary: CountrySummary,
    pub vaccines: Option<String>,
    /// Per-metric maximum over the country's vaccination series.
    pub maxima: [Option<f64>; VaccinationMetric::COUNT],
    /// `total_vaccinations / population * 100`
    pub vaccinated_percent: Option<f64>,
    /// `total_confirmed / total_tests * 100`
    pub tested_positive: Option<f64>,
}

impl SummaryRecord {
    pub fn max(&self, metric: VaccinationMetric) -> Option<f64> {
        self.maxima[metric as usize]
    }
}

/// `numerator / denominator * 100`, or `None` when either side is missing or the
/// denominator is zero.
fn percent(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d * 100.0).filter(|p| p.is_finite()),
        _ => None,
    }
}

/// Left join of `summaries` with the vaccination aggregates, keyed on country name. The
/// vaccination records must already be harmonized.
pub fn build_summary(summaries: &[CountrySummary], vaccinations: &[VaccinationRecord]) -> Vec<SummaryRecord> {
    let maxima = VaccinationMetric::iter()
        .map(|metric| aggregate_max(vaccinations, metric))
        .collect_vec();
    let mut vaccines: HashMap<&str, &str> = HashMap::new();
    for record in vaccinations {
        vaccines.entry(&record.country).or_insert(&record.vaccines);
    }

    let records: Vec<_> = summaries
        .iter()
        .map(|summary| {
            let mut country_maxima = [None; VaccinationMetric::COUNT];
            for (slot, by_country) in country_maxima.iter_mut().zip(&maxima) {
                *slot = by_country.get(&summary.country).copied();
            }
            let total_vaccinations = country_maxima[VaccinationMetric::TotalVaccinations as usize];
            SummaryRecord {
                vaccines: vaccines.get(summary.country.as_str()).map(|v| v.to_string()),
                maxima: country_maxima,
                vaccinated_percent: percent(
                    total_vaccinations,
                    summary.get(SummaryFigure::Population),
                ),
                tested_positive: percent(
                    summary.get(SummaryFigure::TotalConfirmed),
                    summary.get(SummaryFigure::TotalTests),
                ),
                summary: summary.clone(),
            }
        })
        .collect();
    let unmatched = records.iter().filter(|r| r.vaccines.is_none()).count();
    debug!("{unmatched} of {} summary countries have no vaccination data", records.len());
    records
}

/// Case totals across all locations on the latest valid date of the case table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTotals {
    pub date: NaiveDate,
    pub confirmed: f64,
    pub deaths: f64,
    pub recovered: f64,
    pub active: f64,
}

/// `None` when no case record has a valid date.
pub fn global_totals(cases: &[CaseRecord]) -> Option<GlobalTotals> {
    let latest = cases.iter().filter_map(|c| c.date.as_date()).max()?;
    let mut totals = GlobalTotals {
        date: latest,
        confirmed: 0.0,
        deaths: 0.0,
        recovered: 0.0,
        active: 0.0,
    };
    for case in cases.iter().filter(|c| c.date.as_date() == Some(latest)) {
        totals.confirmed += case.confirmed;
        totals.deaths += case.deaths;
        totals.recovered += case.recovered;
        totals.active += case.active;
    }
    Some(totals)
}

pub fn daily_to_dataframe(records: &[DailyRecord]) -> PolarsResult<DataFrame> {
    df!(
        COL::DAILY_DATE => records.iter().map(|r| r.date.format("%Y-%m-%d").to_string()).collect_vec(),
        COL::DAILY_NEW_CASES => records.iter().map(|r| r.daily_new_cases).collect_vec(),
        COL::CUMULATIVE_TOTAL_CASES => records.iter().map(|r| r.cumulative_total_cases).collect_vec(),
        COL::CUMULATIVE_TOTAL_DEATHS => records.iter().map(|r| r.cumulative_total_deaths).collect_vec(),
        COL::ACTIVE_CASES => records.iter().map(|r| r.active_cases).collect_vec(),
        COL::DAILY_VACCINATIONS => records.iter().map(|r| r.daily_vaccinations).collect_vec(),
        COL::TOTAL_VACCINATIONS => records.iter().map(|r| r.total_vaccinations).collect_vec(),
    )
}

/// Summary table: country, worldometer figures, vaccines, vaccination maxima, percentages.
pub fn summary_to_dataframe(records: &[SummaryRecord]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Series::new(
            COL::COUNTRY,
            records.iter().map(|r| r.summary.country.as_str()).collect_vec(),
        ),
        Series::new(
            COL::CONTINENT,
            records.iter().map(|r| r.summary.continent.clone()).collect_vec(),
        ),
    ];
    for figure in SummaryFigure::iter() {
        columns.push(Series::new(
            figure.as_ref(),
            records.iter().map(|r| r.summary.get(figure)).collect_vec(),
        ));
    }
    columns.push(Series::new(
        COL::VACCINES,
        records.iter().map(|r| r.vaccines.clone()).collect_vec(),
    ));
    for metric in VaccinationMetric::iter() {
        columns.push(Series::new(
            metric.as_ref(),
            records.iter().map(|r| r.max(metric)).collect_vec(),
        ));
    }
    columns.push(Series::new(
        COL::VACCINATED_PERCENT,
        records.iter().map(|r| r.vaccinated_percent).collect_vec(),
    ));
    columns.push(Series::new(
        COL::TESTED_POSITIVE,
        records.iter().map(|r| r.tested_positive).collect_vec(),
    ));
    DataFrame::new(columns)
}
