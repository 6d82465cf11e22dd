//! Normalization of the OWID vaccination series.
//!
//! The per-day series is inner-joined with the per-location metadata, `location` becomes
//! `country`, and every numeric metric is forward-filled within its own country before any
//! remaining gaps are zero-filled.

use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::{izip, Itertools};
use log::{debug, info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{AsRefStr, EnumCount, EnumIter};

use crate::error::{CovidashError, CovidashResult};
use crate::{frame, COL};

const VACCINATION_TABLE: &str = "vaccinations";
const JOINED_TABLE: &str = "vaccinations joined with locations";
const ROW_INDEX: &str = "__row";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Numeric vaccination metrics, in output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum VaccinationMetric {
    TotalVaccinations,
    PeopleVaccinated,
    PeopleFullyVaccinated,
    TotalBoosters,
    DailyVaccinations,
    TotalVaccinationsPerHundred,
    PeopleVaccinatedPerHundred,
    PeopleFullyVaccinatedPerHundred,
    TotalBoostersPerHundred,
    DailyVaccinationsPerMillion,
    DailyPeopleVaccinated,
    DailyPeopleVaccinatedPerHundred,
}

impl VaccinationMetric {
    fn index(self) -> usize {
        self as usize
    }
}

/// One country-day of vaccination data after normalization. No metric is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub country: String,
    pub iso_code: String,
    pub date: NaiveDate,
    pub metrics: [f64; VaccinationMetric::COUNT],
    /// Comma-separated vaccine names.
    pub vaccines: String,
    pub last_observation_date: Option<String>,
    pub source_name: Option<String>,
    pub source_website: Option<String>,
}

impl VaccinationRecord {
    pub fn get(&self, metric: VaccinationMetric) -> f64 {
        self.metrics[metric.index()]
    }
}

/// A joined row before filling.
struct RawRow {
    country: String,
    iso_code: String,
    date: NaiveDate,
    metrics: [Option<f64>; VaccinationMetric::COUNT],
    vaccines: Option<String>,
    last_observation_date: Option<String>,
    source_name: Option<String>,
    source_website: Option<String>,
}

/// Inner join of `series` and `locations` on (location, iso_code), in `series` row order.
fn join_locations(series: &DataFrame, locations: &DataFrame) -> CovidashResult<DataFrame> {
    for (df, table) in [(series, VACCINATION_TABLE), (locations, "vaccination locations")] {
        frame::require_column(df, COL::LOCATION, table)?;
        frame::require_column(df, COL::ISO_CODE, table)?;
    }
    let keys = [
        col(COL::LOCATION).cast(DataType::String),
        col(COL::ISO_CODE).cast(DataType::String),
    ];
    let mut series_lf = series.clone().lazy();
    if frame::has_column(series, COL::DAILY_VACCINATIONS_RAW) {
        series_lf = series_lf.drop([COL::DAILY_VACCINATIONS_RAW]);
    }
    let joined = series_lf
        .with_row_index(ROW_INDEX, None)
        .with_columns(keys.clone())
        .join(
            locations.clone().lazy().with_columns(keys),
            [col(COL::LOCATION), col(COL::ISO_CODE)],
            [col(COL::LOCATION), col(COL::ISO_CODE)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([ROW_INDEX], SortMultipleOptions::default())
        .drop([ROW_INDEX])
        .collect()?;
    Ok(joined)
}

fn raw_rows(joined: &DataFrame) -> CovidashResult<Vec<RawRow>> {
    let countries = frame::str_values(joined, COL::LOCATION, JOINED_TABLE)?;
    let iso_codes = frame::str_values(joined, COL::ISO_CODE, JOINED_TABLE)?;
    let dates = frame::str_values(joined, COL::VACCINATION_DATE, JOINED_TABLE)?;

    let mut metric_columns = Vec::with_capacity(VaccinationMetric::COUNT);
    for metric in VaccinationMetric::iter() {
        if !frame::has_column(joined, metric.as_ref()) {
            warn!("Vaccination column '{}' is missing, treating it as empty", metric.as_ref());
        }
        metric_columns.push(frame::optional_f64_values(joined, metric.as_ref())?);
    }

    let vaccines = frame::optional_str_values(joined, COL::VACCINES)?;
    let last_observation_dates = frame::optional_str_values(joined, COL::LAST_OBSERVATION_DATE)?;
    let source_names = frame::optional_str_values(joined, COL::SOURCE_NAME)?;
    let source_websites = frame::optional_str_values(joined, COL::SOURCE_WEBSITE)?;

    izip!(
        countries,
        iso_codes,
        dates,
        vaccines,
        last_observation_dates,
        source_names,
        source_websites
    )
    .enumerate()
    .map(
        |(row, (country, iso_code, date, vaccines, last_observation_date, source_name, source_website))| {
            let country = country.unwrap_or_default();
            let raw_date = date.unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw_date.trim(), DATE_FORMAT).map_err(|_| {
                CovidashError::InvalidDate {
                    country: country.clone(),
                    value: raw_date.clone(),
                }
            })?;
            let mut metrics = [None; VaccinationMetric::COUNT];
            for (slot, column) in metrics.iter_mut().zip(&metric_columns) {
                *slot = column[row];
            }
            Ok(RawRow {
                country,
                iso_code: iso_code.unwrap_or_default(),
                date,
                metrics,
                vaccines,
                last_observation_date,
                source_name,
                source_website,
            })
        },
    )
    .collect()
}

/// Forward-fill then zero-fill the metrics of one country's rows, ordered by date.
fn fill_country(mut rows: Vec<RawRow>) -> Vec<VaccinationRecord> {
    rows.sort_by_key(|row| row.date);
    let mut last_seen = [None; VaccinationMetric::COUNT];
    rows.into_iter()
        .map(|row| {
            let mut metrics = [0.0; VaccinationMetric::COUNT];
            for (idx, value) in row.metrics.into_iter().enumerate() {
                if value.is_some() {
                    last_seen[idx] = value;
                }
                metrics[idx] = last_seen[idx].unwrap_or(0.0);
            }
            VaccinationRecord {
                country: row.country,
                iso_code: row.iso_code,
                date: row.date,
                metrics,
                vaccines: row.vaccines.unwrap_or_default(),
                last_observation_date: row.last_observation_date,
                source_name: row.source_name,
                source_website: row.source_website,
            }
        })
        .collect()
}

/// Join the vaccination `series` with the `locations` metadata and fill every gap within each
/// country. Rows without matching metadata are dropped. Countries keep the order in which they
/// first appear in `series`.
pub fn normalize(series: &DataFrame, locations: &DataFrame) -> CovidashResult<Vec<VaccinationRecord>> {
    let joined = join_locations(series, locations)?;
    let dropped = series.height().saturating_sub(joined.height());
    if dropped > 0 {
        info!("Dropped {dropped} vaccination rows with no matching location metadata");
    }

    // Fill state is scoped to one country's group
    let mut group_of: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<RawRow>> = Vec::new();
    for row in raw_rows(&joined)? {
        let idx = *group_of.entry(row.country.clone()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(row);
    }
    debug!("Normalizing vaccinations for {} countries", groups.len());

    Ok(groups.into_iter().flat_map(fill_country).collect())
}

/// Vaccination table with `country` first, then the metrics and location metadata.
pub fn to_dataframe(records: &[VaccinationRecord]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Series::new(COL::COUNTRY, records.iter().map(|r| r.country.as_str()).collect_vec()),
        Series::new(COL::ISO_CODE, records.iter().map(|r| r.iso_code.as_str()).collect_vec()),
        Series::new(
            COL::VACCINATION_DATE,
            records
                .iter()
                .map(|r| r.date.format(DATE_FORMAT).to_string())
                .collect_vec(),
        ),
    ];
    for metric in VaccinationMetric::iter() {
        columns.push(Series::new(
            metric.as_ref(),
            records.iter().map(|r| r.get(metric)).collect_vec(),
        ));
    }
    columns.extend([
        Series::new(COL::VACCINES, records.iter().map(|r| r.vaccines.as_str()).collect_vec()),
        Series::new(
            COL::LAST_OBSERVATION_DATE,
            records.iter().map(|r| r.last_observation_date.clone()).collect_vec(),
        ),
        Series::new(
            COL::SOURCE_NAME,
            records.iter().map(|r| r.source_name.clone()).collect_vec(),
        ),
        Series::new(
            COL::SOURCE_WEBSITE,
            records.iter().map(|r| r.source_website.clone()).collect_vec(),
        ),
    ]);
    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    fn locations() -> DataFrame {
        df!(
            COL::LOCATION => ["Alpha", "Beta"],
            COL::ISO_CODE => ["AAA", "BBB"],
            COL::VACCINES => ["Pfizer/BioNTech, Moderna", "Sinovac"],
            COL::LAST_OBSERVATION_DATE => ["2021-01-04", "2021-01-04"],
            COL::SOURCE_NAME => ["Ministry of Health", "Government"],
            COL::SOURCE_WEBSITE => ["https://alpha.example", "https://beta.example"],
        )
        .unwrap()
    }

    fn daily(records: &[VaccinationRecord], country: &str) -> Vec<f64> {
        records
            .iter()
            .filter(|r| r.country == country)
            .map(|r| r.get(VaccinationMetric::TotalVaccinations))
            .collect()
    }

    #[test]
    fn forward_fill_never_crosses_countries() {
        // Rows for both countries interleaved and out of date order
        let series = df!(
            COL::LOCATION => ["Beta", "Alpha", "Beta", "Alpha", "Alpha", "Beta"],
            COL::ISO_CODE => ["BBB", "AAA", "BBB", "AAA", "AAA", "BBB"],
            COL::VACCINATION_DATE => [
                "2021-01-02", "2021-01-03", "2021-01-01", "2021-01-01", "2021-01-02", "2021-01-03"
            ],
            "total_vaccinations" => [Some(500.0f64), None, None, Some(10.0), None, None],
        )
        .unwrap();

        let records = normalize(&series, &locations()).unwrap();
        assert_eq!(records.len(), 6);
        // Beta has no value on its first date: zero, not Alpha's 10
        assert_eq!(daily(&records, "Beta"), vec![0.0, 500.0, 500.0]);
        assert_eq!(daily(&records, "Alpha"), vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn interleaving_does_not_change_a_countrys_values() {
        let alpha_only = df!(
            COL::LOCATION => ["Alpha", "Alpha", "Alpha"],
            COL::ISO_CODE => ["AAA", "AAA", "AAA"],
            COL::VACCINATION_DATE => ["2021-01-01", "2021-01-02", "2021-01-03"],
            "total_vaccinations" => [None, Some(3.0f64), None],
            "people_vaccinated" => [Some(1.0f64), None, None],
        )
        .unwrap();
        let interleaved = df!(
            COL::LOCATION => ["Beta", "Alpha", "Beta", "Alpha", "Beta", "Alpha"],
            COL::ISO_CODE => ["BBB", "AAA", "BBB", "AAA", "BBB", "AAA"],
            COL::VACCINATION_DATE => [
                "2021-01-01", "2021-01-01", "2021-01-02", "2021-01-02", "2021-01-03", "2021-01-03"
            ],
            "total_vaccinations" => [Some(99.0f64), None, Some(98.0), Some(3.0), Some(97.0), None],
            "people_vaccinated" => [Some(42.0f64), Some(1.0), None, None, Some(41.0), None],
        )
        .unwrap();

        let alone = normalize(&alpha_only, &locations()).unwrap();
        let mixed = normalize(&interleaved, &locations())
            .unwrap()
            .into_iter()
            .filter(|r| r.country == "Alpha")
            .collect_vec();
        assert_eq!(alone, mixed);
        assert_eq!(
            alone
                .iter()
                .map(|r| r.get(VaccinationMetric::PeopleVaccinated))
                .collect_vec(),
            vec![1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn unmatched_rows_are_dropped_and_location_becomes_country() {
        let series = df!(
            COL::LOCATION => ["Alpha", "Gamma", "Beta"],
            COL::ISO_CODE => ["AAA", "GGG", "XXX"],
            COL::VACCINATION_DATE => ["2021-01-01", "2021-01-01", "2021-01-01"],
            COL::DAILY_VACCINATIONS_RAW => [Some(1.0f64), None, None],
            "daily_vaccinations" => [Some(5.0f64), Some(6.0), Some(7.0)],
        )
        .unwrap();

        let records = normalize(&series, &locations()).unwrap();
        assert_eq!(records.len(), 1);
        let alpha = &records[0];
        assert_eq!(alpha.country, "Alpha");
        assert_eq!(alpha.iso_code, "AAA");
        assert_eq!(alpha.vaccines, "Pfizer/BioNTech, Moderna");
        assert_eq!(alpha.get(VaccinationMetric::DailyVaccinations), 5.0);
        assert_eq!(alpha.get(VaccinationMetric::TotalBoosters), 0.0, "absent columns are zero");

        let df = to_dataframe(&records).unwrap();
        let names = df.get_column_names();
        assert_eq!(&names[..4], &["country", "iso_code", "date", "total_vaccinations"]);
        assert!(!names.contains(&COL::DAILY_VACCINATIONS_RAW));
        assert!(!names.contains(&COL::LOCATION));
        assert_eq!(df.width(), 3 + VaccinationMetric::COUNT + 4);
    }

    #[test]
    fn unparsable_dates_are_fatal() {
        let series = df!(
            COL::LOCATION => ["Alpha"],
            COL::ISO_CODE => ["AAA"],
            COL::VACCINATION_DATE => ["01/02/2021"],
        )
        .unwrap();
        let err = normalize(&series, &locations()).unwrap_err();
        assert!(matches!(err, CovidashError::InvalidDate { .. }), "{err}");
    }

    #[test]
    fn metric_names_match_source_columns() {
        assert_eq!(VaccinationMetric::TotalVaccinations.as_ref(), "total_vaccinations");
        assert_eq!(
            VaccinationMetric::DailyVaccinationsPerMillion.as_ref(),
            "daily_vaccinations_per_million"
        );
        assert_eq!(
            VaccinationMetric::iter().last(),
            Some(VaccinationMetric::DailyPeopleVaccinatedPerHundred)
        );
    }
}
