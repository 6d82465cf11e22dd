//! Merging of the confirmed/deaths/recovered time series into case records.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::NaiveDate;
use itertools::Itertools;
use log::{info, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::country_code::CountryCodeResolver;
use crate::reshape::TimeSeriesRecord;
use crate::COL;

/// Formats the JHU headers are published in, tried in order.
const SOURCE_DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// A calendar date parsed from a source, or the raw text when it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordDate {
    Valid(NaiveDate),
    Invalid(String),
}

impl RecordDate {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        SOURCE_DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .map(RecordDate::Valid)
            .unwrap_or_else(|| RecordDate::Invalid(raw.to_string()))
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RecordDate::Valid(date) => Some(*date),
            RecordDate::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, RecordDate::Valid(_))
    }
}

impl Display for RecordDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordDate::Valid(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            RecordDate::Invalid(raw) => write!(f, "invalid({raw})"),
        }
    }
}

/// Confirmed, deaths and recovered counts for one location on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub sub_region: Option<String>,
    pub region: String,
    pub date: RecordDate,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub confirmed: f64,
    pub deaths: f64,
    pub recovered: f64,
    pub iso_code: Option<String>,
    /// `confirmed - deaths - recovered`. Negative values from source revisions are kept.
    pub active: f64,
}

/// Join key shared by the three metric tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JoinKey<'a> {
    sub_region: Option<&'a str>,
    region: &'a str,
    date: &'a str,
    latitude: Option<u64>,
    longitude: Option<u64>,
}

/// Bit pattern of a coordinate with `-0.0` folded into `0.0` so both compare equal.
fn coordinate_bits(value: Option<f64>) -> Option<u64> {
    value.map(|v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
}

impl<'a> From<&'a TimeSeriesRecord> for JoinKey<'a> {
    fn from(record: &'a TimeSeriesRecord) -> Self {
        Self {
            sub_region: record.sub_region.as_deref(),
            region: &record.region,
            date: &record.date,
            latitude: coordinate_bits(record.latitude),
            longitude: coordinate_bits(record.longitude),
        }
    }
}

/// Values of one right-hand table grouped by join key, in source order.
fn index_by_key(records: &[TimeSeriesRecord]) -> HashMap<JoinKey<'_>, Vec<Option<f64>>> {
    let mut index: HashMap<JoinKey<'_>, Vec<Option<f64>>> = HashMap::new();
    for record in records {
        index.entry(record.into()).or_default().push(record.value);
    }
    index
}

/// Values to join for `key`. No match contributes a single missing value, so the left row is
/// kept exactly once; duplicate right-hand keys fan out like a relational left join.
fn matches<'a, 'k>(
    index: &'a HashMap<JoinKey<'k>, Vec<Option<f64>>>,
    key: &JoinKey<'k>,
) -> &'a [Option<f64>] {
    index.get(key).map(Vec::as_slice).unwrap_or(&[None])
}

/// Left-join deaths and recovered onto confirmed, zero-filling every missing count, then derive
/// `active` and the ISO code of each region.
pub fn merge(
    confirmed: &[TimeSeriesRecord],
    deaths: &[TimeSeriesRecord],
    recovered: &[TimeSeriesRecord],
    resolver: &mut CountryCodeResolver<'_>,
) -> Vec<CaseRecord> {
    let deaths_index = index_by_key(deaths);
    let recovered_index = index_by_key(recovered);
    let mut parsed_dates: HashMap<&str, RecordDate> = HashMap::new();

    let mut records = Vec::with_capacity(confirmed.len());
    for row in confirmed {
        let key = JoinKey::from(row);
        let date = parsed_dates
            .entry(row.date.as_str())
            .or_insert_with(|| RecordDate::parse(&row.date))
            .clone();
        let iso_code = resolver.resolve(&row.region);
        let confirmed = row.value.unwrap_or(0.0);
        for death in matches(&deaths_index, &key) {
            for recovery in matches(&recovered_index, &key) {
                let deaths = death.unwrap_or(0.0);
                let recovered = recovery.unwrap_or(0.0);
                records.push(CaseRecord {
                    sub_region: row.sub_region.clone(),
                    region: row.region.clone(),
                    date: date.clone(),
                    latitude: row.latitude,
                    longitude: row.longitude,
                    confirmed,
                    deaths,
                    recovered,
                    iso_code: iso_code.clone(),
                    active: confirmed - deaths - recovered,
                });
            }
        }
    }

    let invalid_dates = parsed_dates.values().filter(|d| !d.is_valid()).collect_vec();
    if !invalid_dates.is_empty() {
        warn!(
            "{} date column(s) could not be parsed and are marked invalid: {:?}",
            invalid_dates.len(),
            invalid_dates
        );
    }
    info!(
        "Merged {} case records ({} of {} regions without ISO code)",
        records.len(),
        resolver.unresolved(),
        resolver.distinct_lookups()
    );
    records
}

/// Case table with the column layout the dashboard reads. Invalid dates are written as nulls.
pub fn to_dataframe(records: &[CaseRecord]) -> PolarsResult<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            COL::PROVINCE_STATE,
            records.iter().map(|r| r.sub_region.clone()).collect_vec(),
        ),
        Series::new(
            COL::COUNTRY_REGION,
            records.iter().map(|r| r.region.clone()).collect_vec(),
        ),
        Series::new(
            COL::DATE,
            records
                .iter()
                .map(|r| r.date.as_date().map(|d| d.format("%Y-%m-%d").to_string()))
                .collect_vec(),
        ),
        Series::new(COL::LAT, records.iter().map(|r| r.latitude).collect_vec()),
        Series::new(COL::LONG, records.iter().map(|r| r.longitude).collect_vec()),
        Series::new(COL::CONFIRMED, records.iter().map(|r| r.confirmed).collect_vec()),
        Series::new(COL::DEATHS, records.iter().map(|r| r.deaths).collect_vec()),
        Series::new(COL::RECOVERED, records.iter().map(|r| r.recovered).collect_vec()),
        Series::new(
            COL::ISO_CODE,
            records.iter().map(|r| r.iso_code.clone()).collect_vec(),
        ),
        Series::new(COL::ACTIVE, records.iter().map(|r| r.active).collect_vec()),
    ])
}
