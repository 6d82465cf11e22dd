//! Wide-to-long reshaping of the JHU CSSE time series tables.
//!
//! The source tables have one row per (province/state, country/region, lat, long) and one
//! column per date holding a cumulative count. [`reshape`] unpivots every date column into one
//! [`TimeSeriesRecord`] per cell and [`pivot`] turns the records back into the wide layout.

use itertools::{izip, Itertools};
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::CovidashResult;
use crate::{frame, COL};

/// The identifier columns of a wide time-series table. Everything else is a date column.
pub const ID_COLUMNS: [&str; 4] = [COL::PROVINCE_STATE, COL::COUNTRY_REGION, COL::LAT, COL::LONG];

/// One cell of a wide time-series table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub region: String,
    pub sub_region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Date label exactly as it appears in the source header.
    pub date: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// Unpivot `wide` into one record per (entity, date) cell, tagged with `value_name`.
///
/// Output is ordered date-major (all entities for the first date column, then the next), the
/// same ordering a melt produces. No cell is dropped, including blank ones.
pub fn reshape(wide: &DataFrame, value_name: &str) -> CovidashResult<Vec<TimeSeriesRecord>> {
    let table = format!("{value_name} time series");
    let sub_regions = frame::str_values(wide, COL::PROVINCE_STATE, &table)?;
    let regions = frame::str_values(wide, COL::COUNTRY_REGION, &table)?;
    let lats = frame::f64_values(wide, COL::LAT, &table)?;
    let longs = frame::f64_values(wide, COL::LONG, &table)?;

    let date_columns = wide
        .get_columns()
        .iter()
        .filter(|s| !ID_COLUMNS.contains(&s.name()))
        .collect_vec();

    let mut records = Vec::with_capacity(wide.height() * date_columns.len());
    for date_column in date_columns {
        let date = date_column.name().to_string();
        let values = frame::series_f64_values(date_column)?;
        for (sub_region, region, lat, long, value) in
            izip!(&sub_regions, &regions, &lats, &longs, values)
        {
            records.push(TimeSeriesRecord {
                region: region.clone().unwrap_or_default(),
                sub_region: sub_region.clone(),
                latitude: *lat,
                longitude: *long,
                date: date.clone(),
                metric: value_name.to_string(),
                value,
            });
        }
    }
    debug!(
        "Reshaped {value_name}: {} rows x {} columns -> {} records",
        wide.height(),
        wide.width(),
        records.len()
    );
    Ok(records)
}

/// Rebuild the wide table from `records`. Entities and date columns keep their order of first
/// appearance; cells with no record are null.
pub fn pivot(records: &[TimeSeriesRecord]) -> PolarsResult<DataFrame> {
    let dates = records.iter().map(|r| r.date.as_str()).unique().collect_vec();
    let entities = records
        .iter()
        .map(EntityKey::from)
        .unique()
        .collect_vec();
    let entity_idx = entities
        .iter()
        .enumerate()
        .map(|(idx, key)| (key.clone(), idx))
        .collect::<std::collections::HashMap<_, _>>();
    let date_idx = dates
        .iter()
        .enumerate()
        .map(|(idx, date)| (*date, idx))
        .collect::<std::collections::HashMap<_, _>>();

    let mut cells: Vec<Vec<Option<f64>>> = vec![vec![None; entities.len()]; dates.len()];
    for record in records {
        let row = entity_idx[&EntityKey::from(record)];
        let column = date_idx[record.date.as_str()];
        cells[column][row] = record.value;
    }

    let mut columns = vec![
        Series::new(
            COL::PROVINCE_STATE,
            entities.iter().map(|e| e.sub_region.clone()).collect_vec(),
        ),
        Series::new(
            COL::COUNTRY_REGION,
            entities.iter().map(|e| e.region.clone()).collect_vec(),
        ),
        Series::new(
            COL::LAT,
            entities.iter().map(|e| e.latitude()).collect_vec(),
        ),
        Series::new(
            COL::LONG,
            entities.iter().map(|e| e.longitude()).collect_vec(),
        ),
    ];
    for (date, values) in dates.iter().zip(cells) {
        columns.push(Series::new(date, values));
    }
    DataFrame::new(columns)
}

/// Hashable identity of a wide-table row. Coordinates are compared bitwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    sub_region: Option<String>,
    region: String,
    latitude_bits: Option<u64>,
    longitude_bits: Option<u64>,
}

impl EntityKey {
    fn latitude(&self) -> Option<f64> {
        self.latitude_bits.map(f64::from_bits)
    }

    fn longitude(&self) -> Option<f64> {
        self.longitude_bits.map(f64::from_bits)
    }
}

impl From<&TimeSeriesRecord> for EntityKey {
    fn from(record: &TimeSeriesRecord) -> Self {
        Self {
            sub_region: record.sub_region.clone(),
            region: record.region.clone(),
            latitude_bits: record.latitude.map(f64::to_bits),
            longitude_bits: record.longitude.map(f64::to_bits),
        }
    }
}
