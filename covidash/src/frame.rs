//! Helpers for pulling typed columns out of loosely-typed CSV `DataFrame`s.
//!
//! Source CSVs are read with schema inference, so the same column may come back as an integer,
//! float or string column depending on its contents. These helpers cast before extracting.

use polars::prelude::*;

use crate::error::{CovidashError, CovidashResult};

/// Look up a column, reporting which table it was missing from.
pub fn require_column<'a>(df: &'a DataFrame, column: &str, table: &str) -> CovidashResult<&'a Series> {
    df.column(column).map_err(|_| CovidashError::MissingColumn {
        column: column.to_string(),
        table: table.to_string(),
    })
}

pub fn has_column(df: &DataFrame, column: &str) -> bool {
    df.get_columns().iter().any(|s| s.name() == column)
}

/// Values of `column` as owned strings. Nulls stay `None`.
pub fn str_values(df: &DataFrame, column: &str, table: &str) -> CovidashResult<Vec<Option<String>>> {
    let series = require_column(df, column, table)?.cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Values of `column` as floats. Nulls and unparsable cells are `None`.
pub fn f64_values(df: &DataFrame, column: &str, table: &str) -> CovidashResult<Vec<Option<f64>>> {
    series_f64_values(require_column(df, column, table)?)
}

/// Like [`f64_values`] but a missing column yields an all-`None` vector.
pub fn optional_f64_values(df: &DataFrame, column: &str) -> CovidashResult<Vec<Option<f64>>> {
    match df.column(column) {
        Ok(series) => series_f64_values(series),
        Err(_) => Ok(vec![None; df.height()]),
    }
}

/// Like [`str_values`] but a missing column yields an all-`None` vector.
pub fn optional_str_values(df: &DataFrame, column: &str) -> CovidashResult<Vec<Option<String>>> {
    if has_column(df, column) {
        str_values(df, column, "")
    } else {
        Ok(vec![None; df.height()])
    }
}

pub fn series_f64_values(series: &Series) -> CovidashResult<Vec<Option<f64>>> {
    let series = series.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn values_should_be_cast_from_inferred_types() {
        let df = df!(
            "ints" => [Some(1i64), None, Some(3)],
            "strs" => ["a", "b", "c"],
        )
        .unwrap();
        assert_eq!(
            f64_values(&df, "ints", "test").unwrap(),
            vec![Some(1.0), None, Some(3.0)]
        );
        assert_eq!(
            str_values(&df, "ints", "test").unwrap(),
            vec![Some("1".to_string()), None, Some("3".to_string())]
        );
    }

    #[test]
    fn missing_columns() {
        let df = df!("a" => [1.0f64, 2.0]).unwrap();
        let err = f64_values(&df, "b", "fixture").unwrap_err();
        assert!(matches!(err, CovidashError::MissingColumn { .. }));
        assert_eq!(optional_f64_values(&df, "b").unwrap(), vec![None, None]);
        assert_eq!(optional_str_values(&df, "b").unwrap(), vec![None, None]);
        assert!(has_column(&df, "a"));
    }
}
