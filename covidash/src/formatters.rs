use anyhow::Result;
use enum_dispatch::enum_dispatch;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::io::Write;

use crate::config::OutputFormat;

/// Trait to define different output generators. Defines `save`, which writes the `DataFrame`
/// to a writer, `format`, which renders it to a string, and the file extension outputs in this
/// format should carry.
#[enum_dispatch]
pub trait OutputGenerator {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()>;
    fn format(&self, df: &mut DataFrame) -> Result<String> {
        // Just creating an empty vec to store the buffered output
        let mut data: Vec<u8> = vec![];
        let mut buff = Cursor::new(&mut data);
        self.save(&mut buff, df)?;

        Ok(String::from_utf8(data)?)
    }
    fn extension(&self) -> &'static str;
}

/// Enum of OutputFormatters one for each potential
/// output type
#[enum_dispatch(OutputGenerator)]
#[derive(Serialize, Deserialize, Debug)]
pub enum OutputFormatter {
    Csv(CSVFormatter),
    Parquet(ParquetFormatter),
}

impl From<OutputFormat> for OutputFormatter {
    fn from(value: OutputFormat) -> Self {
        match value {
            OutputFormat::Csv => CSVFormatter.into(),
            OutputFormat::Parquet => ParquetFormatter.into(),
        }
    }
}

/// Format the results as a CSV file with a header row. Nulls are written as empty cells.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CSVFormatter;

impl OutputGenerator for CSVFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        CsvWriter::new(writer).include_header(true).finish(df)?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

/// Format the results as a zstd-compressed parquet file
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ParquetFormatter;

impl OutputGenerator for ParquetFormatter {
    fn save(&self, writer: &mut impl Write, df: &mut DataFrame) -> Result<()> {
        ParquetWriter::new(writer)
            .with_compression(ParquetCompression::Zstd(None))
            .finish(df)?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "parquet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df() -> DataFrame {
        df!(
             "country" => &["USA", "Viet Nam", "Chile"],
             "daily_vaccinations" => &[Some(2.0), None, Some(4.5)],
             "vaccines" => &["Moderna, Pfizer/BioNTech", "AstraZeneca", "Sinovac"],
        )
        .unwrap()
    }

    #[test]
    fn csv_formatter_should_work() {
        let formatter = CSVFormatter;
        let mut df = test_df();
        let output = formatter.format(&mut df);
        let correct_str = [
            "country,daily_vaccinations,vaccines",
            "USA,2.0,\"Moderna, Pfizer/BioNTech\"",
            "Viet Nam,,AstraZeneca",
            "Chile,4.5,Sinovac",
            "",
        ]
        .join("\n");
        assert!(output.is_ok(), "Output should not error");
        assert_eq!(output.unwrap(), correct_str, "Output should be correct");
    }

    #[test]
    fn parquet_formatter_should_round_trip() {
        let formatter = ParquetFormatter;
        let mut df = test_df();
        let mut data: Vec<u8> = vec![];
        formatter.save(&mut data, &mut df).unwrap();

        let read = ParquetReader::new(Cursor::new(data)).finish().unwrap();
        assert!(read.equals_missing(&df), "expected:\n{df}\ngot:\n{read}");
    }

    #[test]
    fn formatter_follows_configured_format() {
        let csv: OutputFormatter = OutputFormat::Csv.into();
        let parquet: OutputFormatter = OutputFormat::Parquet.into();
        assert_eq!(csv.extension(), "csv");
        assert_eq!(parquet.extension(), "parquet");
    }
}
