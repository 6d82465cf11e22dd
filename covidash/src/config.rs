use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

const JHU_BASE: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";
const OWID_BASE: &str =
    "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/vaccinations";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sources: SourceConfig,
    pub output_dir: String,
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sources: SourceConfig::default(),
            output_dir: "data".into(),
            output_format: OutputFormat::Csv,
        }
    }
}

/// Locations of every input table. Each entry is either a local path or an `http(s)://` URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub confirmed: String,
    pub deaths: String,
    pub recovered: String,
    pub vaccinations: String,
    pub vaccination_locations: String,
    pub worldometer_summary: String,
    pub worldometer_daily: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            confirmed: format!("{JHU_BASE}/time_series_covid19_confirmed_global.csv"),
            deaths: format!("{JHU_BASE}/time_series_covid19_deaths_global.csv"),
            recovered: format!("{JHU_BASE}/time_series_covid19_recovered_global.csv"),
            vaccinations: format!("{OWID_BASE}/vaccinations.csv"),
            vaccination_locations: format!("{OWID_BASE}/locations.csv"),
            // The worldometer exports are not published at a stable URL
            worldometer_summary: "data/worldometer_coronavirus_summary_data.csv".into(),
            worldometer_daily: "data/worldometer_coronavirus_daily_data.csv".into(),
        }
    }
}

/// Defines the file formats the pipeline can persist tables in.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
}
