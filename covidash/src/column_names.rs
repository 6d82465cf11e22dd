//! This module stores the column names of both the upstream source tables and the tables the
//! pipeline writes out. Source names must be kept in sync with the upstream datasets (JHU CSSE
//! time series, OWID vaccinations and worldometer exports); output names are what the dashboard
//! pages read back.

// JHU CSSE time series (wide). Every other column is a date.
pub const PROVINCE_STATE: &str = "Province/State";
pub const COUNTRY_REGION: &str = "Country/Region";
pub const LAT: &str = "Lat";
pub const LONG: &str = "Long";

// Case table
pub const DATE: &str = "Date";
pub const CONFIRMED: &str = "Confirmed";
pub const DEATHS: &str = "Deaths";
pub const RECOVERED: &str = "Recovered";
pub const ACTIVE: &str = "Active";
pub const ISO_CODE: &str = "iso_code";

// OWID vaccinations / locations
pub const LOCATION: &str = "location";
pub const VACCINATION_DATE: &str = "date";
pub const DAILY_VACCINATIONS_RAW: &str = "daily_vaccinations_raw";
pub const VACCINES: &str = "vaccines";
pub const LAST_OBSERVATION_DATE: &str = "last_observation_date";
pub const SOURCE_NAME: &str = "source_name";
pub const SOURCE_WEBSITE: &str = "source_website";

// Worldometer summary / daily
pub const COUNTRY: &str = "country";
pub const DAILY_DATE: &str = "date";
pub const CONTINENT: &str = "continent";
pub const DAILY_NEW_CASES: &str = "daily_new_cases";
pub const CUMULATIVE_TOTAL_CASES: &str = "cumulative_total_cases";
pub const CUMULATIVE_TOTAL_DEATHS: &str = "cumulative_total_deaths";
pub const ACTIVE_CASES: &str = "active_cases";

// Derived summary columns
pub const VACCINATED_PERCENT: &str = "vaccinated_percent";
pub const TESTED_POSITIVE: &str = "tested_positive";

// Daily rollup
pub const DAILY_VACCINATIONS: &str = "daily_vaccinations";
pub const TOTAL_VACCINATIONS: &str = "total_vaccinations";

// Embedded ISO 3166-1 registry
pub const ALPHA_2: &str = "alpha_2";
pub const ALPHA_3: &str = "alpha_3";
pub const NUMERIC: &str = "numeric";
pub const NAME: &str = "name";
pub const OFFICIAL_NAME: &str = "official_name";
pub const COMMON_NAME: &str = "common_name";
