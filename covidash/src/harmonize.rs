//! Reconciles OWID country spellings with the worldometer vocabulary.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::vaccination::VaccinationRecord;

/// OWID spelling -> worldometer spelling.
const RENAMES: [(&str, &str); 24] = [
    ("Antigua and Barbuda", "Antigua And Barbuda"),
    ("Bosnia and Herzegovina", "Bosnia And Herzegovina"),
    ("Brunei", "Brunei Darussalam"),
    ("Cape Verde", "Cabo Verde"),
    ("Cote d'Ivoire", "Cote D Ivoire"),
    ("Czechia", "Czech Republic"),
    ("Democratic Republic of Congo", "Democratic Republic Of The Congo"),
    ("Falkland Islands", "Falkland Islands Malvinas"),
    ("Guinea-Bissau", "Guinea Bissau"),
    ("Isle of Man", "Isle Of Man"),
    ("North Macedonia", "Macedonia"),
    ("Northern Cyprus", "Cyprus"),
    ("Northern Ireland", "Ireland"),
    ("Saint Kitts and Nevis", "Saint Kitts And Nevis"),
    ("Saint Vincent and the Grenadines", "Saint Vincent And The Grenadines"),
    ("Sao Tome and Principe", "Sao Tome And Principe"),
    ("Sint Maarten (Dutch part)", "Sint Maarten"),
    ("Timor", "Timor Leste"),
    ("Trinidad and Tobago", "Trinidad And Tobago"),
    ("Turks and Caicos Islands", "Turks And Caicos Islands"),
    ("United Kingdom", "UK"),
    ("United States", "USA"),
    ("Vietnam", "Viet Nam"),
    ("Wallis and Futuna", "Wallis And Futuna Islands"),
];

/// Countries with no counterpart in the worldometer tables.
const EXCLUDED: [&str; 16] = [
    "Bonaire Sint Eustatius and Saba",
    "England",
    "Eswatini",
    "Guernsey",
    "Hong Kong",
    "Jersey",
    "Kosovo",
    "Macao",
    "Nauru",
    "Palestine",
    "Pitcairn",
    "Scotland",
    "Tonga",
    "Turkmenistan",
    "Tuvalu",
    "Wales",
];

/// Rename table plus exclusion set. Matching is exact and case-sensitive.
#[derive(Debug, Clone)]
pub struct CountryNameMap {
    renames: HashMap<&'static str, &'static str>,
    excluded: HashSet<&'static str>,
}

impl Default for CountryNameMap {
    fn default() -> Self {
        Self {
            renames: RENAMES.into_iter().collect(),
            excluded: EXCLUDED.into_iter().collect(),
        }
    }
}

impl CountryNameMap {
    /// The worldometer spelling of `country`, or `country` itself when no rename applies.
    pub fn rename<'a>(&self, country: &'a str) -> &'a str {
        self.renames.get(country).copied().unwrap_or(country)
    }

    pub fn is_excluded(&self, country: &str) -> bool {
        self.excluded.contains(country)
    }
}

/// Rename, then drop every record whose country is excluded.
pub fn harmonize(records: &[VaccinationRecord], name_map: &CountryNameMap) -> Vec<VaccinationRecord> {
    let harmonized: Vec<_> = records
        .iter()
        .filter_map(|record| {
            let country = name_map.rename(&record.country);
            if name_map.is_excluded(country) {
                return None;
            }
            Some(VaccinationRecord {
                country: country.to_string(),
                ..record.clone()
            })
        })
        .collect();
    debug!(
        "Harmonized {} vaccination records, {} dropped as excluded",
        harmonized.len(),
        records.len() - harmonized.len()
    );
    harmonized
}
