//! Resolution of free-text country names to ISO 3166-1 alpha-3 codes.

use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{Context, Result};
use itertools::izip;
use log::debug;
use polars::prelude::*;

use crate::{frame, COL};

/// ISO 3166-1 registry shipped with the crate.
const EMBEDDED_REGISTRY: &str = include_str!("../data/iso3166_1.csv");
const REGISTRY_TABLE: &str = "ISO 3166-1 registry";

/// A single registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    pub alpha_2: String,
    pub alpha_3: String,
    pub numeric: String,
    pub name: String,
    pub official_name: Option<String>,
    pub common_name: Option<String>,
}

impl Country {
    /// Every spelling that identifies this country in a lookup.
    fn keys(&self) -> impl Iterator<Item = &str> {
        [&self.alpha_2, &self.alpha_3, &self.numeric, &self.name]
            .into_iter()
            .map(String::as_str)
            .chain(self.official_name.as_deref())
            .chain(self.common_name.as_deref())
    }
}

/// Country-name/code registry with a case-insensitive index over codes and names.
#[derive(Debug)]
pub struct CountryRegistry {
    countries: Vec<Country>,
    index: HashMap<String, usize>,
}

impl CountryRegistry {
    /// Load the registry embedded in the crate.
    pub fn embedded() -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            // Read every column as a string so numeric codes keep their leading zeros
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(EMBEDDED_REGISTRY.as_bytes()))
            .finish()
            .context("Failed to parse embedded ISO 3166-1 registry")?;
        Self::from_dataframe(&df)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let countries = izip!(
            frame::str_values(df, COL::ALPHA_2, REGISTRY_TABLE)?,
            frame::str_values(df, COL::ALPHA_3, REGISTRY_TABLE)?,
            frame::str_values(df, COL::NUMERIC, REGISTRY_TABLE)?,
            frame::str_values(df, COL::NAME, REGISTRY_TABLE)?,
            frame::optional_str_values(df, COL::OFFICIAL_NAME)?,
            frame::optional_str_values(df, COL::COMMON_NAME)?,
        )
        .map(
            |(alpha_2, alpha_3, numeric, name, official_name, common_name)| Country {
                alpha_2: alpha_2.unwrap_or_default(),
                alpha_3: alpha_3.unwrap_or_default(),
                numeric: numeric.unwrap_or_default(),
                name: name.unwrap_or_default(),
                official_name,
                common_name,
            },
        )
        .collect();
        Ok(Self::from_countries(countries))
    }

    pub fn from_countries(countries: Vec<Country>) -> Self {
        let mut index = HashMap::new();
        for (idx, country) in countries.iter().enumerate() {
            for key in country.keys().filter(|k| !k.is_empty()) {
                // First entry wins if two countries share a spelling
                index.entry(key.to_lowercase()).or_insert(idx);
            }
        }
        Self { countries, index }
    }

    pub fn lookup(&self, name: &str) -> Option<&Country> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|idx| &self.countries[*idx])
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }
}

/// Resolves names to alpha-3 codes, remembering every answer (hits and misses) for the lifetime
/// of the resolver. Create one per pipeline run.
pub struct CountryCodeResolver<'a> {
    registry: &'a CountryRegistry,
    cache: HashMap<String, Option<String>>,
}

impl<'a> CountryCodeResolver<'a> {
    pub fn new(registry: &'a CountryRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Returns `None` when the registry has no match. Misses are not errors.
    pub fn resolve(&mut self, name: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let code = self.registry.lookup(name).map(|c| c.alpha_3.clone());
        if code.is_none() {
            debug!("No ISO 3166-1 code for '{name}'");
        }
        self.cache.insert(name.to_string(), code.clone());
        code
    }

    /// Number of distinct names looked up so far.
    pub fn distinct_lookups(&self) -> usize {
        self.cache.len()
    }

    /// Number of distinct names that did not resolve.
    pub fn unresolved(&self) -> usize {
        self.cache.values().filter(|v| v.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_registry_should_load() {
        let registry = CountryRegistry::embedded().unwrap();
        assert_eq!(registry.len(), 249);
        let afghanistan = registry.lookup("AFG").unwrap();
        assert_eq!(
            afghanistan.numeric, "004",
            "numeric codes should keep leading zeros"
        );
    }

    #[test]
    fn lookup_matches_names_and_codes_case_insensitively() {
        let registry = CountryRegistry::embedded().unwrap();
        let mut resolver = CountryCodeResolver::new(&registry);
        assert_eq!(resolver.resolve("Germany").as_deref(), Some("DEU"));
        assert_eq!(resolver.resolve("germany").as_deref(), Some("DEU"));
        assert_eq!(resolver.resolve("US").as_deref(), Some("USA"));
        assert_eq!(resolver.resolve("Iran").as_deref(), Some("IRN"));
        assert_eq!(
            resolver.resolve("United Kingdom of Great Britain and Northern Ireland").as_deref(),
            Some("GBR")
        );
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let registry = CountryRegistry::embedded().unwrap();
        let mut resolver = CountryCodeResolver::new(&registry);
        assert_eq!(resolver.resolve("Korea, South"), None);
        assert_eq!(resolver.resolve("Diamond Princess"), None);
        assert_eq!(resolver.unresolved(), 2);
    }

    #[test]
    fn repeated_lookups_are_cached_and_consistent() {
        let registry = CountryRegistry::from_countries(vec![Country {
            alpha_2: "XA".into(),
            alpha_3: "XAA".into(),
            numeric: "999".into(),
            name: "Exampleland".into(),
            official_name: None,
            common_name: None,
        }]);
        let mut resolver = CountryCodeResolver::new(&registry);
        let first = resolver.resolve("Exampleland");
        for _ in 0..10 {
            assert_eq!(resolver.resolve("Exampleland"), first);
        }
        assert_eq!(resolver.resolve("Nowhere"), None);
        assert_eq!(resolver.distinct_lookups(), 2);
    }
}
