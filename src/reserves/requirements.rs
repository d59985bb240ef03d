//! Code for reading reserve requirements.
use crate::input::{input_err_msg, read_csv_optional};
use anyhow::{Context, Result, ensure};
use derive_more::Display;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The name of the reserve requirements file in a case's input folder
pub const RESERVES_FILE_NAME: &str = "reserves.csv";

/// A reserve level within a reserve area.
///
/// The `{level}_{area}` rendering is only used for file keys and model names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("{level}_{area}")]
pub struct ReserveKey {
    /// The reserve level column, e.g. `reserve_level_1`
    pub level: String,
    /// The reserve area, e.g. `reserve_area_1`
    pub area: String,
}

impl ReserveKey {
    /// Create a new [`ReserveKey`]
    pub fn new(level: &str, area: &str) -> Self {
        Self {
            level: level.to_string(),
            area: area.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReserveRequirementRaw {
    level_area: String,
    value_mw: f64,
}

/// The reserve capacity (MW) required for each level and area
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReserveRequirements(IndexMap<String, f64>);

impl ReserveRequirements {
    /// Read requirements from the reserves file in `dir`.
    ///
    /// Returns `None` if there is no reserves file.
    pub fn from_dir(dir: &Path) -> Result<Option<Self>> {
        let file_path = dir.join(RESERVES_FILE_NAME);
        let Some(records) = read_csv_optional::<ReserveRequirementRaw>(&file_path)? else {
            return Ok(None);
        };

        Self::from_entries(records.into_iter().map(|r| (r.level_area, r.value_mw)))
            .with_context(|| input_err_msg(&file_path))
            .map(Some)
    }

    /// Create from `(level_area, value_mw)` pairs
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut map = IndexMap::new();
        for (key, value) in entries {
            ensure!(
                value.is_finite(),
                "Invalid reserve requirement for {key}: {value}"
            );
            ensure!(
                map.insert(key.clone(), value).is_none(),
                "Duplicate reserve requirement: {key}"
            );
        }

        Ok(Self(map))
    }

    /// The number of requirements
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no requirements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Match the file's entries to the (level, area) pairs found in the network
    pub fn resolve(&self, keys: &[ReserveKey]) -> ResolvedRequirements {
        let mut required = HashMap::new();
        let mut matched = HashSet::new();
        for key in keys {
            if let Some((name, value)) = self.0.get_key_value(key.to_string().as_str()) {
                required.insert(key.clone(), *value);
                matched.insert(name.as_str());
            }
        }
        let unused = self
            .0
            .keys()
            .filter(|name| !matched.contains(name.as_str()))
            .cloned()
            .collect();

        ResolvedRequirements { required, unused }
    }
}

/// Reserve requirements keyed by (level, area)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedRequirements {
    /// The required capacity (MW) of each pair which has a requirement
    pub required: HashMap<ReserveKey, f64>,
    /// Entries in the file which match no pair
    pub unused: Vec<String>,
}

impl ResolvedRequirements {
    /// The required capacity for a level and area, if given
    pub fn get(&self, key: &ReserveKey) -> Option<f64> {
        self.required.get(key).copied()
    }
}
