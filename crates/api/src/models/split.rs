use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A requested split, e.g. `en-television,en-xxhdpi`.
///
/// Each comma-separated filter is a list of dash-separated configuration qualifiers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SplitSpec {
    raw: String,
    filters: Vec<Vec<String>>,
}

impl SplitSpec {
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let filters: Vec<Vec<String>> = raw
            .split(',')
            .map(|filter| filter.split('-').map(str::to_string).collect::<Vec<_>>())
            .collect();

        let empty = filters
            .iter()
            .any(|filter| filter.iter().any(|qualifier| qualifier.is_empty()));
        if raw.is_empty() || empty {
            return Err(ModelError::InvalidSplit(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            filters,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn filters(&self) -> &[Vec<String>] {
        &self.filters
    }

    /// Filename suffix the split output is renamed to: commas become underscores.
    pub fn canonical_suffix(&self) -> String {
        self.raw.replace(',', "_")
    }
}

impl FromStr for SplitSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SplitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
