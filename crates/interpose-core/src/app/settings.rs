//! Settings - TOML から読む dispatch の方針
//!
//! ```toml
//! ordering = "sequential"
//! ignore_unmapped = true
//! ```
//!
//! 省略したキーは既定値（pyramid / strict）になる。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::impls::{Pyramid, Sequential};
use crate::ports::OrderingStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingKind {
    #[default]
    Pyramid,
    Sequential,
}

impl OrderingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pyramid => "pyramid",
            Self::Sequential => "sequential",
        }
    }

    pub fn strategy(&self) -> Box<dyn OrderingStrategy> {
        match self {
            Self::Pyramid => Box::new(Pyramid),
            Self::Sequential => Box::new(Sequential),
        }
    }
}

impl fmt::Display for OrderingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderingKind {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pyramid" => Ok(Self::Pyramid),
            "sequential" => Ok(Self::Sequential),
            other => Err(SettingsError::UnknownOrdering(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ordering: OrderingKind,
    pub ignore_unmapped: bool,
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
