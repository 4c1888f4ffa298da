//! Store-wide defaults, loadable from TOML.

use crate::db::collection::OnConflict;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse store config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize store config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("id_attribute must not be empty")]
    EmptyIdAttribute,
}

///
/// StoreConfig
///
/// Defaults applied to every mapper that does not override them.
///
/// ```toml
/// id_attribute = "uuid"
/// on_conflict = "replace"
/// notify_delay = 0
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub id_attribute: String,
    pub on_conflict: OnConflict,

    /// Ticks between a tracked write and its change notification.
    pub notify_delay: u64,

    pub track_changes: bool,

    /// Create secondary indexes for relation foreign keys automatically.
    pub index_foreign_keys: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_attribute: crate::DEFAULT_ID_ATTRIBUTE.to_string(),
            on_conflict: OnConflict::default(),
            notify_delay: 0,
            track_changes: true,
            index_foreign_keys: true,
        }
    }
}

impl StoreConfig {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id_attribute.is_empty() {
            return Err(ConfigError::EmptyIdAttribute);
        }

        Ok(())
    }
}

///
/// TESTS
///
