use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

/// Behaviour switches of a [`Space`](super::Space).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceConfig {
    /// Assign `prefix + first free integer` ids to objects registered without one.
    pub enable_auto_id: bool,
    /// Track reference-typed properties of registered objects in the relation manager.
    pub enable_obj_ref_relations: bool,
    /// Repair auto-update references when their target leaves the space.
    pub auto_update_obj_ref_relations: bool,
    /// First integer tried when generating automatic ids.
    pub auto_id_start: usize,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            enable_auto_id: true,
            enable_obj_ref_relations: true,
            auto_update_obj_ref_relations: true,
            auto_id_start: 1,
        }
    }
}

impl SpaceConfig {
    /// Reads switches from a TOML file. Missing switches are filled in as
    /// [`SpaceConfigBuilder::build`] does.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let builder: SpaceConfigBuilder = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        builder.build()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auto_update_obj_ref_relations && !self.enable_obj_ref_relations {
            return Err(ConfigError::InvalidParameter {
                name: "auto_update_obj_ref_relations",
                reason: "requires enable_obj_ref_relations",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceConfigBuilder {
    enable_auto_id: Option<bool>,
    enable_obj_ref_relations: Option<bool>,
    auto_update_obj_ref_relations: Option<bool>,
    auto_id_start: Option<usize>,
}

impl SpaceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_auto_id(mut self, enabled: bool) -> Self {
        self.enable_auto_id = Some(enabled);
        self
    }
    pub fn enable_obj_ref_relations(mut self, enabled: bool) -> Self {
        self.enable_obj_ref_relations = Some(enabled);
        self
    }
    pub fn auto_update_obj_ref_relations(mut self, enabled: bool) -> Self {
        self.auto_update_obj_ref_relations = Some(enabled);
        self
    }
    pub fn auto_id_start(mut self, start: usize) -> Self {
        self.auto_id_start = Some(start);
        self
    }

    /// Unset switches take their defaults, except that disabling relation tracking also
    /// disables auto-update unless the latter was requested explicitly.
    pub fn build(self) -> Result<SpaceConfig, ConfigError> {
        let defaults = SpaceConfig::default();
        let enable_obj_ref_relations = self
            .enable_obj_ref_relations
            .unwrap_or(defaults.enable_obj_ref_relations);
        let config = SpaceConfig {
            enable_auto_id: self.enable_auto_id.unwrap_or(defaults.enable_auto_id),
            enable_obj_ref_relations,
            auto_update_obj_ref_relations: self
                .auto_update_obj_ref_relations
                .unwrap_or(enable_obj_ref_relations),
            auto_id_start: self.auto_id_start.unwrap_or(defaults.auto_id_start),
        };
        config.validate()?;
        Ok(config)
    }
}
