use crate::error::{OdpError, Result};
use crate::models::{CoercionPolicy, Crs, ValidityMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Default file name of the spatial feature cache inside the reference directory
pub const DEFAULT_FEATURE_CACHE: &str = "geojson-feature-cache.csv";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Runtime configuration of a transformation run
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub coercion: ConfigValue<CoercionPolicy>,
    pub geometry_validity: ConfigValue<ValidityMode>,
    pub target_crs: ConfigValue<Crs>,
    pub feature_cache: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            coercion: ConfigValue::new(CoercionPolicy::Lenient, ConfigSource::Default),
            geometry_validity: ConfigValue::new(ValidityMode::Strict, ConfigSource::Default),
            target_crs: ConfigValue::new(Crs::wgs84(), ConfigSource::Default),
            feature_cache: ConfigValue::new(
                DEFAULT_FEATURE_CACHE.to_string(),
                ConfigSource::Default,
            ),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| OdpError::ConfigInvalid {
            key: "file".to_string(),
            reason: format!("Failed to read config file: {}", e),
        })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| OdpError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(coercion) = file_config.coercion {
            self.coercion.update(coercion, ConfigSource::File);
        }

        if let Some(geometry_validity) = file_config.geometry_validity {
            self.geometry_validity.update(geometry_validity, ConfigSource::File);
        }

        if let Some(target_crs) = file_config.target_crs {
            self.target_crs.update(target_crs, ConfigSource::File);
        }

        if let Some(feature_cache) = file_config.feature_cache {
            self.feature_cache.update(feature_cache, ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        // ODP_COERCION
        if let Ok(policy_str) = env::var("ODP_COERCION") {
            match parse_coercion_policy(&policy_str) {
                Ok(policy) => self.coercion.update(policy, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ODP_COERCION value '{}': expected strict or lenient",
                    policy_str
                ),
            }
        }

        // ODP_GEOMETRY_VALIDITY
        if let Ok(validity_str) = env::var("ODP_GEOMETRY_VALIDITY") {
            match parse_validity_mode(&validity_str) {
                Ok(validity) => self.geometry_validity.update(validity, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ODP_GEOMETRY_VALIDITY value '{}': expected strict or lenient",
                    validity_str
                ),
            }
        }

        // ODP_TARGET_CRS
        if let Ok(crs_str) = env::var("ODP_TARGET_CRS") {
            match parse_crs(&crs_str) {
                Ok(crs) => self.target_crs.update(crs, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid ODP_TARGET_CRS value '{}': expected an identifier such as EPSG:4326",
                    crs_str
                ),
            }
        }

        // ODP_FEATURE_CACHE
        if let Ok(feature_cache) = env::var("ODP_FEATURE_CACHE") {
            if feature_cache.trim().is_empty() {
                tracing::warn!("Ignoring empty ODP_FEATURE_CACHE");
            } else {
                self.feature_cache.update(feature_cache, ConfigSource::Environment);
            }
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(coercion) = overrides.coercion {
            self.coercion.update(coercion, ConfigSource::Cli);
        }

        if let Some(geometry_validity) = overrides.geometry_validity {
            self.geometry_validity.update(geometry_validity, ConfigSource::Cli);
        }

        if let Some(target_crs) = overrides.target_crs {
            self.target_crs.update(target_crs, ConfigSource::Cli);
        }

        if let Some(feature_cache) = overrides.feature_cache {
            self.feature_cache.update(feature_cache, ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "coercion".to_string(),
            (format!("{:?}", self.coercion.value), self.coercion.source),
        );

        map.insert(
            "geometry_validity".to_string(),
            (format!("{:?}", self.geometry_validity.value), self.geometry_validity.source),
        );

        map.insert(
            "target_crs".to_string(),
            (self.target_crs.value.identifier(), self.target_crs.source),
        );

        map.insert(
            "feature_cache".to_string(),
            (self.feature_cache.value.clone(), self.feature_cache.source),
        );

        map
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    coercion: Option<CoercionPolicy>,
    geometry_validity: Option<ValidityMode>,
    target_crs: Option<Crs>,
    feature_cache: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub coercion: Option<CoercionPolicy>,
    pub geometry_validity: Option<ValidityMode>,
    pub target_crs: Option<Crs>,
    pub feature_cache: Option<String>,
}

/// Parse coercion policy from string
pub fn parse_coercion_policy(s: &str) -> Result<CoercionPolicy> {
    match s.to_lowercase().as_str() {
        "strict" => Ok(CoercionPolicy::Strict),
        "lenient" => Ok(CoercionPolicy::Lenient),
        _ => Err(OdpError::ConfigInvalid {
            key: "coercion".to_string(),
            reason: format!("Invalid coercion policy: {}. Use strict or lenient", s),
        }),
    }
}

/// Parse validity mode from string
pub fn parse_validity_mode(s: &str) -> Result<ValidityMode> {
    match s.to_lowercase().as_str() {
        "strict" => Ok(ValidityMode::Strict),
        "lenient" => Ok(ValidityMode::Lenient),
        _ => Err(OdpError::ConfigInvalid {
            key: "geometry_validity".to_string(),
            reason: format!("Invalid validity mode: {}. Use strict or lenient", s),
        }),
    }
}

/// Parse a CRS identifier from string
pub fn parse_crs(s: &str) -> Result<Crs> {
    s.parse::<Crs>().map_err(|e| OdpError::ConfigInvalid {
        key: "target_crs".to_string(),
        reason: e.to_string(),
    })
}
