//! Integration tests for layered configuration
//!
//! Precedence: CLI arguments > Environment variables > Config file > Defaults

use odp_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig};
use odp_core::models::{CoercionPolicy, Crs, ValidityMode};
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn clear_env() {
    env::remove_var("ODP_COERCION");
    env::remove_var("ODP_GEOMETRY_VALIDITY");
    env::remove_var("ODP_TARGET_CRS");
    env::remove_var("ODP_FEATURE_CACHE");
}

#[test]
fn test_partial_file_configuration() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
geometry_validity = "strict"
# everything else stays at its default
"#
    )
    .unwrap();

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

    assert_eq!(config.geometry_validity.value, ValidityMode::Strict);
    assert_eq!(config.geometry_validity.source, ConfigSource::File);
    assert_eq!(config.coercion.value, CoercionPolicy::Lenient);
    assert_eq!(config.coercion.source, ConfigSource::Default);
    assert_eq!(config.target_crs.source, ConfigSource::Default);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    env::set_var("ODP_COERCION", "strict");
    env::set_var("ODP_TARGET_CRS", "urn:ogc:def:crs:EPSG::25833");
    env::set_var("ODP_FEATURE_CACHE", "env-cache.csv");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
coercion = "lenient"
target_crs = "EPSG:3857"
feature_cache = "file-cache.csv"
"#
    )
    .unwrap();

    let config =
        LayeredConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.coercion.value, CoercionPolicy::Strict);
    assert_eq!(config.coercion.source, ConfigSource::Environment);
    assert_eq!(config.target_crs.value, Crs::etrs89_utm33n());
    assert_eq!(config.target_crs.source, ConfigSource::Environment);
    assert_eq!(config.feature_cache.value, "env-cache.csv");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_values_are_ignored() {
    clear_env();
    env::set_var("ODP_GEOMETRY_VALIDITY", "sloppy");
    env::set_var("ODP_TARGET_CRS", "not-a-crs");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.geometry_validity.value, ValidityMode::Strict);
    assert_eq!(config.geometry_validity.source, ConfigSource::Default);
    assert_eq!(config.target_crs.value, Crs::wgs84());
    assert_eq!(config.target_crs.source, ConfigSource::Default);

    clear_env();
}

#[test]
#[serial]
fn test_full_configuration_workflow() {
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("odp.toml");
    fs::write(
        &config_path,
        r#"
coercion = "strict"
geometry_validity = "strict"
target_crs = "EPSG:3857"
"#,
    )
    .unwrap();

    env::set_var("ODP_GEOMETRY_VALIDITY", "lenient");

    let mut config =
        LayeredConfig::with_defaults().load_from_file(&config_path).unwrap().load_from_env();

    assert_eq!(config.coercion.value, CoercionPolicy::Strict);
    assert_eq!(config.coercion.source, ConfigSource::File);
    assert_eq!(config.geometry_validity.value, ValidityMode::Lenient);
    assert_eq!(config.geometry_validity.source, ConfigSource::Environment);

    config.update_from_cli(CliConfigOverrides {
        target_crs: Some(Crs::wgs84()),
        feature_cache: Some("cli-cache.csv".to_string()),
        ..Default::default()
    });

    assert_eq!(config.target_crs.value.epsg, 4326);
    assert_eq!(config.target_crs.source, ConfigSource::Cli);
    assert_eq!(config.feature_cache.value, "cli-cache.csv");
    assert_eq!(config.geometry_validity.source, ConfigSource::Environment);

    let inspection = config.to_inspection_map();
    assert_eq!(inspection["target_crs"], ("EPSG:4326".to_string(), ConfigSource::Cli));

    clear_env();
}

#[test]
fn test_invalid_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "invalid toml content [[[").unwrap();

    assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let non_existent = temp_dir.path().join("does_not_exist.toml");

    assert!(LayeredConfig::with_defaults().load_from_file(&non_existent).is_err());
}
