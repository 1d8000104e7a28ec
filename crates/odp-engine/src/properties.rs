//! Property transforms on GeoJSON features.
//!
//! Each [`PropertySpec`] is applied to every feature, in declaration order.
//! Operations whose input property is absent are skipped, except `mapping`,
//! which needs its key.

use crate::format::{last_chars, zero_pad};
use odp_core::error::TransformError;
use odp_core::models::{
    render_json_scalar, FeatureCollection, GeoFeature, PropertyOp, PropertySpec,
};
use serde_json::Value as JsonValue;

/// Apply property transforms to every feature. Returns whether any property
/// value or name actually changed.
pub fn apply_properties(
    collection: &mut FeatureCollection,
    specs: &[PropertySpec],
) -> Result<bool, TransformError> {
    let mut changed = false;
    for feature in &mut collection.features {
        for spec in specs {
            changed |= apply_property(feature, spec)?;
        }
    }

    tracing::debug!(
        "Applied {} property transforms to {} features",
        specs.len(),
        collection.features.len()
    );

    Ok(changed)
}

fn text_of(value: &JsonValue) -> String {
    render_json_scalar(value).unwrap_or_else(|| value.to_string())
}

/// Set a property, reporting whether the stored value differs from before
fn set(feature: &mut GeoFeature, name: &str, value: JsonValue) -> bool {
    match feature.properties.insert(name.to_string(), value) {
        Some(previous) => feature.properties.get(name) != Some(&previous),
        None => true,
    }
}

/// Apply one transform to one feature
pub fn apply_property(
    feature: &mut GeoFeature,
    spec: &PropertySpec,
) -> Result<bool, TransformError> {
    let name = spec.name.as_str();

    let changed = match &spec.op {
        PropertyOp::Value { value } => {
            if feature.properties.contains_key(name) {
                false
            } else {
                set(feature, name, value.clone())
            }
        }
        PropertyOp::Concat { properties } => {
            let parts: Option<Vec<String>> = properties
                .iter()
                .map(|p| feature.properties.get(p).map(text_of))
                .collect();
            match parts {
                Some(parts) => set(feature, name, JsonValue::String(parts.concat())),
                None => false,
            }
        }
        PropertyOp::ZeroPad { width } => match feature.properties.get(name) {
            Some(value) => {
                let padded = zero_pad(&text_of(value), *width);
                set(feature, name, JsonValue::String(padded))
            }
            None => false,
        },
        PropertyOp::LastChars { count } => match feature.properties.get(name) {
            Some(value) => {
                let tail = last_chars(&text_of(value), *count);
                set(feature, name, JsonValue::String(tail))
            }
            None => false,
        },
        PropertyOp::Mapping { key, table } => {
            let key_value =
                feature.properties.get(key).ok_or_else(|| TransformError::MissingProperty {
                    property: key.clone(),
                    operation: "mapping".to_string(),
                    feature: feature.label(),
                })?;
            let key_text = text_of(key_value);
            let mapped =
                table.get(&key_text).cloned().ok_or_else(|| TransformError::MissingMappingKey {
                    column: name.to_string(),
                    key: key_text.clone(),
                })?;
            set(feature, name, mapped)
        }
        PropertyOp::Remove => feature.properties.remove(name).is_some(),
        PropertyOp::Rename { to } => {
            if to == name {
                false
            } else {
                match feature.properties.remove(name) {
                    Some(value) => {
                        feature.properties.insert(to.clone(), value);
                        true
                    }
                    None => false,
                }
            }
        }
    };

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn spec(name: &str, op: PropertyOp) -> PropertySpec {
        PropertySpec { name: name.to_string(), op }
    }

    fn collection() -> FeatureCollection {
        FeatureCollection::new(vec![
            GeoFeature::new(None)
                .with_property("id", "11000000")
                .with_property("BEZ", "01")
                .with_property("PLR", "0101"),
            GeoFeature::new(None).with_property("id", "12000000").with_property("BEZ", "02"),
        ])
    }

    #[test]
    fn test_value_only_when_absent() {
        let mut data = collection();
        data.features[0].properties.insert("source".to_string(), json!("kept"));

        let changed = apply_properties(&mut data, &[spec("source", PropertyOp::Value {
            value: json!("lor"),
        })])
        .unwrap();

        assert!(changed);
        assert_eq!(data.features[0].properties["source"], json!("kept"));
        assert_eq!(data.features[1].properties["source"], json!("lor"));
    }

    #[test]
    fn test_concat_requires_all_parts() {
        let mut data = collection();
        apply_properties(&mut data, &[spec("code", PropertyOp::Concat {
            properties: vec!["BEZ".to_string(), "PLR".to_string()],
        })])
        .unwrap();

        assert_eq!(data.features[0].properties["code"], json!("010101"));
        assert!(!data.features[1].properties.contains_key("code"));
    }

    #[test]
    fn test_zero_pad_and_last_chars() {
        let mut data = FeatureCollection::new(vec![GeoFeature::new(None).with_property("n", 7)]);
        apply_properties(&mut data, &[
            spec("n", PropertyOp::ZeroPad { width: 4 }),
            spec("n", PropertyOp::LastChars { count: 2 }),
        ])
        .unwrap();
        assert_eq!(data.features[0].properties["n"], json!("07"));
    }

    #[test]
    fn test_mapping() {
        let mut table = BTreeMap::new();
        table.insert("01".to_string(), json!("Mitte"));
        table.insert("02".to_string(), json!("Friedrichshain-Kreuzberg"));

        let mut data = collection();
        apply_properties(&mut data, &[spec("name", PropertyOp::Mapping {
            key: "BEZ".to_string(),
            table,
        })])
        .unwrap();

        assert_eq!(data.features[0].properties["name"], json!("Mitte"));
        assert_eq!(data.features[1].properties["name"], json!("Friedrichshain-Kreuzberg"));
    }

    #[test]
    fn test_mapping_missing_key_fails() {
        let mut data = collection();
        let err = apply_properties(&mut data, &[spec("name", PropertyOp::Mapping {
            key: "BEZ".to_string(),
            table: BTreeMap::new(),
        })])
        .unwrap_err();
        assert!(matches!(err, TransformError::MissingMappingKey { ref key, .. } if key == "01"));

        let err = apply_properties(&mut data, &[spec("name", PropertyOp::Mapping {
            key: "missing".to_string(),
            table: BTreeMap::new(),
        })])
        .unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingProperty { ref feature, .. } if feature == "11000000"
        ));
    }

    #[test]
    fn test_remove_and_rename() {
        let mut data = collection();
        let changed = apply_properties(&mut data, &[
            spec("PLR", PropertyOp::Remove),
            spec("BEZ", PropertyOp::Rename { to: "district".to_string() }),
        ])
        .unwrap();

        assert!(changed);
        for feature in &data.features {
            assert!(!feature.properties.contains_key("PLR"));
            assert!(!feature.properties.contains_key("BEZ"));
            assert!(feature.properties.contains_key("district"));
        }
    }

    #[test]
    fn test_second_run_reports_unchanged() {
        let specs = vec![
            spec("BEZ", PropertyOp::ZeroPad { width: 2 }),
            spec("PLR", PropertyOp::Remove),
            spec("source", PropertyOp::Value { value: json!("lor") }),
        ];
        let mut data = collection();
        assert!(apply_properties(&mut data, &specs).unwrap());
        assert!(!apply_properties(&mut data, &specs).unwrap());
    }
}
