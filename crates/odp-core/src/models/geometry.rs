//! Coordinate reference systems and geometry validation policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProjectionError;

/// Coordinate Reference System identified by EPSG code.
///
/// Serialized as the identifier string (`EPSG:25833`). Parsing also accepts
/// the OGC URN forms found in GeoJSON `crs` members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs {
    pub epsg: u32,
    pub name: String,
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl Crs {
    pub fn new(epsg: u32, name: impl Into<String>) -> Self {
        Self { epsg, name: name.into() }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::new(4326, "WGS 84")
    }

    /// OGC CRS84, WGS 84 with longitude first
    pub fn crs84() -> Self {
        Self::new(4326, "CRS84")
    }

    /// ETRS89 / UTM zone 33N (EPSG:25833)
    pub fn etrs89_utm33n() -> Self {
        Self::new(25833, "ETRS89 / UTM zone 33N")
    }

    pub fn from_epsg(epsg: u32) -> Self {
        match epsg {
            4326 => Self::wgs84(),
            25833 => Self::etrs89_utm33n(),
            other => Self::new(other, format!("EPSG:{}", other)),
        }
    }

    /// Identifier understood by PROJ
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// URN written into the `crs` member of GeoJSON collections
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }

    /// Whether coordinates in both systems are interchangeable
    pub fn matches(&self, other: &Crs) -> bool {
        self.epsg == other.epsg
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for Crs {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = |reason: &str| ProjectionError::InvalidCrs {
            identifier: trimmed.to_string(),
            reason: reason.to_string(),
        };

        // CRS84 in any of its spellings
        if trimmed.rsplit(':').next().is_some_and(|last| last.eq_ignore_ascii_case("CRS84")) {
            return Ok(Self::crs84());
        }

        let code = match trimmed.rsplit_once(':') {
            Some((authority, code)) => {
                if !authority.to_ascii_uppercase().contains("EPSG") {
                    return Err(invalid("only EPSG codes are supported"));
                }
                code
            }
            None => trimmed,
        };

        code.trim()
            .parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| invalid("expected an EPSG code such as EPSG:4326"))
    }
}

impl TryFrom<String> for Crs {
    type Error = ProjectionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        if crs.name == "CRS84" {
            "OGC:CRS84".to_string()
        } else {
            crs.identifier()
        }
    }
}

/// Geometry validation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidityMode {
    /// Reject geometries that violate structural limits
    #[default]
    Strict,
    /// Log violations and pass the geometry through
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identifier_forms() {
        assert_eq!("EPSG:25833".parse::<Crs>().unwrap().epsg, 25833);
        assert_eq!("epsg:3857".parse::<Crs>().unwrap().epsg, 3857);
        assert_eq!("urn:ogc:def:crs:EPSG::4326".parse::<Crs>().unwrap(), Crs::wgs84());
        assert_eq!("4326".parse::<Crs>().unwrap().epsg, 4326);
    }

    #[test]
    fn test_parse_crs84() {
        let crs: Crs = "urn:ogc:def:crs:OGC:1.3:CRS84".parse().unwrap();
        assert_eq!(crs, Crs::crs84());
        assert!(crs.matches(&Crs::wgs84()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("ESRI:102100".parse::<Crs>().is_err());
        assert!("EPSG:abc".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_serializes_as_identifier() {
        let json = serde_json::to_string(&Crs::etrs89_utm33n()).unwrap();
        assert_eq!(json, "\"EPSG:25833\"");

        let parsed: Crs = serde_json::from_str("\"EPSG:4326\"").unwrap();
        assert_eq!(parsed, Crs::wgs84());
    }

    #[test]
    fn test_urn() {
        assert_eq!(Crs::wgs84().urn(), "urn:ogc:def:crs:EPSG::4326");
    }
}
