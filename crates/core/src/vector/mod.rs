//! Vector features used as zone definitions

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::crs::CRS;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    #[serde(default)]
    pub properties: HashMap<String, AttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// A feature with no geometry. It still occupies a zone id.
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: HashMap::new(),
            id: None,
        }
    }
}

/// Ordered collection of features sharing one CRS.
///
/// Order matters: when used as zones, feature `i` becomes zone id `i + 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub crs: Option<CRS>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }
}

impl FromIterator<Geometry<f64>> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Geometry<f64>>>(iter: I) -> Self {
        Self {
            crs: None,
            features: iter.into_iter().map(Feature::new).collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
