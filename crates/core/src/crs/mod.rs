//! Coordinate reference system identity
//!
//! gridstat never reprojects. A CRS is only compared, so that zones and data
//! described in different systems are rejected before any work is done.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate reference system, identified by EPSG code and/or WKT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    epsg: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wkt: Option<String>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether two CRS describe the same system.
    ///
    /// EPSG codes win when both sides have one; otherwise WKT text is
    /// compared after whitespace normalization.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        match (&self.wkt, &other.wkt) {
            (Some(a), Some(b)) => normalize_wkt(a) == normalize_wkt(b),
            _ => false,
        }
    }

    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        "Unknown".to_string()
    }
}

fn normalize_wkt(wkt: &str) -> String {
    wkt.split_whitespace().collect()
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Fail with [`Error::CrsMismatch`] when both sides declare a CRS and they
/// differ. A missing CRS on either side is accepted.
pub fn ensure_same_crs(zones: Option<&CRS>, data: Option<&CRS>) -> Result<()> {
    match (zones, data) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            Err(Error::CrsMismatch(a.identifier(), b.identifier()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_wkt_whitespace_insensitive() {
        let a = CRS::from_wkt("GEOGCS[\"WGS 84\",  DATUM[\"WGS_1984\"]]");
        let b = CRS::from_wkt("GEOGCS[\"WGS 84\",\n DATUM[\"WGS_1984\"]]");
        assert!(a.is_equivalent(&b));
    }

    #[test]
    fn test_ensure_same_crs() {
        let utm = CRS::from_epsg(32633);
        let wgs = CRS::from_epsg(4326);
        assert!(ensure_same_crs(Some(&utm), Some(&utm.clone())).is_ok());
        assert!(ensure_same_crs(None, Some(&wgs)).is_ok());
        let err = ensure_same_crs(Some(&utm), Some(&wgs)).unwrap_err();
        assert!(matches!(err, Error::CrsMismatch(_, _)));
    }
}
