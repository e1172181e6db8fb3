//! Element data type tags
//!
//! Rust element types are fixed at compile time, but statistics such as
//! `unique` or `minband` pick their output type from the data (the number of
//! cells in a window, the number of bands). [`DataType`] is the runtime tag
//! used for those decisions.

use num_traits::cast;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Runtime tag for a raster element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl DataType {
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }

    /// Whether `value` survives a cast to this type unchanged.
    ///
    /// NaN and infinities fit only the float types; integer types need an
    /// integral value inside their range.
    pub fn can_represent(self, value: f64) -> bool {
        match self {
            DataType::F64 => true,
            DataType::F32 => !value.is_finite() || value.abs() <= f32::MAX as f64,
            _ if value.fract() != 0.0 || !value.is_finite() => false,
            DataType::U8 => cast::<f64, u8>(value).is_some(),
            DataType::U16 => cast::<f64, u16>(value).is_some(),
            DataType::U32 => cast::<f64, u32>(value).is_some(),
            DataType::U64 => cast::<f64, u64>(value).is_some(),
            DataType::I8 => cast::<f64, i8>(value).is_some(),
            DataType::I16 => cast::<f64, i16>(value).is_some(),
            DataType::I32 => cast::<f64, i32>(value).is_some(),
            DataType::I64 => cast::<f64, i64>(value).is_some(),
        }
    }

    /// Signed type wide enough for every value of this unsigned type plus a
    /// negative sentinel. Signed and float types map to themselves, except
    /// `i8` which widens to `i16` like `u8`.
    pub fn signed_widening(self) -> Self {
        match self {
            DataType::U8 | DataType::I8 => DataType::I16,
            DataType::U16 => DataType::I32,
            DataType::U32 => DataType::I64,
            other => other,
        }
    }

    /// Smallest unsigned type able to hold `value`.
    pub fn smallest_unsigned_for(value: u64) -> Self {
        if value <= u8::MAX as u64 {
            DataType::U8
        } else if value <= u16::MAX as u64 {
            DataType::U16
        } else if value <= u32::MAX as u64 {
            DataType::U32
        } else {
            DataType::U64
        }
    }

    /// Floating point type used for statistics that leave the input domain.
    ///
    /// Single precision input stays single precision, anything else is
    /// promoted to double precision.
    pub fn float_promotion(self) -> Self {
        match self {
            DataType::F32 => DataType::F32,
            _ => DataType::F64,
        }
    }

    /// Default no-data sentinel widened to `f64`: the minimum for integer
    /// types, NaN for floats
    pub fn default_nodata(self) -> f64 {
        match self {
            DataType::U8 | DataType::U16 | DataType::U32 | DataType::U64 => 0.0,
            DataType::I8 => i8::MIN as f64,
            DataType::I16 => i16::MIN as f64,
            DataType::I32 => i32::MIN as f64,
            DataType::I64 => i64::MIN as f64,
            DataType::F32 | DataType::F64 => f64::NAN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::U8 => "u8",
            DataType::U16 => "u16",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
            DataType::I8 => "i8",
            DataType::I16 => "i16",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => DataType::U8,
            "u16" | "uint16" => DataType::U16,
            "u32" | "uint32" => DataType::U32,
            "u64" | "uint64" => DataType::U64,
            "i8" | "int8" => DataType::I8,
            "i16" | "int16" => DataType::I16,
            "i32" | "int32" => DataType::I32,
            "i64" | "int64" | "int" => DataType::I64,
            "f32" | "float32" => DataType::F32,
            "f64" | "float64" | "float" => DataType::F64,
            _ => return Err(Error::UnsupportedDataType(s.to_string())),
        };
        Ok(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smallest_unsigned() {
        assert_eq!(DataType::smallest_unsigned_for(0), DataType::U8);
        assert_eq!(DataType::smallest_unsigned_for(255), DataType::U8);
        assert_eq!(DataType::smallest_unsigned_for(256), DataType::U16);
        assert_eq!(DataType::smallest_unsigned_for(70_000), DataType::U32);
    }

    #[test]
    fn test_float_promotion() {
        assert_eq!(DataType::F32.float_promotion(), DataType::F32);
        assert_eq!(DataType::I16.float_promotion(), DataType::F64);
        assert_eq!(DataType::U8.float_promotion(), DataType::F64);
    }

    #[test]
    fn test_default_nodata() {
        assert_eq!(DataType::U16.default_nodata(), 0.0);
        assert_eq!(DataType::I8.default_nodata(), -128.0);
        assert!(DataType::F32.default_nodata().is_nan());
    }

    #[test]
    fn test_can_represent() {
        assert!(DataType::U8.can_represent(255.0));
        assert!(!DataType::U8.can_represent(256.0));
        assert!(!DataType::U8.can_represent(-1.0));
        assert!(!DataType::I32.can_represent(2.5));
        assert!(!DataType::I64.can_represent(f64::NAN));
        assert!(DataType::I16.can_represent(-9999.0));
        assert!(DataType::F32.can_represent(-9999.0));
        assert!(DataType::F32.can_represent(f64::NAN));
        assert!(!DataType::F32.can_represent(1e300));
    }

    #[test]
    fn test_signed_widening() {
        assert_eq!(DataType::U8.signed_widening(), DataType::I16);
        assert_eq!(DataType::U16.signed_widening(), DataType::I32);
        assert_eq!(DataType::U32.signed_widening(), DataType::I64);
        assert_eq!(DataType::I32.signed_widening(), DataType::I32);
    }

    #[test]
    fn test_parse() {
        assert_eq!("int32".parse::<DataType>().unwrap(), DataType::I32);
        assert!("complex64".parse::<DataType>().is_err());
    }
}
