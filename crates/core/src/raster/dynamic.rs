//! Rasters whose element type is only known at runtime

use std::any::Any;

use ndarray::{Array3, Zip};

use crate::crs::CRS;
use crate::raster::{DataType, GeoTransform, RasterElement, RasterStack};

/// A [`RasterStack`] of any supported element type.
///
/// Windowed and band-wise statistics choose their output type from the
/// statistic and the input (see [`DataType`]), so they return this enum.
#[derive(Debug, Clone)]
pub enum AnyRaster {
    U8(RasterStack<u8>),
    U16(RasterStack<u16>),
    U32(RasterStack<u32>),
    U64(RasterStack<u64>),
    I8(RasterStack<i8>),
    I16(RasterStack<i16>),
    I32(RasterStack<i32>),
    I64(RasterStack<i64>),
    F32(RasterStack<f32>),
    F64(RasterStack<f64>),
}

/// Evaluate `$body` with `$s` bound to the concrete stack inside an [`AnyRaster`]
#[macro_export]
macro_rules! with_any_raster {
    ($raster:expr, $s:ident => $body:expr) => {
        match $raster {
            $crate::raster::AnyRaster::U8($s) => $body,
            $crate::raster::AnyRaster::U16($s) => $body,
            $crate::raster::AnyRaster::U32($s) => $body,
            $crate::raster::AnyRaster::U64($s) => $body,
            $crate::raster::AnyRaster::I8($s) => $body,
            $crate::raster::AnyRaster::I16($s) => $body,
            $crate::raster::AnyRaster::I32($s) => $body,
            $crate::raster::AnyRaster::I64($s) => $body,
            $crate::raster::AnyRaster::F32($s) => $body,
            $crate::raster::AnyRaster::F64($s) => $body,
        }
    };
}

macro_rules! impl_from_stack {
    ($t:ty, $variant:ident) => {
        impl From<RasterStack<$t>> for AnyRaster {
            fn from(stack: RasterStack<$t>) -> Self {
                AnyRaster::$variant(stack)
            }
        }
    };
}

impl_from_stack!(u8, U8);
impl_from_stack!(u16, U16);
impl_from_stack!(u32, U32);
impl_from_stack!(u64, U64);
impl_from_stack!(i8, I8);
impl_from_stack!(i16, I16);
impl_from_stack!(i32, I32);
impl_from_stack!(i64, I64);
impl_from_stack!(f32, F32);
impl_from_stack!(f64, F64);

impl AnyRaster {
    pub fn data_type(&self) -> DataType {
        crate::with_any_raster!(self, s => s.data_type())
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        crate::with_any_raster!(self, s => s.shape())
    }

    pub fn transform(&self) -> &GeoTransform {
        crate::with_any_raster!(self, s => s.transform())
    }

    pub fn crs(&self) -> Option<&CRS> {
        crate::with_any_raster!(self, s => s.crs())
    }

    /// No-data value widened to `f64`
    pub fn nodata_f64(&self) -> Option<f64> {
        crate::with_any_raster!(self, s => s.nodata().and_then(|v| v.to_f64()))
    }

    /// Per-cell validity, `true` where the cell holds data
    pub fn validity_mask(&self) -> Array3<bool> {
        crate::with_any_raster!(self, s => s.validity_mask())
    }

    /// All values widened to `f64`, null cells as NaN
    pub fn to_f64_nan(&self) -> Array3<f64> {
        crate::with_any_raster!(self, s => s.to_f64_nan())
    }

    /// Borrow the concrete stack if `T` matches the element type
    pub fn downcast<T: RasterElement>(&self) -> Option<&RasterStack<T>> {
        crate::with_any_raster!(self, s => (s as &dyn Any).downcast_ref::<RasterStack<T>>())
    }

    /// Build a raster of type `dtype` from `f64` cell values.
    ///
    /// Cells with `valid == false`, and cells whose value `dtype` cannot
    /// hold (NaN or 300 in `u8`), are written as the no-data value. When
    /// `nodata` is `None` but some cell is written that way, the default
    /// no-data value of `dtype` is used.
    pub fn from_f64_cells(
        dtype: DataType,
        values: &Array3<f64>,
        valid: &Array3<bool>,
        nodata: Option<f64>,
        transform: GeoTransform,
        crs: Option<CRS>,
    ) -> AnyRaster {
        let parts = CellParts {
            values,
            valid,
            nodata,
            transform,
            crs,
        };
        match dtype {
            DataType::U8 => parts.build::<u8>().into(),
            DataType::U16 => parts.build::<u16>().into(),
            DataType::U32 => parts.build::<u32>().into(),
            DataType::U64 => parts.build::<u64>().into(),
            DataType::I8 => parts.build::<i8>().into(),
            DataType::I16 => parts.build::<i16>().into(),
            DataType::I32 => parts.build::<i32>().into(),
            DataType::I64 => parts.build::<i64>().into(),
            DataType::F32 => parts.build::<f32>().into(),
            DataType::F64 => parts.build::<f64>().into(),
        }
    }
}

struct CellParts<'a> {
    values: &'a Array3<f64>,
    valid: &'a Array3<bool>,
    nodata: Option<f64>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl CellParts<'_> {
    fn build<T: RasterElement>(self) -> RasterStack<T> {
        let fill = self
            .nodata
            .and_then(T::from_f64)
            .unwrap_or_else(T::default_nodata);

        let mut out = Array3::from_elem(self.values.dim(), fill);
        let mut dropped = false;
        Zip::from(&mut out)
            .and(self.values)
            .and(self.valid)
            .for_each(|o, &v, &ok| {
                if !ok {
                    return;
                }
                match T::from_f64(v).filter(|_| T::DATA_TYPE.can_represent(v)) {
                    Some(cast) => *o = cast,
                    None => dropped = true,
                }
            });
        let masked = dropped || self.nodata.is_some() || self.valid.iter().any(|v| !v);

        let mut stack = RasterStack::from_array(out);
        stack.set_transform(self.transform);
        stack.set_crs(self.crs);
        if masked {
            stack.set_nodata(Some(fill));
        }
        stack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_cells_int_with_mask() {
        let values = Array3::from_shape_vec((1, 1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let valid = Array3::from_shape_vec((1, 1, 3), vec![true, false, true]).unwrap();
        let out = AnyRaster::from_f64_cells(
            DataType::U8,
            &values,
            &valid,
            None,
            GeoTransform::default(),
            None,
        );
        assert_eq!(out.data_type(), DataType::U8);
        let stack = out.downcast::<u8>().unwrap();
        assert_eq!(stack.nodata(), Some(0));
        assert_eq!(stack.data().as_slice().unwrap(), &[1, 0, 3]);
    }

    #[test]
    fn test_unrepresentable_cells_become_null() {
        let values = Array3::from_shape_vec((1, 1, 3), vec![300.0, 7.0, -1.0]).unwrap();
        let valid = Array3::from_elem((1, 1, 3), true);
        let out = AnyRaster::from_f64_cells(
            DataType::U8,
            &values,
            &valid,
            None,
            GeoTransform::default(),
            None,
        );
        let stack = out.downcast::<u8>().unwrap();
        assert_eq!(stack.nodata(), Some(0));
        assert_eq!(stack.data().as_slice().unwrap(), &[0, 7, 0]);
        assert_eq!(
            out.validity_mask().as_slice().unwrap(),
            &[false, true, false]
        );
    }

    #[test]
    fn test_from_f64_cells_float_unmasked() {
        let values = Array3::from_shape_vec((1, 1, 2), vec![0.5, 1.5]).unwrap();
        let valid = Array3::from_elem((1, 1, 2), true);
        let out = AnyRaster::from_f64_cells(
            DataType::F32,
            &values,
            &valid,
            None,
            GeoTransform::default(),
            None,
        );
        assert!(out.downcast::<f64>().is_none());
        let stack = out.downcast::<f32>().unwrap();
        assert_eq!(stack.nodata(), None);
        assert_eq!(stack.data()[[0, 0, 1]], 1.5);
    }
}
