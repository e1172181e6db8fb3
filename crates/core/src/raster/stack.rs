//! Multi-band raster type

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::bounds::BoundingBox;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{ChunkGrid, DataType, GeoTransform, RasterElement};

/// A georeferenced stack of equally shaped bands.
///
/// Data is stored band-major as `(band, row, col)`. All bands share one
/// geotransform, CRS, no-data value and chunk layout. Band indices are 0-based
/// in this API; result tables report 1-based band numbers.
#[derive(Debug, Clone)]
pub struct RasterStack<T: RasterElement> {
    data: Array3<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
    chunks: ChunkGrid,
}

impl<T: RasterElement> RasterStack<T> {
    /// Create a stack from a `(band, row, col)` array, as one chunk
    pub fn from_array(data: Array3<T>) -> Self {
        let (_, rows, cols) = data.dim();
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
            chunks: ChunkGrid::single(rows, cols),
        }
    }

    /// Stack equally shaped bands
    pub fn from_bands(bands: Vec<Array2<T>>) -> Result<Self> {
        let (rows, cols) = bands.first().map(Array2::dim).ok_or(Error::InvalidDimensions {
            width: 0,
            height: 0,
        })?;

        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (i, band) in bands.iter().enumerate() {
            let (br, bc) = band.dim();
            if (br, bc) != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: br,
                    ac: bc,
                });
            }
            data.index_axis_mut(Axis(0), i).assign(band);
        }
        Ok(Self::from_array(data))
    }

    /// Same metadata and chunking, different data of the same grid shape
    pub fn with_data<U: RasterElement>(&self, data: Array3<U>) -> Result<RasterStack<U>> {
        let (_, rows, cols) = data.dim();
        if (rows, cols) != (self.rows(), self.cols()) {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: rows,
                ac: cols,
            });
        }
        Ok(RasterStack {
            data,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
            chunks: self.chunks.clone(),
        })
    }

    /// Re-chunk with a regular chunk size; trailing chunks may be smaller
    pub fn with_chunk_size(self, chunk_rows: usize, chunk_cols: usize) -> Result<Self> {
        let grid = ChunkGrid::regular(self.rows(), self.cols(), chunk_rows, chunk_cols)?;
        self.with_chunk_grid(grid)
    }

    /// Replace the chunk layout. It must cover the grid exactly.
    pub fn with_chunk_grid(mut self, chunks: ChunkGrid) -> Result<Self> {
        let (rows, cols) = chunks.shape();
        if (rows, cols) != (self.rows(), self.cols()) {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: rows,
                ac: cols,
            });
        }
        self.chunks = chunks;
        Ok(self)
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Element data type
    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// Chunk layout shared by every band
    pub fn chunk_grid(&self) -> &ChunkGrid {
        &self.chunks
    }

    /// Geographic extent of the grid
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.cols(), self.rows())
    }

    fn check_band(&self, band: usize) -> Result<()> {
        if band >= self.band_count() {
            return Err(Error::invalid_parameter(
                "band",
                band,
                format!("raster has {} band(s)", self.band_count()),
            ));
        }
        Ok(())
    }

    /// View of one band
    pub fn band_view(&self, band: usize) -> Result<ArrayView2<'_, T>> {
        self.check_band(band)?;
        Ok(self.data.index_axis(Axis(0), band))
    }

    /// Per-cell validity for all bands, `true` where the cell holds data
    pub fn validity_mask(&self) -> Array3<bool> {
        self.data.mapv(|v| !v.is_nodata(self.nodata))
    }

    /// One band as `f64` with null cells replaced by NaN
    pub fn band_f64(&self, band: usize) -> Result<Array2<f64>> {
        let view = self.band_view(band)?;
        Ok(view.mapv(|v| {
            if v.is_nodata(self.nodata) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        }))
    }

    /// All bands as `f64` with null cells replaced by NaN
    pub fn to_f64_nan(&self) -> Array3<f64> {
        self.data.mapv(|v| {
            if v.is_nodata(self.nodata) {
                f64::NAN
            } else {
                v.to_f64().unwrap_or(f64::NAN)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_band() -> RasterStack<i32> {
        let a = array![[1, 2], [3, 4]];
        let b = array![[5, 6], [7, -1]];
        let mut stack = RasterStack::from_bands(vec![a, b]).unwrap();
        stack.set_nodata(Some(-1));
        stack
    }

    #[test]
    fn test_from_bands() {
        let stack = two_band();
        assert_eq!(stack.shape(), (2, 2, 2));
        assert_eq!(stack.band_view(1).unwrap()[[0, 1]], 6);
        assert_eq!(stack.data_type(), DataType::I32);
    }

    #[test]
    fn test_from_bands_size_mismatch() {
        let a = Array2::<u8>::zeros((2, 2));
        let b = Array2::<u8>::zeros((3, 2));
        assert!(RasterStack::from_bands(vec![a, b]).is_err());
    }

    #[test]
    fn test_band_f64_null_to_nan() {
        let stack = two_band();
        let band = stack.band_f64(1).unwrap();
        assert_eq!(band[[0, 0]], 5.0);
        assert!(band[[1, 1]].is_nan());
        assert!(stack.band_f64(2).is_err());
    }

    #[test]
    fn test_validity_mask() {
        let stack = two_band();
        let mask = stack.validity_mask();
        assert_eq!(mask.iter().filter(|&&v| !v).count(), 1);
        assert!(!mask[[1, 1, 1]]);
    }

    #[test]
    fn test_chunking() {
        let stack = RasterStack::from_array(Array3::<f32>::zeros((1, 5, 5)))
            .with_chunk_size(2, 3)
            .unwrap();
        assert_eq!(stack.chunk_grid().len(), 6);

        let bad = ChunkGrid::from_sizes(vec![2, 2], vec![5]);
        let stack = RasterStack::from_array(Array3::<f32>::zeros((1, 5, 5)));
        assert!(stack.with_chunk_grid(bad).is_err());
    }
}
