//! Zone sources and the label grid they resolve to
//!
//! A zone source is either an ordered feature collection (feature `i` is zone
//! `i + 1`) or a single-band integer raster on the data grid (each positive
//! value is a zone). Both resolve to a [`Zoning`]: an `i64` label per data
//! cell plus the ordered list of zone ids to report. Label `0` and any label
//! not in the list mean "no zone".

use std::collections::{BTreeSet, HashMap, HashSet};

use gridstat_core::vector::FeatureCollection;
use gridstat_core::{BoundingBox, CRS, Error, GeoTransform, RasterElement, RasterStack, Result};
use ndarray::Array2;

use crate::vector::{Coverage, collection_bounds, rasterize};

/// Something that can partition a data grid into zones
pub trait ZoneLayer: Sync {
    /// Reject a zone source that cannot be used with a `rows` x `cols` data grid
    fn validate(&self, rows: usize, cols: usize) -> Result<()>;

    fn crs(&self) -> Option<&CRS>;

    /// Whether any zone can reach a data grid covering `extent`
    fn overlaps(&self, extent: &BoundingBox) -> bool;

    /// Ids of the zones to report, in output order
    fn zone_ids(&self, requested: Option<&[i64]>) -> Result<Vec<i64>>;

    /// Label of every cell of the data grid
    fn label_grid(
        &self,
        rows: usize,
        cols: usize,
        transform: &GeoTransform,
        coverage: Coverage,
    ) -> Result<Array2<i64>>;
}

impl ZoneLayer for FeatureCollection {
    fn validate(&self, _rows: usize, _cols: usize) -> Result<()> {
        Ok(())
    }

    fn crs(&self) -> Option<&CRS> {
        FeatureCollection::crs(self)
    }

    fn overlaps(&self, extent: &BoundingBox) -> bool {
        collection_bounds(self).is_some_and(|b| b.overlaps(extent))
    }

    fn zone_ids(&self, requested: Option<&[i64]>) -> Result<Vec<i64>> {
        if requested.is_some() {
            tracing::warn!("explicit zone values only apply to raster zones, ignoring them");
        }
        Ok((1..=self.len() as i64).collect())
    }

    fn label_grid(
        &self,
        rows: usize,
        cols: usize,
        transform: &GeoTransform,
        coverage: Coverage,
    ) -> Result<Array2<i64>> {
        Ok(rasterize(self, rows, cols, transform, coverage))
    }
}

impl<Z: RasterElement> ZoneLayer for RasterStack<Z> {
    fn validate(&self, rows: usize, cols: usize) -> Result<()> {
        if self.band_count() != 1 {
            return Err(Error::InvalidFeatureRaster(format!(
                "expected a single band, found {}",
                self.band_count()
            )));
        }
        if Z::DATA_TYPE.is_float() {
            return Err(Error::InvalidFeatureRaster(format!(
                "expected an integer element type, found {}",
                Z::DATA_TYPE
            )));
        }
        if (self.rows(), self.cols()) != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: self.rows(),
                ac: self.cols(),
            });
        }
        Ok(())
    }

    fn crs(&self) -> Option<&CRS> {
        RasterStack::crs(self)
    }

    /// Raster zones label the data grid cell by cell, so their own
    /// georeferencing never decides coverage.
    fn overlaps(&self, _extent: &BoundingBox) -> bool {
        true
    }

    fn zone_ids(&self, requested: Option<&[i64]>) -> Result<Vec<i64>> {
        if let Some(values) = requested {
            let mut seen = HashSet::new();
            return Ok(values
                .iter()
                .copied()
                .filter(|&v| v > 0 && seen.insert(v))
                .collect());
        }

        let band = self.band_view(0)?;
        let nodata = self.nodata();
        let ids: BTreeSet<i64> = band
            .iter()
            .filter(|v| !v.is_nodata(nodata))
            .filter_map(|&v| num_traits::cast::<Z, i64>(v))
            .filter(|&v| v > 0)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn label_grid(
        &self,
        rows: usize,
        cols: usize,
        _transform: &GeoTransform,
        _coverage: Coverage,
    ) -> Result<Array2<i64>> {
        self.validate(rows, cols)?;
        let nodata = self.nodata();
        Ok(self.band_view(0)?.mapv(|v| {
            if v.is_nodata(nodata) {
                0
            } else {
                num_traits::cast::<Z, i64>(v).unwrap_or(0)
            }
        }))
    }
}

/// Label grid plus the ordered zone ids it is reported by
#[derive(Debug, Clone)]
pub struct Zoning {
    labels: Array2<i64>,
    zone_ids: Vec<i64>,
}

impl Zoning {
    pub fn new(labels: Array2<i64>, zone_ids: Vec<i64>) -> Self {
        Self { labels, zone_ids }
    }

    /// Resolve a zone layer against a data grid
    pub fn resolve<L: ZoneLayer + ?Sized>(
        layer: &L,
        rows: usize,
        cols: usize,
        transform: &GeoTransform,
        coverage: Coverage,
        requested: Option<&[i64]>,
    ) -> Result<Self> {
        let zone_ids = layer.zone_ids(requested)?;
        let labels = layer.label_grid(rows, cols, transform, coverage)?;
        Ok(Self::new(labels, zone_ids))
    }

    pub fn labels(&self) -> &Array2<i64> {
        &self.labels
    }

    pub fn zone_ids(&self) -> &[i64] {
        &self.zone_ids
    }

    pub fn zone_count(&self) -> usize {
        self.zone_ids.len()
    }

    /// Position of each zone id in the output order
    pub fn offsets(&self) -> HashMap<i64, usize> {
        self.zone_ids
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect()
    }
}
