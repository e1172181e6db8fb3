//! Zonal statistics
//!
//! Computes statistics of a multi-band data raster for each zone of a zone
//! layer (vector features or an integer raster). Values are grouped by zone
//! one physical chunk at a time, and each zone's per-chunk groups are reduced
//! through a merge tree, so no zone ever needs all of its cells in one piece.
//!
//! The result has one row per (band, zone): see [`ResultTable`].

use std::collections::HashMap;

use gridstat_core::crs::ensure_same_crs;
use gridstat_core::raster::Chunk;
use gridstat_core::{Error, RasterElement, RasterStack, Result};
use gridstat_parallel::{DEFAULT_FAN_IN, ParallelStrategy, ProcessingMode};
use ndarray::Array2;

use super::reducer::ReduceOptions;
use super::statistic::{Operation, Statistic};
use super::table::{BandTable, ResultTable};
use super::zones::{ZoneLayer, Zoning};
use crate::vector::Coverage;

/// Parameters for zonal statistics
#[derive(Debug, Clone)]
pub struct ZonalParams {
    /// Statistics to compute, in output column order
    pub stats: Vec<Statistic>,
    /// How polygons claim cells (vector zones only)
    pub coverage: Coverage,
    /// Zone ids to report for raster zones. Non-positive values are dropped.
    /// When `None`, every distinct positive value in the zone raster is used.
    pub raster_feature_values: Option<Vec<i64>>,
    pub processing: ProcessingMode,
    /// Partials merged per combine node; at least 2
    pub fan_in: usize,
}

impl Default for ZonalParams {
    fn default() -> Self {
        Self {
            stats: vec![Statistic::Mean],
            coverage: Coverage::AllTouched,
            raster_feature_values: None,
            processing: ProcessingMode::Parallel,
            fan_in: DEFAULT_FAN_IN,
        }
    }
}

/// Compute zonal statistics with default scheduling.
///
/// # Arguments
/// * `zones` - Zone layer: a [`FeatureCollection`](gridstat_core::vector::FeatureCollection)
///   or a single-band integer [`RasterStack`]
/// * `data` - Data raster, any number of bands
/// * `stats` - Statistics to compute
/// * `raster_feature_values` - Zone ids to report when `zones` is a raster
///
/// # Returns
/// One row per (band, zone), bands 1-based, zones in zone-id order
pub fn zonal_stats<T, L>(
    zones: &L,
    data: &RasterStack<T>,
    stats: &[Statistic],
    raster_feature_values: Option<&[i64]>,
) -> Result<ResultTable>
where
    T: RasterElement,
    L: ZoneLayer + ?Sized,
{
    let params = ZonalParams {
        stats: stats.to_vec(),
        raster_feature_values: raster_feature_values.map(<[i64]>::to_vec),
        ..Default::default()
    };
    zonal_stats_with(zones, data, &params)
}

/// Compute zonal statistics with explicit parameters
pub fn zonal_stats_with<T, L>(zones: &L, data: &RasterStack<T>, params: &ZonalParams) -> Result<ResultTable>
where
    T: RasterElement,
    L: ZoneLayer + ?Sized,
{
    if params.stats.is_empty() {
        return Err(Error::EmptyStatistics);
    }
    for stat in &params.stats {
        stat.check(Operation::Zonal)?;
    }
    if params.fan_in < 2 {
        return Err(Error::invalid_parameter(
            "fan_in",
            params.fan_in,
            "a combine node needs at least 2 inputs",
        ));
    }

    let (bands, rows, cols) = data.shape();
    zones.validate(rows, cols)?;
    ensure_same_crs(zones.crs(), data.crs())?;

    let requested = params.raster_feature_values.as_deref();
    if !zones.overlaps(&data.bounds()) {
        let zone_ids = zones.zone_ids(requested)?;
        tracing::debug!(zones = zone_ids.len(), "zones do not overlap the data extent");
        return empty_result(&params.stats, &zone_ids, bands);
    }

    params.processing.install(|mode| {
        let zoning = Zoning::resolve(zones, rows, cols, data.transform(), params.coverage, requested)?;
        let chunks = data.chunk_grid().chunks();
        tracing::debug!(
            zones = zoning.zone_count(),
            bands,
            chunks = chunks.len(),
            "label grid built"
        );

        let options = ReduceOptions {
            mode,
            fan_in: params.fan_in,
        };
        let offsets = zoning.offsets();

        let mut parts = Vec::with_capacity(bands);
        for band in 0..bands {
            let values = data.band_f64(band)?;
            let slices = slice_by_zone(&values, zoning.labels(), &offsets, &chunks, zoning.zone_count(), mode);
            let columns = params
                .stats
                .iter()
                .map(|&stat| reduce_zones(stat, &slices, &options))
                .collect();
            parts.push(BandTable {
                band: band + 1,
                columns,
            });
            tracing::debug!(band = band + 1, "band reduced");
        }

        ResultTable::assemble(&params.stats, zoning.zone_ids(), parts)
    })
}

/// Every zone of every band marked absent
fn empty_result(stats: &[Statistic], zone_ids: &[i64], bands: usize) -> Result<ResultTable> {
    let parts = (0..bands)
        .map(|band| BandTable {
            band: band + 1,
            columns: stats
                .iter()
                .map(|s| vec![s.absent_value(); zone_ids.len()])
                .collect(),
        })
        .collect();
    ResultTable::assemble(stats, zone_ids, parts)
}

/// Group one band's values by zone, chunk by chunk.
///
/// `slices[z]` holds one run of values for every chunk that contains a cell
/// of zone `z`; null cells are kept as NaN. A zone with no runs has no cells.
fn slice_by_zone(
    values: &Array2<f64>,
    labels: &Array2<i64>,
    offsets: &HashMap<i64, usize>,
    chunks: &[Chunk],
    zone_count: usize,
    mode: ProcessingMode,
) -> Vec<Vec<Vec<f64>>> {
    let per_chunk: Vec<Vec<(usize, Vec<f64>)>> = mode.par_map(0..chunks.len(), |i| {
        let chunk = chunks[i];
        let mut groups: HashMap<usize, Vec<f64>> = HashMap::new();
        for row in chunk.row_range() {
            for col in chunk.col_range() {
                if let Some(&zone) = offsets.get(&labels[[row, col]]) {
                    groups.entry(zone).or_default().push(values[[row, col]]);
                }
            }
        }
        groups.into_iter().collect()
    });

    let mut slices: Vec<Vec<Vec<f64>>> = vec![Vec::new(); zone_count];
    for groups in per_chunk {
        for (zone, run) in groups {
            slices[zone].push(run);
        }
    }
    slices
}

/// One statistic for every zone
fn reduce_zones(stat: Statistic, slices: &[Vec<Vec<f64>>], options: &ReduceOptions) -> Vec<f64> {
    options.mode.par_map(0..slices.len(), |zone| {
        let runs = &slices[zone];
        if runs.is_empty() {
            return stat.absent_value();
        }
        let chunks: Vec<&[f64]> = runs.iter().map(Vec::as_slice).collect();
        stat.reduce_chunks(&chunks, options)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{Geometry, LineString, Polygon};
    use gridstat_core::vector::FeatureCollection;
    use gridstat_core::{CRS, GeoTransform};
    use ndarray::{Array3, array};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        ))
    }

    /// 4x4 grid, top-left (0, 4), unit cells; value = row * 4 + col
    fn data() -> RasterStack<f64> {
        let values = Array3::from_shape_fn((1, 4, 4), |(_, r, c)| (r * 4 + c) as f64);
        let mut stack = RasterStack::from_array(values);
        stack.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        stack
    }

    /// Zone 1 = left half, zone 2 = right half
    fn zone_raster() -> RasterStack<i32> {
        let z = Array3::from_shape_fn((1, 4, 4), |(_, _, c)| if c < 2 { 1 } else { 2 });
        let mut stack = RasterStack::from_array(z);
        stack.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        stack
    }

    #[test]
    fn test_zonal_raster_zones() {
        let table = zonal_stats(
            &zone_raster(),
            &data(),
            &[Statistic::Count, Statistic::Mean, Statistic::Min, Statistic::Max],
            None,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.zones(), &[1, 2]);
        assert_eq!(table.get(1, 1, Statistic::Count), Some(8.0));
        // Left half: 0,1,4,5,8,9,12,13
        assert_relative_eq!(table.get(1, 1, Statistic::Mean).unwrap(), 6.5, epsilon = 1e-12);
        assert_eq!(table.get(1, 2, Statistic::Min), Some(2.0));
        assert_eq!(table.get(1, 2, Statistic::Max), Some(15.0));
    }

    #[test]
    fn test_zonal_vector_zones() {
        let fc: FeatureCollection = vec![square(0.0, 2.0, 2.0, 4.0), square(2.0, 0.0, 4.0, 2.0)]
            .into_iter()
            .collect();
        let table = zonal_stats(&fc, &data(), &[Statistic::Sum, Statistic::Unique], None).unwrap();
        // Zone 1: cells 0,1,4,5 ; zone 2: cells 10,11,14,15
        assert_eq!(table.get(1, 1, Statistic::Sum), Some(10.0));
        assert_eq!(table.get(1, 2, Statistic::Sum), Some(50.0));
        assert_eq!(table.get(1, 2, Statistic::Unique), Some(4.0));
    }

    #[test]
    fn test_chunking_does_not_change_results() {
        let stats = Statistic::ZONAL.to_vec();
        let whole = zonal_stats(&zone_raster(), &data(), &stats, None).unwrap();
        for (cr, cc) in [(1, 1), (3, 2), (4, 1)] {
            let chunked = data().with_chunk_size(cr, cc).unwrap();
            for fan_in in [2, 3] {
                let params = ZonalParams {
                    stats: stats.clone(),
                    fan_in,
                    ..Default::default()
                };
                let table = zonal_stats_with(&zone_raster(), &chunked, &params).unwrap();
                for &stat in &stats {
                    let a = whole.column(stat).unwrap();
                    let b = table.column(stat).unwrap();
                    for (x, y) in a.iter().zip(b) {
                        assert_relative_eq!(*x, *y, epsilon = 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_absent_and_all_null_zones() {
        let mut values = data();
        let mut raw = values.data().clone();
        for r in 0..4 {
            raw[[0, r, 0]] = -1.0;
            raw[[0, r, 1]] = -1.0;
        }
        values = values.with_data(raw).unwrap();
        values.set_nodata(Some(-1.0));

        let stats = [Statistic::Count, Statistic::Unique, Statistic::Mean, Statistic::Sum];
        let table = zonal_stats(&zone_raster(), &values, &stats, Some(&[1, 2, 9])).unwrap();
        assert_eq!(table.zones(), &[1, 2, 9]);

        // Zone 1 has cells, all null
        assert_eq!(table.get(1, 1, Statistic::Count), Some(0.0));
        assert_eq!(table.get(1, 1, Statistic::Unique), Some(0.0));
        assert!(table.get(1, 1, Statistic::Mean).unwrap().is_nan());
        assert!(table.get(1, 1, Statistic::Sum).unwrap().is_nan());

        // Zone 9 has no cells
        assert_eq!(table.get(1, 9, Statistic::Count), Some(0.0));
        assert!(table.get(1, 9, Statistic::Unique).unwrap().is_nan());
    }

    #[test]
    fn test_raster_zones_without_transform_match_by_cell() {
        let zones = RasterStack::from_array(Array3::<u8>::ones((1, 4, 4)));
        let table = zonal_stats(&zones, &data(), &[Statistic::Count, Statistic::Mean], None).unwrap();
        assert_eq!(table.get(1, 1, Statistic::Count), Some(16.0));
        assert_relative_eq!(table.get(1, 1, Statistic::Mean).unwrap(), 7.5);
    }

    #[test]
    fn test_no_overlap_gives_empty_result() {
        let fc: FeatureCollection = vec![square(100.0, 100.0, 101.0, 101.0)].into_iter().collect();
        let two_band = RasterStack::from_array(Array3::<f32>::ones((2, 4, 4)));
        let table = zonal_stats(&fc, &two_band, &[Statistic::Mode, Statistic::Count], None).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.bands(), &[1, 2]);
        assert!(table.column(Statistic::Mode).unwrap().iter().all(|v| v.is_nan()));
        assert!(table.column(Statistic::Count).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_multi_band_row_order() {
        let mut stack = RasterStack::from_array(Array3::from_shape_fn((3, 4, 4), |(b, _, _)| b as u16));
        stack.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let table = zonal_stats(&zone_raster(), &stack, &[Statistic::Max], None).unwrap();
        assert_eq!(table.index(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(table.bands(), &[1, 1, 2, 2, 3, 3]);
        assert_eq!(table.get(3, 2, Statistic::Max), Some(2.0));
    }

    #[test]
    fn test_validation_errors() {
        let d = data();
        assert!(matches!(
            zonal_stats(&zone_raster(), &d, &[], None),
            Err(Error::EmptyStatistics)
        ));
        assert!(zonal_stats(&zone_raster(), &d, &[Statistic::Prod], None).is_err());

        let float_zones = RasterStack::from_array(Array3::<f64>::ones((1, 4, 4)));
        assert!(matches!(
            zonal_stats(&float_zones, &d, &[Statistic::Mean], None),
            Err(Error::InvalidFeatureRaster(_))
        ));

        let mut fc: FeatureCollection = vec![square(0.0, 0.0, 1.0, 1.0)].into_iter().collect();
        fc.crs = Some(CRS::from_epsg(4326));
        let mut projected = data();
        projected.set_crs(Some(CRS::from_epsg(32633)));
        assert!(matches!(
            zonal_stats(&fc, &projected, &[Statistic::Mean], None),
            Err(Error::CrsMismatch(_, _))
        ));

        let params = ZonalParams {
            fan_in: 1,
            ..Default::default()
        };
        assert!(zonal_stats_with(&zone_raster(), &d, &params).is_err());
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let stats = [Statistic::Entropy, Statistic::Asm, Statistic::Median];
        let seq = ZonalParams {
            stats: stats.to_vec(),
            processing: ProcessingMode::Sequential,
            ..Default::default()
        };
        let pool = ZonalParams {
            processing: ProcessingMode::ParallelWith(2),
            ..seq.clone()
        };
        let chunked = data().with_chunk_size(2, 2).unwrap();
        let a = zonal_stats_with(&zone_raster(), &chunked, &seq).unwrap();
        let b = zonal_stats_with(&zone_raster(), &chunked, &pool).unwrap();
        assert_eq!(a.len(), b.len());
        for &stat in &stats {
            for (x, y) in a.column(stat).unwrap().iter().zip(b.column(stat).unwrap()) {
                assert_relative_eq!(*x, *y, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_raster_zone_with_i64_values() {
        let z = array![[5_i64, 5], [0, 6]].insert_axis(ndarray::Axis(0));
        let zones = RasterStack::from_array(z);
        let values = RasterStack::from_array(array![[1.0_f64, 3.0], [9.0, 4.0]].insert_axis(ndarray::Axis(0)));
        let table = zonal_stats(&zones, &values, &[Statistic::Mean], None).unwrap();
        assert_eq!(table.zones(), &[5, 6]);
        assert_eq!(table.get(1, 5, Statistic::Mean), Some(2.0));
        assert_eq!(table.get(1, 6, Statistic::Mean), Some(4.0));
    }
}
