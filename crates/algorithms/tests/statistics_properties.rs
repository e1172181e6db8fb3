//! End-to-end behavior of the frequency statistics, zonal tables and windows.

use std::collections::HashSet;

use approx::assert_relative_eq;
use geo::{Geometry, LineString, Polygon};
use gridstat_algorithms::statistics::{
    BandTable, FrequencyTable, ResultTable, Statistic, ZonalParams, aggregate, zonal_stats,
    zonal_stats_with,
};
use gridstat_algorithms::vector::Coverage;
use gridstat_core::vector::FeatureCollection;
use gridstat_core::{Error, GeoTransform, RasterStack};
use ndarray::Array3;

/// Single-band raster on unit cells with its top-left corner at (0, rows)
fn grid(rows: usize, cols: usize, values: Vec<f64>) -> RasterStack<f64> {
    let data = Array3::from_shape_vec((1, rows, cols), values).unwrap();
    let mut stack = RasterStack::from_array(data);
    stack.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
    stack
}

fn zone_grid(rows: usize, cols: usize, labels: Vec<i32>) -> RasterStack<i32> {
    let data = Array3::from_shape_vec((1, rows, cols), labels).unwrap();
    let mut stack = RasterStack::from_array(data);
    stack.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
    stack
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
        vec![],
    ))
}

// ---------------------------------------------------------------------------
// Finalizers
// ---------------------------------------------------------------------------

#[test]
fn mode_ties_pick_the_smaller_value() {
    let t = FrequencyTable::from_values(&[3.0, 3.0, 5.0, 5.0]);
    assert_eq!(t.mode(), 3.0);

    // Insertion order must not matter
    let t = FrequencyTable::from_values(&[5.0, 5.0, 3.0, 3.0]);
    assert_eq!(t.mode(), 3.0);
}

#[test]
fn four_equally_frequent_values() {
    let t = FrequencyTable::from_values(&[1.0, 2.0, 3.0, 4.0]);
    assert_relative_eq!(t.entropy(), 4.0_f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(t.asm(), 0.25, epsilon = 1e-12);
}

#[test]
fn unique_mode_and_count_of_one_zone() {
    let data = grid(2, 3, vec![1.0, 1.0, 2.0, 3.0, 3.0, 3.0]);
    let zones = zone_grid(2, 3, vec![1; 6]);
    let stats = [Statistic::Unique, Statistic::Mode, Statistic::Count];
    let table = zonal_stats(&zones, &data, &stats, None).unwrap();

    assert_eq!(table.get(1, 1, Statistic::Unique), Some(3.0));
    assert_eq!(table.get(1, 1, Statistic::Mode), Some(3.0));
    assert_eq!(table.get(1, 1, Statistic::Count), Some(6.0));
}

// ---------------------------------------------------------------------------
// Zonal tables
// ---------------------------------------------------------------------------

#[test]
fn empty_zone_is_nan_except_count() {
    let data = grid(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let fc: FeatureCollection = vec![
        square(0.0, 0.0, 2.0, 2.0),
        // Inside the extent, but holds no cell center
        square(0.1, 0.1, 0.3, 0.3),
    ]
    .into_iter()
    .collect();

    let params = ZonalParams {
        stats: Statistic::ZONAL.to_vec(),
        coverage: Coverage::CellCenter,
        ..Default::default()
    };
    let table = zonal_stats_with(&fc, &data, &params).unwrap();

    assert_eq!(table.get(1, 1, Statistic::Count), Some(4.0));
    for stat in Statistic::ZONAL {
        let v = table.get(1, 2, stat).unwrap();
        if stat == Statistic::Count {
            assert_eq!(v, 0.0);
        } else {
            assert!(v.is_nan(), "{stat} of an empty zone should be NaN, got {v}");
        }
    }
}

#[test]
fn two_bands_five_zones_give_ten_distinct_rows() {
    let labels: Vec<i32> = (0..10).map(|i| i % 5 + 1).collect();
    let zones = zone_grid(2, 5, labels);
    let values = Array3::from_shape_fn((2, 2, 5), |(b, r, c)| (b * 100 + r * 5 + c) as f64);
    let mut data = RasterStack::from_array(values);
    data.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));

    let table = zonal_stats(&zones, &data, &[Statistic::Sum], None).unwrap();
    assert_eq!(table.len(), 10);

    let index: HashSet<usize> = table.index().iter().copied().collect();
    assert_eq!(index.len(), 10);

    let pairs: HashSet<(usize, i64)> = table
        .bands()
        .iter()
        .copied()
        .zip(table.zones().iter().copied())
        .collect();
    assert_eq!(pairs.len(), 10);

    // Band 1 rows come before band 2 rows
    assert_eq!(&table.bands()[..5], &[1, 1, 1, 1, 1]);
    assert_eq!(table.get(2, 3, Statistic::Sum), Some(100.0 + 2.0 + 100.0 + 7.0));
}

#[test]
fn repeated_band_is_rejected() {
    let part = |band| BandTable {
        band,
        columns: vec![vec![1.0, 2.0]],
    };
    let err = ResultTable::assemble(&[Statistic::Mean], &[1, 2], vec![part(1), part(1)]).unwrap_err();
    assert!(matches!(err, Error::DuplicateRowIndex { .. }));
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

#[test]
fn partial_windows_are_dropped() {
    let data = grid(5, 7, (0..35).map(f64::from).collect());
    let out = aggregate(&data, [2, 3], Statistic::Count).unwrap();
    assert_eq!(out.shape(), (1, 2, 2));

    // Every kept window is full: nothing was padded
    let counts = out.downcast::<f64>().unwrap();
    assert!(counts.data().iter().all(|&c| c == 6.0));
}

#[test]
fn window_is_null_only_when_every_cell_is_null() {
    let nan = f64::NAN;
    #[rustfmt::skip]
    let data = grid(2, 6, vec![
        nan, nan,   nan, 4.0,   nan, nan,
        nan, nan,   nan, nan,   2.0, 6.0,
    ]);
    let out = aggregate(&data, [2, 2], Statistic::Mean).unwrap();
    let mask = out.validity_mask();
    let means = out.downcast::<f64>().unwrap();

    assert!(!mask[[0, 0, 0]]);
    assert!(mask[[0, 0, 1]]);
    assert_relative_eq!(means.data()[[0, 0, 1]], 4.0);
    assert!(mask[[0, 0, 2]]);
    assert_relative_eq!(means.data()[[0, 0, 2]], 4.0);
}
