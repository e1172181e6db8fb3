//! Burn vector features into a label grid

use geo::dimensions::Dimensions;
use geo::{BoundingRect, Contains, HasDimensions, Intersects, Point, Rect, coord};
use gridstat_core::vector::FeatureCollection;
use gridstat_core::{BoundingBox, GeoTransform};
use ndarray::Array2;

use crate::maybe_rayon::*;

/// Which cells a polygon claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coverage {
    /// Every cell the polygon touches
    #[default]
    AllTouched,
    /// Only cells whose center lies inside the polygon
    CellCenter,
}

/// Extent of every geometry in the collection, `None` if there is none
pub fn collection_bounds(features: &FeatureCollection) -> Option<BoundingBox> {
    features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(|g| g.bounding_rect())
        .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
        .reduce(|a, b| a.union(&b))
}

/// Rasterize features onto a `rows` x `cols` grid.
///
/// Feature `i` burns the label `i + 1`; untouched cells stay 0. Where features
/// overlap, the later feature wins. Points and lines always burn every cell
/// they touch, since a cell center is never inside them.
pub fn rasterize(
    features: &FeatureCollection,
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
    coverage: Coverage,
) -> Array2<i64> {
    let mut labels = Array2::<i64>::zeros((rows, cols));

    for (i, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let Some(window) = cell_window(geometry, rows, cols, transform) else {
            continue;
        };
        let areal = geometry.dimensions() == Dimensions::TwoDimensional;
        let coverage = if areal { coverage } else { Coverage::AllTouched };

        let hits: Vec<(usize, usize)> = window
            .rows
            .clone()
            .into_par_iter()
            .flat_map(|row| {
                window
                    .cols
                    .clone()
                    .filter(|&col| covers(geometry, transform, row, col, coverage, areal))
                    .map(|col| (row, col))
                    .collect::<Vec<_>>()
            })
            .collect();

        let id = (i + 1) as i64;
        for (row, col) in hits {
            labels[[row, col]] = id;
        }
    }

    labels
}

struct CellWindow {
    rows: std::ops::Range<usize>,
    cols: std::ops::Range<usize>,
}

/// Cells that can possibly intersect the geometry's bounding rectangle
fn cell_window(
    geometry: &geo::Geometry<f64>,
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
) -> Option<CellWindow> {
    let rect = geometry.bounding_rect()?;
    let corners = [
        transform.geo_to_pixel(rect.min().x, rect.min().y),
        transform.geo_to_pixel(rect.max().x, rect.min().y),
        transform.geo_to_pixel(rect.min().x, rect.max().y),
        transform.geo_to_pixel(rect.max().x, rect.max().y),
    ];
    if corners.iter().any(|(c, r)| !c.is_finite() || !r.is_finite()) {
        return None;
    }

    let (mut c0, mut c1, mut r0, mut r1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);
    for (c, r) in corners {
        c0 = c0.min(c);
        c1 = c1.max(c);
        r0 = r0.min(r);
        r1 = r1.max(r);
    }

    let clamp = |v: f64, hi: usize| -> usize { v.max(0.0).min(hi as f64) as usize };
    let window = CellWindow {
        rows: clamp(r0.floor(), rows)..clamp(r1.floor() + 1.0, rows),
        cols: clamp(c0.floor(), cols)..clamp(c1.floor() + 1.0, cols),
    };
    if window.rows.is_empty() || window.cols.is_empty() {
        None
    } else {
        Some(window)
    }
}

fn covers(
    geometry: &geo::Geometry<f64>,
    transform: &GeoTransform,
    row: usize,
    col: usize,
    coverage: Coverage,
    areal: bool,
) -> bool {
    match coverage {
        Coverage::CellCenter => {
            let (x, y) = transform.pixel_to_geo(col, row);
            geometry.contains(&Point::new(x, y))
        }
        Coverage::AllTouched => {
            let b = transform.cell_bounds(col, row);
            // Polygons sharing only an edge with a cell do not claim it.
            let eps = if areal {
                1e-9 * b.width().abs().max(b.height().abs())
            } else {
                0.0
            };
            let cell = Rect::new(
                coord! { x: b.min_x + eps, y: b.min_y + eps },
                coord! { x: b.max_x - eps, y: b.max_y - eps },
            );
            geometry.intersects(&cell)
        }
    }
}
