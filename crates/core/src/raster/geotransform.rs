//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;

/// Affine transformation between cell indices and map coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// North-up grids have zero rotation terms and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X direction
    pub pixel_width: f64,
    /// Cell size in Y direction, usually negative
    pub pixel_height: f64,
    #[serde(default)]
    pub row_rotation: f64,
    #[serde(default)]
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a north-up transform with no rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Map coordinates of the center of cell `(row, col)`
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the top-left corner of cell `(row, col)`
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Fractional cell coordinates `(col, row)` of a map position.
    ///
    /// Returns NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (col, row)
    }

    /// Map-space footprint of cell `(row, col)`
    pub fn cell_bounds(&self, col: usize, row: usize) -> BoundingBox {
        corners_to_bounds([
            self.pixel_to_geo_corner(col, row),
            self.pixel_to_geo_corner(col + 1, row),
            self.pixel_to_geo_corner(col, row + 1),
            self.pixel_to_geo_corner(col + 1, row + 1),
        ])
    }

    /// Extent of a `width` x `height` grid
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        corners_to_bounds([
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ])
    }

    /// Transform of a grid whose cells merge `fy` rows and `fx` columns of
    /// this one. The origin stays put.
    pub fn coarsened(&self, fy: usize, fx: usize) -> Self {
        Self {
            origin_x: self.origin_x,
            origin_y: self.origin_y,
            pixel_width: self.pixel_width * fx as f64,
            pixel_height: self.pixel_height * fy as f64,
            row_rotation: self.row_rotation * fy as f64,
            col_rotation: self.col_rotation * fx as f64,
        }
    }
}

fn corners_to_bounds(corners: [(f64, f64); 4]) -> BoundingBox {
    let mut bb = BoundingBox::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        bb.min_x = bb.min_x.min(x);
        bb.min_y = bb.min_y.min(y);
        bb.max_x = bb.max_x.max(x);
        bb.max_y = bb.max_y.max(y);
    }
    bb
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
