//! Vector zone handling
//!
//! - Rasterize: burn feature geometries into a label grid

mod rasterize;

pub use rasterize::{Coverage, collection_bounds, rasterize};
