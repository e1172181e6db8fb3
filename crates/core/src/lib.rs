//! # gridstat core
//!
//! Core types for the gridstat raster statistics library.
//!
//! This crate provides:
//! - `RasterStack<T>`: multi-band grids with a shared chunk layout
//! - `ChunkGrid`: the chunk partition reductions are scheduled over
//! - `DataType` / `AnyRaster`: runtime element types for typed outputs
//! - `GeoTransform`, `BoundingBox`, `CRS`: georeferencing
//! - `FeatureCollection`: vector features used as zones
//! - The `Algorithm` trait shared by the statistics operations

pub mod bounds;
pub mod crs;
pub mod error;
pub mod raster;
pub mod vector;

pub use bounds::BoundingBox;
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{AnyRaster, ChunkGrid, DataType, GeoTransform, RasterElement, RasterStack};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::Algorithm;
    pub use crate::bounds::BoundingBox;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        AnyRaster, ChunkGrid, DataType, GeoTransform, RasterElement, RasterStack,
    };
    pub use crate::vector::{Feature, FeatureCollection};
}

/// Core trait for the raster operations in gridstat.
///
/// Operations are pure functions of their input and parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
