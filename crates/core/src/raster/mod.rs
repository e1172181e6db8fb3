//! Raster data structures
//!
//! - [`RasterStack`]: equally shaped bands sharing metadata and chunk layout
//! - [`AnyRaster`]: a stack whose element type is chosen at runtime
//! - [`ChunkGrid`]: the chunk partition reductions run over

mod chunks;
mod dtype;
mod dynamic;
mod element;
mod geotransform;
mod stack;

pub use chunks::{Chunk, ChunkGrid};
pub use dtype::DataType;
pub use dynamic::AnyRaster;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use stack::RasterStack;
