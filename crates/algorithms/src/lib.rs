//! # gridstat algorithms
//!
//! Statistics over chunked rasters.
//!
//! ## Operations
//!
//! - **zonal_stats**: per-zone statistics of a multi-band raster, zones given
//!   as vector features or an integer raster
//! - **aggregate**: coarsen a raster by reducing blocks of cells
//! - **local_stats**: reduce the band axis of a raster
//! - **regions**: label connected patches of equal value
//!
//! Categorical statistics (mode, entropy, ASM, unique count) are computed by
//! merging per-chunk frequency tables, so results never depend on how the
//! raster is chunked or in which order partial results are combined.

pub(crate) mod maybe_rayon;
pub mod statistics;
pub mod vector;

pub use gridstat_parallel::ProcessingMode;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::statistics::{
        Aggregate, AggregateParams, Connectivity, FrequencyTable, LocalParams, LocalStatistic,
        LocalStats, RegionParams, Regions, ResultTable, Statistic, ZonalParams, ZoneLayer,
        aggregate, local_stats, regions, zonal_stats, zonal_stats_with,
    };
    pub use crate::vector::Coverage;
    pub use gridstat_core::prelude::*;
    pub use gridstat_parallel::ProcessingMode;
}
