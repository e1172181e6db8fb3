//! Chunked statistics over raster cells
//!
//! - **frequency**: value frequency tables and their finalizers
//! - **reducer**: extract / combine / finalize decomposition of every statistic
//! - **zonal**: statistics per zone, per band
//! - **aggregate**: block-wise coarsening
//! - **local**: statistics across bands
//! - **regions**: connected-component labeling

pub mod aggregate;
pub mod frequency;
pub mod local;
pub mod reducer;
pub mod regions;
pub mod statistic;
pub mod table;
pub mod zonal;
pub mod zones;

pub use aggregate::{Aggregate, AggregateParams, aggregate, output_type};
pub use frequency::{FrequencyTable, ValueKey};
pub use local::{LocalParams, LocalStatistic, LocalStats, local_stats};
pub use reducer::{ReduceOptions, Reducer, reduce_chunks};
pub use regions::{Connectivity, REGION_NODATA, RegionParams, Regions, regions};
pub use statistic::{Operation, Statistic};
pub use table::{BandTable, ResultTable, RowKey};
pub use zonal::{ZonalParams, zonal_stats, zonal_stats_with};
pub use zones::{ZoneLayer, Zoning};
