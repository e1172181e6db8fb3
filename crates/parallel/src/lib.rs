//! # gridstat parallel
//!
//! Scheduling for chunked reductions.
//!
//! This crate provides:
//! - `ProcessingMode`: sequential, global-pool or fixed-size-pool execution
//! - `ParallelStrategy`: parallel map over index ranges and owned task lists
//! - `tree_reduce`: merge tree of arbitrary fan-in whose levels run in parallel
//!
//! Without the `parallel` feature every mode runs sequentially.

pub mod strategy;
pub mod tree;

pub use strategy::{ParallelStrategy, ProcessingMode, num_threads};
pub use tree::{DEFAULT_FAN_IN, tree_reduce};
