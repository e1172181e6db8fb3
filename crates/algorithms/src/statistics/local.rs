//! Local (band-wise) statistics
//!
//! Reduces the band axis of a multi-band raster: every output cell is the
//! statistic of the same cell across all bands. The result has one band.

use std::fmt;
use std::str::FromStr;

use gridstat_core::raster::{AnyRaster, DataType};
use gridstat_core::{Algorithm, Error, RasterElement, RasterStack, Result, with_any_raster};
use ndarray::Array3;

use super::aggregate::{output_nodata, output_type};
use super::statistic::{Operation, Statistic};
use crate::maybe_rayon::*;

/// A statistic across bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatistic {
    Reduce(Statistic),
    /// 0-based band holding the smallest value; the first band wins ties
    MinBand,
    /// 0-based band holding the largest value; the first band wins ties
    MaxBand,
}

impl fmt::Display for LocalStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalStatistic::Reduce(s) => write!(f, "{s}"),
            LocalStatistic::MinBand => f.write_str("minband"),
            LocalStatistic::MaxBand => f.write_str("maxband"),
        }
    }
}

impl FromStr for LocalStatistic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minband" => Ok(LocalStatistic::MinBand),
            "maxband" => Ok(LocalStatistic::MaxBand),
            _ => s.parse().map(LocalStatistic::Reduce),
        }
    }
}

impl From<Statistic> for LocalStatistic {
    fn from(stat: Statistic) -> Self {
        LocalStatistic::Reduce(stat)
    }
}

/// Parameters for local statistics
#[derive(Debug, Clone)]
pub struct LocalParams {
    pub statistic: LocalStatistic,
}

impl Default for LocalParams {
    fn default() -> Self {
        Self {
            statistic: LocalStatistic::Reduce(Statistic::Mean),
        }
    }
}

/// Local statistics algorithm
#[derive(Debug, Clone, Default)]
pub struct LocalStats;

impl Algorithm for LocalStats {
    type Input = AnyRaster;
    type Output = AnyRaster;
    type Params = LocalParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "LocalStats"
    }

    fn description(&self) -> &'static str {
        "Per-cell statistic across the bands of a raster"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        with_any_raster!(&input, stack => local_stats(stack, params.statistic))
    }
}

/// Compute a statistic across bands for every cell
///
/// A cell is null in the output only when it is null in every band.
pub fn local_stats<T: RasterElement>(raster: &RasterStack<T>, stat: LocalStatistic) -> Result<AnyRaster> {
    if let LocalStatistic::Reduce(s) = stat {
        s.check(Operation::Local)?;
    }
    let (bands, rows, cols) = raster.shape();
    if bands == 0 {
        return Err(Error::Algorithm("local statistics need at least one band".into()));
    }
    tracing::debug!(bands, %stat, "local statistics");

    let values = raster.to_f64_nan();

    let cells: Vec<(f64, bool)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_cells = Vec::with_capacity(cols);
            let mut stack = Vec::with_capacity(bands);
            for col in 0..cols {
                stack.clear();
                stack.extend((0..bands).map(|b| values[[b, row, col]]));
                if stack.iter().all(|v| v.is_nan()) {
                    row_cells.push((f64::NAN, false));
                    continue;
                }
                let v = match stat {
                    LocalStatistic::Reduce(s) => s.reduce(&stack),
                    LocalStatistic::MinBand => arg_extreme(&stack, |a, b| a < b),
                    LocalStatistic::MaxBand => arg_extreme(&stack, |a, b| a > b),
                };
                row_cells.push((v, true));
            }
            row_cells
        })
        .collect();

    let mut out = Array3::<f64>::from_elem((1, rows, cols), f64::NAN);
    let mut valid = Array3::<bool>::from_elem((1, rows, cols), false);
    for (i, (v, ok)) in cells.into_iter().enumerate() {
        out[[0, i / cols, i % cols]] = v;
        valid[[0, i / cols, i % cols]] = ok;
    }

    let any_invalid = valid.iter().any(|ok| !ok);
    let (dtype, nodata) = match stat {
        LocalStatistic::Reduce(s) => {
            let dtype = output_type(s, T::DATA_TYPE, bands as u64);
            (dtype, output_nodata(s, dtype, raster.nodata(), any_invalid))
        }
        LocalStatistic::MinBand | LocalStatistic::MaxBand => {
            band_index_type(bands, raster.nodata().is_some() || any_invalid)
        }
    };

    Ok(AnyRaster::from_f64_cells(
        dtype,
        &out,
        &valid,
        nodata,
        *raster.transform(),
        raster.crs().cloned(),
    ))
}

/// Output type and nodata of a band index.
///
/// Unmasked output is the smallest unsigned type holding the last index.
/// Masked output widens to a signed type so its default null never collides
/// with band 0.
fn band_index_type(bands: usize, masked: bool) -> (DataType, Option<f64>) {
    let dtype = DataType::smallest_unsigned_for(bands.saturating_sub(1) as u64);
    if masked {
        let dtype = dtype.signed_widening();
        (dtype, Some(dtype.default_nodata()))
    } else {
        (dtype, None)
    }
}

/// 0-based position of the first value that beats all others under `better`
fn arg_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> f64 {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if !better(v, b) => {}
            _ => best = Some((i, v)),
        }
    }
    best.map_or(f64::NAN, |(i, _)| i as f64)
}
