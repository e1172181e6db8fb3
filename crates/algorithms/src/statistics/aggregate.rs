//! Windowed aggregation (coarsening)
//!
//! Merges non-overlapping `fy` x `fx` blocks of cells into one output cell
//! per block. Trailing rows and columns that do not fill a whole block are
//! dropped.

use gridstat_core::raster::{AnyRaster, DataType};
use gridstat_core::{Algorithm, Error, RasterElement, RasterStack, Result, with_any_raster};
use ndarray::{Array3, Axis, s};

use super::statistic::{Operation, Statistic};
use crate::maybe_rayon::*;

/// Parameters for windowed aggregation
#[derive(Debug, Clone)]
pub struct AggregateParams {
    /// Block size as `[rows, cols]`; both at least 1, not both 1
    pub expand_cells: [usize; 2],
    /// Statistic computed over each block
    pub statistic: Statistic,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self {
            expand_cells: [2, 2],
            statistic: Statistic::Mean,
        }
    }
}

/// Aggregate algorithm
#[derive(Debug, Clone, Default)]
pub struct Aggregate;

impl Algorithm for Aggregate {
    type Input = AnyRaster;
    type Output = AnyRaster;
    type Params = AggregateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn description(&self) -> &'static str {
        "Coarsen a raster by reducing non-overlapping blocks of cells"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        with_any_raster!(&input, stack => aggregate(stack, params.expand_cells, params.statistic))
    }
}

/// Coarsen a raster by reducing blocks of cells
///
/// # Arguments
/// * `raster` - Input raster, any number of bands
/// * `expand_cells` - Block size `[rows, cols]`
/// * `stat` - Statistic applied to the valid cells of each block
///
/// # Returns
/// Raster of `rows / fy` x `cols / fx` cells per band. A block is null only
/// when all of its cells are null. The element type is chosen by
/// [`output_type`].
pub fn aggregate<T: RasterElement>(
    raster: &RasterStack<T>,
    expand_cells: [usize; 2],
    stat: Statistic,
) -> Result<AnyRaster> {
    let [fy, fx] = expand_cells;
    if fy == 0 || fx == 0 {
        return Err(Error::invalid_parameter(
            "expand_cells",
            format!("[{fy}, {fx}]"),
            "factors must be at least 1",
        ));
    }
    if fy == 1 && fx == 1 {
        return Err(Error::invalid_parameter(
            "expand_cells",
            format!("[{fy}, {fx}]"),
            "at least one factor must be greater than 1",
        ));
    }
    stat.check(Operation::Aggregate)?;

    let (bands, rows, cols) = raster.shape();
    let (out_rows, out_cols) = (rows / fy, cols / fx);
    tracing::debug!(fy, fx, out_rows, out_cols, %stat, "aggregating");

    let values = raster.to_f64_nan();
    let mut out = Array3::<f64>::from_elem((bands, out_rows, out_cols), f64::NAN);
    let mut valid = Array3::<bool>::from_elem((bands, out_rows, out_cols), false);

    for band in 0..bands {
        let band_values = values.index_axis(Axis(0), band);

        let cells: Vec<(f64, bool)> = (0..out_rows)
            .into_par_iter()
            .flat_map(|orow| {
                let mut row_cells = Vec::with_capacity(out_cols);
                let mut window = Vec::with_capacity(fy * fx);
                for ocol in 0..out_cols {
                    let block = band_values.slice(s![
                        orow * fy..(orow + 1) * fy,
                        ocol * fx..(ocol + 1) * fx
                    ]);
                    window.clear();
                    window.extend(block.iter().copied());

                    if window.iter().all(|v| v.is_nan()) {
                        row_cells.push((f64::NAN, false));
                    } else {
                        row_cells.push((stat.reduce(&window), true));
                    }
                }
                row_cells
            })
            .collect();

        for (i, (v, ok)) in cells.into_iter().enumerate() {
            let (r, c) = (i / out_cols, i % out_cols);
            out[[band, r, c]] = v;
            valid[[band, r, c]] = ok;
        }
    }

    let dtype = output_type(stat, T::DATA_TYPE, (fy * fx) as u64);
    let any_invalid = valid.iter().any(|ok| !ok);
    let nodata = output_nodata(stat, dtype, raster.nodata(), any_invalid);

    Ok(AnyRaster::from_f64_cells(
        dtype,
        &out,
        &valid,
        nodata,
        raster.transform().coarsened(fy, fx),
        raster.crs().cloned(),
    ))
}

/// Element type of a reduction over at most `max_count` values.
///
/// `unique` uses the smallest unsigned type that can count `max_count`
/// values; `mode`, `min` and `max` keep the input type; everything else is
/// floating point.
pub fn output_type(stat: Statistic, input: DataType, max_count: u64) -> DataType {
    match stat {
        Statistic::Unique => DataType::smallest_unsigned_for(max_count),
        Statistic::Mode | Statistic::Min | Statistic::Max => input,
        _ => input.float_promotion(),
    }
}

/// No-data value for a reduced raster, `None` when it needs no mask.
///
/// The input no-data value carries over whenever the output type can hold
/// it. `unique` counts from zero, so it always takes the output type's
/// default.
pub(crate) fn output_nodata<T: RasterElement>(
    stat: Statistic,
    dtype: DataType,
    input_nodata: Option<T>,
    any_invalid: bool,
) -> Option<f64> {
    if input_nodata.is_none() && !any_invalid {
        return None;
    }
    let kept = match stat {
        Statistic::Unique => None,
        _ => input_nodata
            .and_then(|v| v.to_f64())
            .filter(|&v| dtype.can_represent(v)),
    };
    Some(kept.unwrap_or_else(|| dtype.default_nodata()))
}
