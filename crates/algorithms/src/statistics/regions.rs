//! Region labeling
//!
//! Splits each band into connected patches of equal value. Every class (a
//! distinct non-zero value, or a user-listed value) is labeled separately and
//! its patches receive consecutive ids; numbering continues from one class to
//! the next, so ids are unique within a band. Zero cells belong to no region.

use std::collections::HashMap;

use gridstat_core::raster::AnyRaster;
use gridstat_core::{Algorithm, Error, RasterElement, RasterStack, Result, with_any_raster};
use ndarray::{Array2, Array3, Axis};

use crate::maybe_rayon::*;

/// Which neighbors join a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Rook neighbors
    #[default]
    Four,
    /// Rook and bishop neighbors
    Eight,
}

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        const ROOK: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        const QUEEN: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];
        match self {
            Connectivity::Four => &ROOK,
            Connectivity::Eight => &QUEEN,
        }
    }
}

impl TryFrom<usize> for Connectivity {
    type Error = Error;

    fn try_from(n: usize) -> Result<Self> {
        match n {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            _ => Err(Error::invalid_parameter("connectivity", n, "must be 4 or 8")),
        }
    }
}

/// Parameters for region labeling
#[derive(Debug, Clone, Default)]
pub struct RegionParams {
    pub connectivity: Connectivity,
    /// Values labeled as their own class. Other non-zero values are grouped
    /// into one extra class. `None` labels every distinct non-zero value.
    pub unique_values: Option<Vec<i64>>,
}

/// Region labeling algorithm
#[derive(Debug, Clone, Default)]
pub struct Regions;

impl Algorithm for Regions {
    type Input = AnyRaster;
    type Output = RasterStack<u64>;
    type Params = RegionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Regions"
    }

    fn description(&self) -> &'static str {
        "Connected-component labeling of equal-valued patches"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        with_any_raster!(&input, stack => {
            regions(stack, params.connectivity, params.unique_values.as_deref())
        })
    }
}

/// No-data value of the label raster
pub const REGION_NODATA: u64 = u64::MAX;

/// Label connected patches in every band
///
/// # Returns
/// `u64` labels, one band per input band. `0` marks cells in no region; null
/// input cells stay null.
pub fn regions<T: RasterElement>(
    raster: &RasterStack<T>,
    connectivity: Connectivity,
    unique_values: Option<&[i64]>,
) -> Result<RasterStack<u64>> {
    if raster.data_type().is_float() {
        tracing::warn!(dtype = %raster.data_type(), "float values are truncated to integer classes");
    }
    let bands = raster.band_count();
    let valid = raster.validity_mask();

    let labeled: Vec<Array2<u64>> = (0..bands)
        .into_par_iter()
        .map(|b| {
            let band = raster.data().index_axis(Axis(0), b);
            let mask = valid.index_axis(Axis(0), b);
            let values = ndarray::Zip::from(&band)
                .and(&mask)
                .map_collect(|&v, &ok| if ok { num_traits::cast::<T, i64>(v).unwrap_or(0) } else { 0 });
            label_band(&values, connectivity, unique_values)
        })
        .collect();

    let (_, rows, cols) = raster.shape();
    let mut out = Array3::<u64>::zeros((bands, rows, cols));
    for (b, labels) in labeled.into_iter().enumerate() {
        out.index_axis_mut(Axis(0), b).assign(&labels);
    }

    let masked = raster.nodata().is_some() || valid.iter().any(|ok| !ok);
    if masked {
        ndarray::Zip::from(&mut out).and(&valid).for_each(|o, &ok| {
            if !ok {
                *o = REGION_NODATA;
            }
        });
    }

    let mut result = raster.with_data(out)?;
    if masked {
        result.set_nodata(Some(REGION_NODATA));
    }
    Ok(result)
}

/// Label one band of integer classes (0 = background)
fn label_band(values: &Array2<i64>, connectivity: Connectivity, unique_values: Option<&[i64]>) -> Array2<u64> {
    let (rows, cols) = values.dim();

    // Class order decides id order
    let classes: Vec<i64> = match unique_values {
        Some(list) => {
            let mut seen = std::collections::HashSet::new();
            list.iter().copied().filter(|&v| v != 0 && seen.insert(v)).collect()
        }
        None => {
            let mut all: Vec<i64> = values.iter().copied().filter(|&v| v != 0).collect();
            all.sort_unstable();
            all.dedup();
            all
        }
    };
    let class_index: HashMap<i64, usize> = classes.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let other = classes.len();

    // Class slot of every cell; unlisted non-zero values share the last slot
    let slot: Array2<Option<usize>> = values.mapv(|v| {
        if v == 0 {
            None
        } else {
            Some(class_index.get(&v).copied().unwrap_or(other))
        }
    });

    let mut buckets: Vec<Vec<(usize, usize)>> = vec![Vec::new(); other + 1];
    for ((r, c), s) in slot.indexed_iter() {
        if let Some(s) = *s {
            buckets[s].push((r, c));
        }
    }

    let mut labels = Array2::<u64>::zeros((rows, cols));
    let mut next = 0u64;
    for (s, cells) in buckets.iter().enumerate() {
        for &(r, c) in cells {
            if labels[[r, c]] != 0 {
                continue;
            }
            next += 1;
            flood_fill(&slot, &mut labels, (r, c), s, next, connectivity);
        }
    }
    labels
}

fn flood_fill(
    slot: &Array2<Option<usize>>,
    labels: &mut Array2<u64>,
    start: (usize, usize),
    class: usize,
    id: u64,
    connectivity: Connectivity,
) {
    let (rows, cols) = slot.dim();
    let mut stack = vec![start];

    while let Some((r, c)) = stack.pop() {
        if labels[[r, c]] != 0 || slot[[r, c]] != Some(class) {
            continue;
        }
        labels[[r, c]] = id;

        for &(dr, dc) in connectivity.offsets() {
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr >= 0 && nc >= 0 && (nr as usize) < rows && (nc as usize) < cols {
                stack.push((nr as usize, nc as usize));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn single(a: Array2<i32>) -> RasterStack<i32> {
        RasterStack::from_array(a.insert_axis(Axis(0)))
    }

    #[test]
    fn test_four_vs_eight() {
        let r = single(array![[1, 0], [0, 1]]);
        let four = regions(&r, Connectivity::Four, None).unwrap();
        assert_eq!(four.band_view(0).unwrap(), array![[1u64, 0], [0, 2]]);

        let eight = regions(&r, Connectivity::Eight, None).unwrap();
        assert_eq!(eight.band_view(0).unwrap(), array![[1u64, 0], [0, 1]]);
        assert_eq!(eight.nodata(), None);
    }

    #[test]
    fn test_ids_continue_across_values() {
        let r = single(array![[2, 2, 5], [0, 0, 5], [2, 0, 0]]);
        let out = regions(&r, Connectivity::Four, None).unwrap();
        // Value 2: patches {(0,0),(0,1)} -> 1, {(2,0)} -> 2; value 5 -> 3
        assert_eq!(out.band_view(0).unwrap(), array![[1u64, 1, 3], [0, 0, 3], [2, 0, 0]]);
    }

    #[test]
    fn test_unlisted_values_grouped() {
        let r = single(array![[7, 8, 9], [0, 0, 0], [3, 3, 0]]);
        let out = regions(&r, Connectivity::Four, Some(&[3])).unwrap();
        // Listed 3 first, then 7/8/9 as one class
        assert_eq!(out.band_view(0).unwrap(), array![[2u64, 2, 2], [0, 0, 0], [1, 1, 0]]);
    }

    #[test]
    fn test_null_cells_stay_null() {
        let mut r = single(array![[1, -1], [1, 1]]);
        r.set_nodata(Some(-1));
        let out = regions(&r, Connectivity::Four, None).unwrap();
        assert_eq!(out.nodata(), Some(REGION_NODATA));
        assert_eq!(out.band_view(0).unwrap(), array![[1u64, REGION_NODATA], [1, 1]]);
    }

    #[test]
    fn test_per_band_numbering() {
        let data = Array3::from_shape_vec((2, 1, 3), vec![1, 0, 1, 4, 4, 4]).unwrap();
        let r: RasterStack<u8> = RasterStack::from_array(data);
        let out = regions(&r, Connectivity::Eight, None).unwrap();
        assert_eq!(out.band_view(0).unwrap(), array![[1u64, 0, 2]]);
        assert_eq!(out.band_view(1).unwrap(), array![[1u64, 1, 1]]);
    }

    #[test]
    fn test_connectivity_from_usize() {
        assert_eq!(Connectivity::try_from(8).unwrap(), Connectivity::Eight);
        assert!(Connectivity::try_from(6).is_err());
    }
}
