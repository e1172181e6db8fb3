//! Chunked reductions
//!
//! Every statistic is expressed as a [`Reducer`]: an `extract` step that turns
//! one chunk of cell values into a partial result, an associative and
//! commutative `combine` over partials, and a `finalize` step producing the
//! scalar. [`reduce_chunks`] drives the three steps through a merge tree.
//!
//! Null cells arrive as NaN and are ignored by every reducer.

use gridstat_parallel::{ParallelStrategy, ProcessingMode, tree_reduce};

use super::frequency::FrequencyTable;

/// A statistic decomposed into extract, combine and finalize steps
pub trait Reducer: Sync {
    /// Mergeable summary of some subset of the cells
    type Partial: Send;

    /// Partial for an empty set of cells
    fn identity(&self) -> Self::Partial;

    /// Summarize the non-null values of one chunk
    fn extract(&self, chunk: &[f64]) -> Self::Partial;

    /// Merge partials. Must be associative and commutative.
    fn combine(&self, partials: Vec<Self::Partial>) -> Self::Partial;

    /// Final scalar. NaN when the statistic is undefined for the cells seen.
    fn finalize(&self, partial: Self::Partial) -> f64;
}

/// How a reduction is scheduled
#[derive(Debug, Clone, Copy)]
pub struct ReduceOptions {
    pub mode: ProcessingMode,
    /// Partials merged per combine node
    pub fan_in: usize,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::Parallel,
            fan_in: gridstat_parallel::DEFAULT_FAN_IN,
        }
    }
}

/// Reduce a set of chunks to one scalar.
///
/// Chunks are extracted independently and merged through a tree of combine
/// nodes with at most `options.fan_in` inputs each.
pub fn reduce_chunks<R: Reducer>(reducer: &R, chunks: &[&[f64]], options: &ReduceOptions) -> f64 {
    let leaves = options
        .mode
        .par_map(0..chunks.len(), |i| reducer.extract(chunks[i]));
    let merged = tree_reduce(&options.mode, leaves, options.fan_in, |parts| {
        reducer.combine(parts)
    })
    .unwrap_or_else(|| reducer.identity());
    reducer.finalize(merged)
}

/// Reduce a single slice of values without scheduling
pub fn reduce_values<R: Reducer>(reducer: &R, values: &[f64]) -> f64 {
    reducer.finalize(reducer.extract(values))
}

// ---------------------------------------------------------------------------
// Frequency statistics
// ---------------------------------------------------------------------------

/// Finalizer applied to a merged [`FrequencyTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyStat {
    Mode,
    Entropy,
    Asm,
    Unique,
}

#[derive(Debug, Clone, Copy)]
pub struct FrequencyReducer(pub FrequencyStat);

impl Reducer for FrequencyReducer {
    type Partial = FrequencyTable;

    fn identity(&self) -> FrequencyTable {
        FrequencyTable::new()
    }

    fn extract(&self, chunk: &[f64]) -> FrequencyTable {
        FrequencyTable::from_values(chunk)
    }

    fn combine(&self, partials: Vec<FrequencyTable>) -> FrequencyTable {
        FrequencyTable::combine(partials)
    }

    fn finalize(&self, table: FrequencyTable) -> f64 {
        match self.0 {
            FrequencyStat::Mode => table.mode(),
            FrequencyStat::Entropy => table.entropy(),
            FrequencyStat::Asm => table.asm(),
            FrequencyStat::Unique => table.unique_count() as f64,
        }
    }
}

// ---------------------------------------------------------------------------
// Moment statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentStat {
    Count,
    Sum,
    Mean,
    Var,
    Std,
}

/// Count, sum and centered second moment of a set of values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub count: u64,
    pub sum: f64,
    pub mean: f64,
    pub m2: f64,
}

impl Moments {
    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        let delta = v - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (v - self.mean);
    }

    /// Pairwise merge (Chan et al.)
    fn merge(self, other: Moments) -> Moments {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        Moments {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            mean: self.mean + delta * n_b / n,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / n,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MomentReducer(pub MomentStat);

impl Reducer for MomentReducer {
    type Partial = Moments;

    fn identity(&self) -> Moments {
        Moments::default()
    }

    fn extract(&self, chunk: &[f64]) -> Moments {
        let mut m = Moments::default();
        for &v in chunk.iter().filter(|v| !v.is_nan()) {
            m.push(v);
        }
        m
    }

    fn combine(&self, partials: Vec<Moments>) -> Moments {
        partials.into_iter().fold(Moments::default(), Moments::merge)
    }

    fn finalize(&self, m: Moments) -> f64 {
        if m.count == 0 {
            return match self.0 {
                MomentStat::Count => 0.0,
                _ => f64::NAN,
            };
        }
        let n = m.count as f64;
        match self.0 {
            MomentStat::Count => n,
            MomentStat::Sum => m.sum,
            MomentStat::Mean => m.mean,
            MomentStat::Var => m.m2 / n,
            MomentStat::Std => (m.m2 / n).sqrt(),
        }
    }
}

// ---------------------------------------------------------------------------
// Order statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtremumReducer(pub Extremum);

impl ExtremumReducer {
    fn pick(&self, a: f64, b: f64) -> f64 {
        match self.0 {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }
}

impl Reducer for ExtremumReducer {
    type Partial = Option<f64>;

    fn identity(&self) -> Option<f64> {
        None
    }

    fn extract(&self, chunk: &[f64]) -> Option<f64> {
        chunk
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(|a, b| self.pick(a, b))
    }

    fn combine(&self, partials: Vec<Option<f64>>) -> Option<f64> {
        partials.into_iter().flatten().reduce(|a, b| self.pick(a, b))
    }

    fn finalize(&self, partial: Option<f64>) -> f64 {
        partial.unwrap_or(f64::NAN)
    }
}

/// Median. Partials keep every non-null value.
#[derive(Debug, Clone, Copy)]
pub struct MedianReducer;

impl Reducer for MedianReducer {
    type Partial = Vec<f64>;

    fn identity(&self) -> Vec<f64> {
        Vec::new()
    }

    fn extract(&self, chunk: &[f64]) -> Vec<f64> {
        chunk.iter().copied().filter(|v| !v.is_nan()).collect()
    }

    fn combine(&self, partials: Vec<Vec<f64>>) -> Vec<f64> {
        let mut out = Vec::with_capacity(partials.iter().map(Vec::len).sum());
        for p in partials {
            out.extend(p);
        }
        out
    }

    fn finalize(&self, mut values: Vec<f64>) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        }
    }
}

/// Product of the non-null values. NaN when there are none.
#[derive(Debug, Clone, Copy)]
pub struct ProductReducer;

impl Reducer for ProductReducer {
    type Partial = Option<f64>;

    fn identity(&self) -> Option<f64> {
        None
    }

    fn extract(&self, chunk: &[f64]) -> Option<f64> {
        chunk
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .reduce(|a, b| a * b)
    }

    fn combine(&self, partials: Vec<Option<f64>>) -> Option<f64> {
        partials.into_iter().flatten().reduce(|a, b| a * b)
    }

    fn finalize(&self, partial: Option<f64>) -> f64 {
        partial.unwrap_or(f64::NAN)
    }
}
