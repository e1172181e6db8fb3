//! Frequency tables: the exchange type of categorical reductions
//!
//! Mode, entropy, angular second moment and unique counts cannot be computed
//! from fixed-size partial results. Each chunk is therefore reduced to a table
//! of `value -> occurrences` ([`FrequencyTable::from_values`]), tables are
//! merged through an arbitrary merge tree ([`FrequencyTable::combine`]), and a
//! finalizer turns the fully merged table into one scalar.
//!
//! Entropy and ASM use `p_i = count_i / m`, where `m` is the number of
//! *distinct* values in the table rather than the number of observations.

use std::collections::HashMap;

/// Hashable identity of a cell value.
///
/// Values are keyed by their IEEE-754 bit pattern so integer codes and float
/// codes hash exactly. `-0.0` is folded onto `0.0`; NaN has no key.
///
/// Cells reach the key as `f64`, so 64-bit integer codes are exact only up to
/// `2^53` in magnitude. Larger codes that round to the same double share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueKey(u64);

impl ValueKey {
    /// Key for `value`, or `None` for NaN
    pub fn new(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        let value = if value == 0.0 { 0.0 } else { value };
        Some(Self(value.to_bits()))
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// Occurrence counts of distinct non-null values.
///
/// Invariant: `total()` equals the sum of all counts, which equals the number
/// of non-null values contributed by every chunk merged into the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<ValueKey, u64>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the non-null values of one chunk.
    ///
    /// NaN cells are nulls and are skipped; an empty or all-null chunk yields
    /// an empty table.
    pub fn from_values(values: &[f64]) -> Self {
        let mut table = Self::new();
        for &v in values {
            table.insert(v);
        }
        table
    }

    /// Record one value. Returns `false` when the value was null.
    pub fn insert(&mut self, value: f64) -> bool {
        self.insert_n(value, 1)
    }

    /// Record `n` occurrences of one value. Returns `false` when the value was null.
    pub fn insert_n(&mut self, value: f64, n: u64) -> bool {
        match ValueKey::new(value) {
            Some(key) => {
                if n > 0 {
                    *self.counts.entry(key).or_insert(0) += n;
                    self.total += n;
                }
                true
            }
            None => false,
        }
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of values counted
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Occurrences of `value`
    pub fn count(&self, value: f64) -> u64 {
        ValueKey::new(value)
            .and_then(|k| self.counts.get(&k).copied())
            .unwrap_or(0)
    }

    /// `(value, count)` pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.counts.iter().map(|(k, &c)| (k.value(), c))
    }

    /// Fold `other` into `self`
    pub fn merge_from(&mut self, other: FrequencyTable) {
        self.total += other.total;
        for (key, count) in other.counts {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    /// Merge two tables. The larger table absorbs the smaller one.
    pub fn merge(self, other: FrequencyTable) -> FrequencyTable {
        let (mut big, small) = if self.counts.len() >= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        big.merge_from(small);
        big
    }

    /// Merge any number of tables. Associative and commutative: the result
    /// does not depend on how the inputs were grouped or ordered.
    pub fn combine<I>(tables: I) -> FrequencyTable
    where
        I: IntoIterator<Item = FrequencyTable>,
    {
        tables.into_iter().fold(FrequencyTable::new(), FrequencyTable::merge)
    }

    // Summation order is fixed so results do not depend on hash order.
    fn sorted_counts(&self) -> Vec<u64> {
        let mut counts: Vec<u64> = self.counts.values().copied().collect();
        counts.sort_unstable();
        counts
    }

    /// Number of distinct values. Zero for an empty table.
    pub fn unique_count(&self) -> u64 {
        self.counts.len() as u64
    }

    /// Most frequent value; the smallest value wins a tie. NaN when empty.
    pub fn mode(&self) -> f64 {
        let mut best: Option<(u64, f64)> = None;
        for (value, count) in self.iter() {
            best = match best {
                Some((bc, bv)) if count < bc || (count == bc && value >= bv) => Some((bc, bv)),
                _ => Some((count, value)),
            };
        }
        best.map_or(f64::NAN, |(_, v)| v)
    }

    /// `-Σ p ln p` with `p = count / distinct`. NaN when empty.
    pub fn entropy(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let frac = 1.0 / self.counts.len() as f64;
        self.sorted_counts()
            .into_iter()
            .map(|c| {
                let p = c as f64 * frac;
                -p * p.ln()
            })
            .sum()
    }

    /// Angular second moment `Σ p²` with `p = count / distinct`. NaN when empty.
    pub fn asm(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        let frac = 1.0 / self.counts.len() as f64;
        self.sorted_counts()
            .into_iter()
            .map(|c| {
                let p = c as f64 * frac;
                p * p
            })
            .sum()
    }
}

impl FromIterator<f64> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        table.extend(iter);
        table
    }
}

impl Extend<f64> for FrequencyTable {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}
