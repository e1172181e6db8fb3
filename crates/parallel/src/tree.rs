//! Merge-tree reduction
//!
//! Partial results are merged level by level. Each level groups the current
//! partials into runs of `fan_in` and combines every run independently, so
//! all combine nodes on one level can run at the same time. The tree shape is
//! a scheduling detail: callers must supply an associative and commutative
//! combine for the result to be independent of it.

use crate::strategy::{ParallelStrategy, ProcessingMode};

/// Default number of partials merged by one combine node
pub const DEFAULT_FAN_IN: usize = 8;

/// Reduce `partials` to a single value through a merge tree.
///
/// `combine` receives between one and `fan_in` partials and must return their
/// merge. Returns `None` for an empty input. A `fan_in` below 2 is treated as 2.
pub fn tree_reduce<T, F>(
    mode: &ProcessingMode,
    partials: Vec<T>,
    fan_in: usize,
    combine: F,
) -> Option<T>
where
    T: Send,
    F: Fn(Vec<T>) -> T + Sync + Send,
{
    let fan_in = fan_in.max(2);
    let mut level = partials;
    let mut depth = 0usize;

    while level.len() > 1 {
        let mut groups: Vec<Vec<T>> = Vec::with_capacity(level.len().div_ceil(fan_in));
        let mut current = Vec::with_capacity(fan_in);
        for item in level {
            current.push(item);
            if current.len() == fan_in {
                groups.push(std::mem::replace(&mut current, Vec::with_capacity(fan_in)));
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }

        level = mode.par_map_owned(groups, &combine);
        depth += 1;
    }

    if depth > 0 {
        tracing::trace!(depth, fan_in, "merge tree reduced");
    }
    level.pop()
}
