//! Parallel processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a set of independent tasks is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global thread pool
    #[default]
    Parallel,
    /// Parallel processing on a dedicated pool with this many threads
    ParallelWith(usize),
}

/// Strategy for executing independent tasks
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Map a function over owned task inputs, preserving order
    fn par_map_owned<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send;
}

#[cfg(feature = "parallel")]
fn with_pool<R: Send>(threads: usize, job: impl FnOnce() -> R + Send) -> R {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(job),
        Err(e) => {
            tracing::warn!("could not build a {threads}-thread pool ({e}), using the global pool");
            job()
        }
    }
}

#[cfg(feature = "parallel")]
impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            ProcessingMode::Parallel => range.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                with_pool(*threads, || range.into_par_iter().map(f).collect())
            }
        }
    }

    fn par_map_owned<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(threads) => {
                with_pool(*threads, || items.into_par_iter().map(f).collect())
            }
        }
    }
}

#[cfg(not(feature = "parallel"))]
impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        range.map(f).collect()
    }

    fn par_map_owned<I, T, F>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send,
    {
        items.into_iter().map(f).collect()
    }
}

impl ProcessingMode {
    /// Run `job` under this mode.
    ///
    /// `ParallelWith(n)` builds its pool once and hands `job` the plain
    /// `Parallel` mode, so nested `par_map` calls reuse that pool.
    pub fn install<R, F>(&self, job: F) -> R
    where
        R: Send,
        F: FnOnce(ProcessingMode) -> R + Send,
    {
        match self {
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                with_pool(*threads, || job(ProcessingMode::Parallel))
            }
            mode => job(*mode),
        }
    }
}

/// Number of worker threads a `Parallel` run will use
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_map_preserves_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * 2);
            assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_par_map_owned() {
        let items: Vec<Vec<u32>> = (0..10).map(|i| vec![i; i as usize]).collect();
        let sums = ProcessingMode::Parallel.par_map_owned(items, |v| v.iter().sum::<u32>());
        assert_eq!(sums[3], 9);
        assert_eq!(sums.len(), 10);
    }
}
