//! Row loops that run on rayon when the `parallel` feature is on.
//!
//! Without the feature, `into_par_iter()` falls back to `into_iter()`, so
//! `.map()`, `.flat_map()` and `.collect()` resolve to the `Iterator` methods
//! and the same loop body compiles either way.

#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
