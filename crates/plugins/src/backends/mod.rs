//! Backend plugins: the array/compute layer an engine allocates scratch
//! state through. Kept to a single in-memory `Vec<f64>` backend — exercises
//! the seam `simrun-core`'s [`UnresolvableKind::Backend`] error path guards,
//! without pulling in a real array library.

mod vec_backend;

pub use vec_backend::NativeVecBackend;

pub trait Backend: std::fmt::Debug {
    fn zeros(&self, n: usize) -> Vec<f64>;
}
