//! Model plugins: drift/diffusion pairs an integrator steps forward.
//!
//! Kept intentionally small — a single classical oscillator, not the
//! multi-mode phase-space models a real quantum-optics stack would carry —
//! so the seam between `simrun-core` and a model plugin stays exercised
//! without dragging numerical depth into this reference crate.

mod van_der_pol;

pub use van_der_pol::VanDerPolModel;

/// Shared shape every model plugin in this crate implements. Not part of
/// `simrun-core`: the core only ever sees `Arc<dyn Plugin>` and an engine
/// downcasts to the concrete model type(s) it was written against.
pub trait DriftDiffusionModel: std::fmt::Debug {
    /// Dimension of the state vector.
    fn dim(&self) -> usize;
    fn initial_state(&self) -> Vec<f64>;
    fn drift(&self, t: f64, state: &[f64]) -> Vec<f64>;
    /// Per-component noise scale; this crate only models diagonal,
    /// additive noise (one Wiener increment per state component).
    fn diffusion(&self, t: f64, state: &[f64]) -> Vec<f64>;
    fn state_names(&self) -> Vec<String>;
}
