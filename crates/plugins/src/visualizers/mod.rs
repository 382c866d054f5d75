//! Visualizer plugins: summarize a result for a human, without a plotting
//! dependency — the other example repos' plotting stacks are overkill for
//! this intentionally small reference crate.

mod summary;

pub use summary::SummaryVisualizer;

pub trait Visualizer: std::fmt::Debug {
    /// Render a summary of `result` to `path`, returning the file written.
    fn render(&self, result: &dyn simrun_core::plugins::ResultObject, path: &std::path::Path) -> simrun_core::error::CoreResult<std::path::PathBuf>;
}
