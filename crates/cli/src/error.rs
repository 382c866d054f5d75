//! CLI-level error wrapping: every `CoreError` maps to exit code 1, with its
//! own `Display` message printed to stderr (`spec.md` §7).

use eyre::Report;

pub fn report(err: simrun_core::CoreError) -> Report {
    eyre::eyre!("[{}] {err}", err.code())
}
