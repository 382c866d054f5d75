//! Structured logging initializer.
//!
//! Adapted from the layered `tracing-subscriber` setup used across the
//! workspace: an `EnvFilter` reads `RUST_LOG`, with an optional JSON layer
//! and an optional non-rolling file layer.

use eyre::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Options controlling how logging is initialized, one field per CLI flag
/// in `spec.md` §6 ("Flags common to execution").
#[derive(Clone, Debug, Default)]
pub struct LoggingOptions {
    pub verbose: bool,
    pub log_file: Option<String>,
    pub log_json: bool,
    pub suppress_warnings: bool,
}

/// Initialize the global `tracing` subscriber. Idempotent within a process
/// only in the sense that a second call will itself error (tracing does not
/// support reinitializing the global default); callers invoke this exactly
/// once, at CLI startup.
pub fn init_logging(opts: &LoggingOptions) -> Result<()> {
    let default_directive = if opts.verbose {
        "debug"
    } else if opts.suppress_warnings {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(filter);

    let console_layer = if opts.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    match &opts.log_file {
        Some(path) => {
            let file_appender = tracing_appender::rolling::never(
                ".",
                path,
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // Leak the guard: logging lives for the process lifetime and the
            // CLI binary never tears the subscriber back down.
            std::mem::forget(guard);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            registry.with(console_layer).with(file_layer).init();
        }
        None => {
            registry.with(console_layer).init();
        }
    }

    Ok(())
}
