//! `show <namespace.name>`.

use eyre::Result;

use crate::cli::ShowOpts;
use crate::schemas::defaults_for;

pub fn show(opts: &ShowOpts) -> Result<()> {
    match defaults_for(&opts.target) {
        Some(defaults) => {
            print!("{defaults}");
            Ok(())
        }
        None => {
            eprintln!("unknown plugin '{}'", opts.target);
            std::process::exit(1);
        }
    }
}
