//! `template <namespace.name>`.

use eyre::Result;

use crate::cli::TemplateOpts;
use crate::schemas::template_for;

pub fn template(opts: &TemplateOpts) -> Result<()> {
    match template_for(&opts.target) {
        Some(skeleton) => {
            print!("{skeleton}");
            Ok(())
        }
        None => {
            eprintln!("unknown plugin '{}'", opts.target);
            std::process::exit(1);
        }
    }
}
