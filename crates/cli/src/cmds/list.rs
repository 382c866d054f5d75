//! `list [namespace]`.

use eyre::Result;
use tabled::{Table, Tabled};

use crate::cli::ListOpts;
use crate::error::report;
use crate::registry::build_registry;

#[derive(Tabled)]
struct Row {
    namespace: String,
    name: String,
}

pub fn list(opts: &ListOpts) -> Result<()> {
    let registry = build_registry().map_err(report)?;
    let entries = registry.list(opts.namespace.as_deref());

    let mut rows = Vec::new();
    for (namespace, names) in entries {
        for name in names {
            rows.push(Row {
                namespace: namespace.clone(),
                name,
            });
        }
    }
    rows.sort_by(|a, b| (a.namespace.clone(), a.name.clone()).cmp(&(b.namespace.clone(), b.name.clone())));

    println!("{}", Table::new(rows));
    Ok(())
}
