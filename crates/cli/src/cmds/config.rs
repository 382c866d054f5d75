//! `config show` / `config set` / `config reset`.

use std::fs;

use eyre::{eyre, Result};
use simrun_common::AppPaths;

use crate::cli::ConfigSubCommand;
use crate::error::report;

pub fn config(subcmd: &ConfigSubCommand) -> Result<()> {
    match subcmd {
        ConfigSubCommand::Show { global, .. } if *global => show_global(),
        ConfigSubCommand::Show { .. } => show_system(),
        ConfigSubCommand::Set { key, value } => set(key, value),
        ConfigSubCommand::Reset => reset(),
    }
}

fn show_system() -> Result<()> {
    let system = simrun_core::loader::load_system_config().map_err(report)?;
    let yaml = serde_yaml::to_string(&system)?;
    print!("{yaml}");
    Ok(())
}

fn show_global() -> Result<()> {
    let system = simrun_core::loader::load_system_config().map_err(report)?;
    let path = &system.paths.global_file;
    match fs::read_to_string(path) {
        Ok(body) => {
            print!("{body}");
            Ok(())
        }
        Err(_) => {
            println!("{{}}");
            Ok(())
        }
    }
}

fn set(key: &str, value: &str) -> Result<()> {
    let path = AppPaths::new().user_defaults_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let existing: serde_yaml::Value = match fs::read_to_string(&path) {
        Ok(body) => serde_yaml::from_str(&body).unwrap_or(serde_yaml::Value::Null),
        Err(_) => serde_yaml::Value::Null,
    };
    let value: serde_yaml::Value =
        serde_yaml::from_str(value).unwrap_or_else(|_| serde_yaml::Value::String(value.to_string()));

    let patch = nest(key, value)?;
    let merged = simrun_common::deep_merge(&existing, &patch);
    let body = serde_yaml::to_string(&merged)?;
    fs::write(&path, body)?;
    Ok(())
}

fn nest(dotted_key: &str, value: serde_yaml::Value) -> Result<serde_yaml::Value> {
    let mut parts: Vec<&str> = dotted_key.split('.').collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return Err(eyre!("invalid config key '{dotted_key}'"));
    }
    let leaf = parts.pop().unwrap();
    let mut node = serde_yaml::Mapping::new();
    node.insert(serde_yaml::Value::String(leaf.to_string()), value);
    let mut out = serde_yaml::Value::Mapping(node);
    for part in parts.into_iter().rev() {
        let mut wrap = serde_yaml::Mapping::new();
        wrap.insert(serde_yaml::Value::String(part.to_string()), out);
        out = serde_yaml::Value::Mapping(wrap);
    }
    Ok(out)
}

fn reset() -> Result<()> {
    let path = AppPaths::new().user_defaults_file();
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}
