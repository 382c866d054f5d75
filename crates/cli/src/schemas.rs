//! Static schema-default/skeleton text for `show`/`template`, keyed by
//! `<namespace>.<name>`. This crate's plugin set is small and fixed (see
//! `simrun-plugins`), so a lookup table stands in for the schema reflection
//! a larger plugin ecosystem would need.

pub fn defaults_for(target: &str) -> Option<&'static str> {
    match target {
        "engine.sde" => Some("t0: 0.0\ndt: 0.01\nn_steps: 1000\n"),
        "model.van_der_pol" => Some("mu: 1.0\nsigma: 0.1\nx0: 0.0\nv0: 0.0\n"),
        "integrator.euler_maruyama" | "integrator.euler" | "integrator.em" => Some("{}\n"),
        "backend.native_vec" => Some("{}\n"),
        "visualization.summary" => Some("{}\n"),
        "loader.csv" => Some("{}\n"),
        _ => None,
    }
}

/// A skeleton in the job file's "flat" plugin shape: `{name, params}`.
pub fn template_for(target: &str) -> Option<String> {
    let (_, name) = target.rsplit_once('.').unwrap_or(("", target));
    defaults_for(target).map(|defaults| {
        format!("name: \"{name}\"\nparams:\n{}", indent(defaults, "  "))
    })
}

fn indent(body: &str, prefix: &str) -> String {
    body.lines().map(|l| format!("{prefix}{l}\n")).collect()
}
