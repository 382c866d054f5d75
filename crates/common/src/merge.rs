//! Deep-merge of YAML value trees.
//!
//! Used by the layered configuration pipeline: package defaults, user site
//! file, environment-pointed file, system overrides, and per-job overrides
//! are all merged with the same rule, later always winning.

use serde_yaml::Value;

/// Merge `b` on top of `a`: at each mapping key, if both sides are
/// mappings, recurse; otherwise `b`'s value wins. Lists are replaced
/// wholesale, never merged element-wise.
pub fn deep_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Mapping(ma), Value::Mapping(mb)) => {
            let mut out = ma.clone();
            for (k, vb) in mb.iter() {
                let merged = match out.get(k) {
                    Some(va) => deep_merge(va, vb),
                    None => vb.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Mapping(out)
        }
        // Anything else: later value replaces the earlier one wholesale,
        // including the list-replacement rule.
        (_, b) => b.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn scalar_rhs_wins() {
        let a = yaml("a: 1\nb: 2");
        let b = yaml("b: 3");
        let m = deep_merge(&a, &b);
        assert_eq!(m, yaml("a: 1\nb: 3"));
    }

    #[test]
    fn nested_maps_recurse() {
        let a = yaml("paths:\n  output_dir: /a\n  global_file: g.yaml");
        let b = yaml("paths:\n  output_dir: /b");
        let m = deep_merge(&a, &b);
        assert_eq!(m, yaml("paths:\n  output_dir: /b\n  global_file: g.yaml"));
    }

    #[test]
    fn lists_replace_wholesale() {
        let a = yaml("plugin_dirs: [a, b, c]");
        let b = yaml("plugin_dirs: [z]");
        let m = deep_merge(&a, &b);
        assert_eq!(m, yaml("plugin_dirs: [z]"));
    }

    #[test]
    fn associative_for_dict_only_structures() {
        let a = yaml("x:\n  a: 1\n  b: 1");
        let b = yaml("x:\n  b: 2\n  c: 2");
        let c = yaml("x:\n  c: 3\n  d: 3");

        let left = deep_merge(&deep_merge(&a, &b), &c);
        let right = deep_merge(&a, &deep_merge(&b, &c));
        assert_eq!(left, right);
        assert_eq!(left, yaml("x:\n  a: 1\n  b: 2\n  c: 3\n  d: 3"));
    }
}
