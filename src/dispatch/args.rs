//! Request parameters to plugin argv.
//!
//! Values are passed through untouched as their own argv entries; nothing
//! here is ever interpreted by a shell, so no quoting is applied.

use std::collections::BTreeMap;

use crate::loaders::ArgumentStyle;

/// Translate `parameters` into the argument list `style` expects.
///
/// Keys are emitted in sorted order, so the same map always produces the
/// same argv. Empty values are kept.
///
/// ```rust
/// use std::collections::BTreeMap;
/// use chatops_dispatch::dispatch::translate;
/// use chatops_dispatch::loaders::ArgumentStyle;
///
/// let params = BTreeMap::from([("env".to_string(), "prod".to_string())]);
/// assert_eq!(translate(ArgumentStyle::Python, &params), vec!["-env", "prod"]);
/// assert_eq!(translate(ArgumentStyle::Go, &params), vec!["--env=prod"]);
/// ```
pub fn translate(style: ArgumentStyle, parameters: &BTreeMap<String, String>) -> Vec<String> {
    match style {
        ArgumentStyle::Python => parameters
            .iter()
            .flat_map(|(key, value)| [format!("-{}", key), value.clone()])
            .collect(),
        ArgumentStyle::Go => parameters
            .iter()
            .map(|(key, value)| format!("--{}={}", key, value))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_python_style_two_tokens_per_parameter() {
        let p = params(&[("region", "us-east-1"), ("count", "3")]);
        let args = translate(ArgumentStyle::Python, &p);
        assert_eq!(args, vec!["-count", "3", "-region", "us-east-1"]);
        assert_eq!(args.len(), 2 * p.len());
    }

    #[test]
    fn test_go_style_one_token_per_parameter() {
        let p = params(&[("region", "us-east-1"), ("count", "3")]);
        let args = translate(ArgumentStyle::Go, &p);
        assert_eq!(args, vec!["--count=3", "--region=us-east-1"]);
        assert_eq!(args.len(), p.len());
    }

    #[test]
    fn test_empty_values_are_emitted() {
        let p = params(&[("dry_run", "")]);
        assert_eq!(translate(ArgumentStyle::Python, &p), vec!["-dry_run", ""]);
        assert_eq!(translate(ArgumentStyle::Go, &p), vec!["--dry_run="]);
    }

    #[test]
    fn test_values_are_not_quoted() {
        let p = params(&[("text", "say \"hi\"; rm -rf /")]);
        assert_eq!(
            translate(ArgumentStyle::Python, &p),
            vec!["-text", "say \"hi\"; rm -rf /"]
        );
        assert_eq!(
            translate(ArgumentStyle::Go, &p),
            vec!["--text=say \"hi\"; rm -rf /"]
        );
    }

    #[test]
    fn test_translation_is_deterministic() {
        let p = params(&[("b", "2"), ("a", "1"), ("c", "3")]);
        for style in [ArgumentStyle::Python, ArgumentStyle::Go] {
            assert_eq!(translate(style, &p), translate(style, &p.clone()));
        }
    }

    #[test]
    fn test_no_parameters() {
        let p = BTreeMap::new();
        assert!(translate(ArgumentStyle::Python, &p).is_empty());
        assert!(translate(ArgumentStyle::Go, &p).is_empty());
    }
}
