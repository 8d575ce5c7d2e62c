//! `$token` substitution for document templates.
//!
//! A token is `$` followed by the longest run of word characters. Known tokens are
//! replaced by their value and unknown tokens by `""`, so template syntax never
//! leaks into a court document. There are no conditionals, loops or nested
//! expansion; substituted values are never re-scanned.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;
use crate::variables::Variables;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\w+)").expect("valid regex"));

/// Constructs from other template languages that we refuse instead of printing.
const UNSUPPORTED_SYNTAX: [(&str, &str); 3] = [
    ("${", "brace expansion"),
    ("{{", "mustache expressions"),
    ("{%", "template blocks"),
];

/// Rejects empty templates and unsupported expression syntax.
pub fn validate_template(template: &str) -> Result<(), AppError> {
    if template.trim().is_empty() {
        return Err(AppError::Validation("template body cannot be empty".to_string()));
    }
    for (pattern, what) in UNSUPPORTED_SYNTAX {
        if template.contains(pattern) {
            return Err(AppError::Validation(format!(
                "template uses unsupported {what} ('{pattern}'); only $variable tokens are allowed"
            )));
        }
    }
    Ok(())
}

/// Replaces every `$token` in a single pass.
pub fn substitute(template: &str, vars: &Variables) -> String {
    TOKEN
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).to_string()
        })
        .into_owned()
}

/// Token names referenced by a template, in order of first appearance.
pub fn referenced_tokens(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in TOKEN.captures_iter(template) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_substitutes_known_tokens() {
        let v = vars(&[("cuantia", "12.000"), ("abogado_nombre", "L1")]);
        assert_eq!(
            substitute("Pagar $cuantia a $abogado_nombre", &v),
            "Pagar 12.000 a L1"
        );
    }

    #[test]
    fn test_unknown_tokens_vanish() {
        let v = vars(&[("rol", "C-1")]);
        assert_eq!(substitute("Rol $rol, $desconocido.", &v), "Rol C-1, .");
    }

    #[test]
    fn test_longest_token_wins() {
        let v = vars(&[("rol", "C-1"), ("rolId", "99")]);
        assert_eq!(substitute("$rolId/$rol", &v), "99/C-1");
        // `$rolX` is its own (unknown) token, never `$rol` + "X".
        assert_eq!(substitute("$rolX", &v), "");
    }

    #[test]
    fn test_no_known_token_survives() {
        let v = vars(&[("a", "1"), ("b", "2"), ("ab", "3")]);
        let out = substitute("$a$b $ab $a_b x$a", &v);
        for key in ["$a", "$b", "$ab"] {
            assert!(!out.contains(key), "{key} leaked into {out:?}");
        }
        assert_eq!(out, "12 3  x1");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let v = vars(&[("a", "$b"), ("b", "boom")]);
        assert_eq!(substitute("$a", &v), "$b");
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        let v = vars(&[("cuantia", "12.000")]);
        assert_eq!(substitute("$ $cuantia", &v), "$ 12.000");
    }

    #[test]
    fn test_unicode_word_tokens() {
        let v = vars(&[("año", "2024")]);
        assert_eq!(substitute("en el $año", &v), "en el 2024");
    }

    #[test]
    fn test_validate_rejects_empty_and_foreign_syntax() {
        assert!(matches!(
            validate_template("   "),
            Err(AppError::Validation(_))
        ));
        assert!(validate_template("Hola ${nombre}").is_err());
        assert!(validate_template("Hola {{ nombre }}").is_err());
        assert!(validate_template("{% if x %}").is_err());
        assert!(validate_template("Pagar $cuantia a $abogado_nombre").is_ok());
    }

    #[test]
    fn test_referenced_tokens_dedupes() {
        assert_eq!(
            referenced_tokens("$rol $tribunal $rol"),
            vec!["rol".to_string(), "tribunal".to_string()]
        );
    }
}
