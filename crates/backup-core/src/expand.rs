//! Environment placeholder expansion
//!
//! Expansion runs over the raw configuration text before it is parsed, so a
//! placeholder may appear anywhere: map keys, list items, or inside a larger
//! scalar. Recognised forms, matched left to right:
//!
//! - `$NAME` and `${NAME}`: the variable's value, or an empty string when unset
//! - `${NAME:-default}`: `default` when `NAME` is unset or empty
//! - `${NAME-default}`: `default` only when `NAME` is unset
//!
//! Names start with a letter or underscore and continue with letters, digits or
//! underscores. A default ends at the first `}` and is inserted verbatim. Text
//! that does not form a complete placeholder (for example an unterminated `${`)
//! is copied through unchanged.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?-)([^}\n]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("placeholder pattern is a valid regex")
});

/// Expand placeholders, resolving each variable name through `lookup`.
///
/// `lookup` returns `None` for an unset variable and `Some("")` for a variable
/// set to the empty string; the two are distinguished by the `-` and `:-`
/// default forms.
pub fn expand_with<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| substitute(caps, &lookup))
        .into_owned()
}

fn substitute<F>(caps: &Captures<'_>, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bare) = caps.get(4) {
        return lookup(bare.as_str()).unwrap_or_default();
    }

    let name = &caps[1];
    let value = lookup(name);

    match caps.get(2).map(|m| m.as_str()) {
        Some(":-") => match value {
            Some(v) if !v.is_empty() => v,
            _ => caps[3].to_string(),
        },
        Some(_) => value.unwrap_or_else(|| caps[3].to_string()),
        None => value.unwrap_or_default(),
    }
}
