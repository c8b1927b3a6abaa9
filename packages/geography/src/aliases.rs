//! Country alias table.
//!
//! The table lives in `country_aliases.toml` at the package root and is
//! embedded at compile time. Keys are lower-case variants; values are the
//! canonical names the upstream provider recognizes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;

const ALIASES_TOML: &str = include_str!("../country_aliases.toml");

#[derive(Debug, Deserialize)]
struct AliasFile {
    aliases: BTreeMap<String, String>,
}

/// Parsed alias table.
///
/// # Panics
///
/// Panics on first access if the embedded TOML is malformed (the file is
/// compiled in, so the tests below catch this).
static ALIASES: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    toml::de::from_str::<AliasFile>(ALIASES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse country_aliases.toml: {e}"))
        .aliases
});

/// Looks up an already lower-cased name.
pub(crate) fn lookup(lowercase: &str) -> Option<&'static str> {
    ALIASES.get(lowercase).map(String::as_str)
}

/// Returns `true` if `name` (any casing, surrounding whitespace ignored) is
/// a known alias.
#[must_use]
pub fn is_alias(name: &str) -> bool {
    lookup(&name.trim().to_lowercase()).is_some()
}

/// Iterates over `(alias, canonical)` pairs in alias order.
pub fn aliases() -> impl Iterator<Item = (&'static str, &'static str)> {
    ALIASES.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_parses_and_is_not_trivially_small() {
        assert!(aliases().count() >= 30);
    }

    #[test]
    fn alias_keys_are_lowercase_and_trimmed() {
        for (alias, canonical) in aliases() {
            assert_eq!(alias, alias.to_lowercase(), "alias {alias:?} is not lower-case");
            assert_eq!(alias, alias.trim());
            assert!(!canonical.trim().is_empty(), "alias {alias:?} has empty target");
        }
    }

    #[test]
    fn is_alias_ignores_case_and_whitespace() {
        assert!(is_alias(" USA "));
        assert!(is_alias("Falkland Is."));
        assert!(!is_alias("Atlantis"));
    }
}
