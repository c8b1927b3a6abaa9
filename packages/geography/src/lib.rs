#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Country name normalization.
//!
//! Maps the many spellings a user or a map dataset may use for a country
//! ("USA", "Dem. Rep. Congo", "Burma") to the canonical name the upstream
//! epidemiological provider expects. The canonical name is also the
//! persistence key for country records.

pub mod aliases;

pub use aliases::{aliases, is_alias};

/// Normalizes a country name to its canonical upstream spelling.
///
/// Trims surrounding whitespace and looks the lower-cased name up in the
/// alias table. Names without an alias are returned trimmed with their
/// original casing, so unknown countries pass through unchanged.
#[must_use]
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    aliases::lookup(&trimmed.to_lowercase()).map_or_else(|| trimmed.to_string(), str::to_string)
}

/// Normalizes a list of names, dropping blanks and collapsing duplicates.
///
/// Order of first appearance is preserved, so `["USA", "United States"]`
/// yields a single `"United States"`.
#[must_use]
pub fn normalize_all<I>(names: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let canonical = normalize(name.as_ref());
        if canonical.is_empty() || out.contains(&canonical) {
            continue;
        }
        out.push(canonical);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_aliases() {
        assert_eq!(normalize("usa"), "United States");
        assert_eq!(normalize("USA"), "United States");
        assert_eq!(normalize("  U.S.  "), "United States");
        assert_eq!(normalize("uk"), "United Kingdom");
        assert_eq!(normalize("South Korea"), "Korea, South");
        assert_eq!(normalize("Dem. Rep. Congo"), "Congo (Kinshasa)");
        assert_eq!(normalize("Côte d'Ivoire"), "Cote d'Ivoire");
        assert_eq!(normalize("burma"), "Myanmar");
    }

    #[test]
    fn every_alias_maps_to_its_canonical_name() {
        for (alias, canonical) in aliases() {
            assert_eq!(normalize(alias), canonical, "alias {alias:?}");
            assert_eq!(normalize(&alias.to_uppercase()), canonical);
        }
    }

    #[test]
    fn unknown_names_pass_through_trimmed() {
        assert_eq!(normalize("Wakanda"), "Wakanda");
        assert_eq!(normalize("  New Zealand \t"), "New Zealand");
        assert_eq!(normalize("fRaNcE"), "fRaNcE");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_all_collapses_aliases_of_the_same_country() {
        let names = normalize_all(["United States", "USA", " us ", "France", "", "   "]);
        assert_eq!(names, vec!["United States".to_string(), "France".to_string()]);
    }
}
