//! Worksheet name rules: sanitizing user-derived names and keeping them unique
//! within one output workbook.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::hash::Hash;

pub const MAX_SHEET_NAME_CHARS: usize = 31;
pub const FALLBACK_SHEET_NAME: &str = "Sheet1";

static INVALID_SHEET_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\]*?/\\:]").expect("static sheet-name pattern"));

/// Replaces characters worksheets reject with `_`, truncates to 31 characters
/// and falls back to `Sheet1` when nothing is left.
pub fn sanitize(name: &str) -> String {
    let replaced = INVALID_SHEET_CHARS.replace_all(name, "_");
    let truncated: String = replaced.chars().take(MAX_SHEET_NAME_CHARS).collect();
    if truncated.is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        truncated
    }
}

/// Assigns each proposed name a final name that no other entry uses.
///
/// The first occurrence of a name keeps it; later ones get `_1`, `_2`, ... until
/// the candidate is free, checked against every name finalized so far. Names
/// compare without regard to case, as worksheet names do.
pub fn resolve_conflicts<K>(proposed: &[(K, String)]) -> IndexMap<K, String>
where
    K: Clone + Eq + Hash,
{
    let mut taken: HashSet<String> = HashSet::new();
    let mut resolved = IndexMap::with_capacity(proposed.len());

    for (id, name) in proposed {
        let final_name = if taken.contains(&fold_case(name)) {
            suggest_name(name, &taken)
        } else {
            name.clone()
        };
        taken.insert(fold_case(&final_name));
        resolved.insert(id.clone(), final_name);
    }

    resolved
}

/// First `base_N` (N >= 1) whose case-folded form is not in `existing`, kept
/// within the length limit. `existing` holds names already passed through
/// [`fold_case`].
pub fn suggest_name(base: &str, existing: &HashSet<String>) -> String {
    let mut counter: usize = 1;
    loop {
        let suffix = format!("_{counter}");
        let room = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        let stem: String = base.chars().take(room).collect();
        let candidate = format!("{stem}{suffix}");
        if !existing.contains(&fold_case(&candidate)) {
            return candidate;
        }
        counter += 1;
    }
}

/// Case-insensitive comparison key for worksheet names.
pub fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// Fails if any name repeats, ignoring case; guards writers that bypass
/// [`resolve_conflicts`].
pub fn ensure_unique<'a, I>(names: I) -> Result<(), crate::errors::MergeError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(fold_case(name)) {
            return Err(crate::errors::MergeError::SheetNameConflict(
                name.to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(input: &[&str]) -> Vec<String> {
        let proposed: Vec<(usize, String)> = input
            .iter()
            .enumerate()
            .map(|(i, name)| (i, name.to_string()))
            .collect();
        resolve_conflicts(&proposed).into_values().collect()
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize("Sales/Q1"), "Sales_Q1");
        assert_eq!(sanitize("[bad]name?"), "_bad_name_");
        assert_eq!(sanitize(r"a\b*c"), "a_b_c");
    }

    #[test]
    fn sanitize_truncates_and_falls_back() {
        assert_eq!(sanitize(&"A".repeat(40)).chars().count(), 31);
        assert_eq!(sanitize(""), "Sheet1");
        assert_eq!(sanitize(&"表".repeat(35)).chars().count(), 31);
    }

    #[test]
    fn sanitize_is_idempotent() {
        for input in [
            "",
            "Sales/Q1",
            "[bad]name?",
            "plain",
            "a:b",
            "//////",
            "a very long sheet name that keeps going and going",
        ] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "{input}");
        }
    }

    #[test]
    fn repeated_names_get_counters() {
        assert_eq!(
            names(&["Report", "Report", "Report"]),
            vec!["Report", "Report_1", "Report_2"]
        );
    }

    #[test]
    fn suffixes_never_collide_with_later_literal_names() {
        let resolved = names(&["A", "A", "A_1", "B"]);
        assert_eq!(resolved, vec!["A", "A_1", "A_1_1", "B"]);
        let unique: HashSet<&String> = resolved.iter().collect();
        assert_eq!(unique.len(), resolved.len());
    }

    #[test]
    fn suffixed_names_stay_within_length_limit() {
        let long = "X".repeat(31);
        let resolved = names(&[&long, &long]);
        assert_eq!(resolved[1].chars().count(), 31);
        assert!(resolved[1].ends_with("_1"));
        assert_ne!(resolved[0], resolved[1]);
    }

    #[test]
    fn names_differing_only_in_case_are_conflicts() {
        assert_eq!(
            names(&["report", "Report", "REPORT_1"]),
            vec!["report", "Report_1", "REPORT_1_1"]
        );
        let err = ensure_unique(["Jan", "JAN"]).unwrap_err();
        assert!(err.to_string().contains("'JAN'"));
    }

    #[test]
    fn ensure_unique_reports_the_repeated_name() {
        let err = ensure_unique(["Jan", "Feb", "Jan"]).unwrap_err();
        assert!(err.to_string().contains("'Jan'"));
        assert!(ensure_unique(["Jan", "Feb"]).is_ok());
    }
}
