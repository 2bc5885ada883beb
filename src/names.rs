//! ISO 9660 level 1 file name checks
//!
//! Level 1 names use only `A-Z`, `0-9` and `_`, with at most one dot
//! separating the base name from the extension.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::tree::Tree;

static LEVEL1_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9_]+$").unwrap());

static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Z0-9_]").unwrap());

/// Split a name into base and extension; leading dots belong to the base
fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(dot) => (&name[..leading + dot], &name[leading + dot + 1..]),
        None => (name, ""),
    }
}

/// Check a single name against level 1 rules, ignoring case
pub fn is_level1_compliant(name: &str) -> bool {
    if name.matches('.').count() > 1 {
        return false;
    }

    let (base, ext) = split_extension(name);
    LEVEL1_PATTERN.is_match(&base.to_uppercase())
        && (ext.is_empty() || LEVEL1_PATTERN.is_match(&ext.to_uppercase()))
}

/// All distinct names in the tree that break level 1 rules, sorted
pub fn non_compliant_names(tree: &Tree) -> Vec<String> {
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| tree.get(id))
        .filter(|node| !is_level1_compliant(&node.name))
        .map(|node| node.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Closest 8.3 name made only of level 1 characters
pub fn suggest_level1_name(name: &str) -> String {
    let (base, ext) = split_extension(name);

    let mut base = INVALID_CHARS.replace_all(&base.to_uppercase(), "_").into_owned();
    if base.is_empty() {
        base.push('_');
    }
    let base: String = base.chars().take(8).collect();

    if ext.is_empty() {
        return base;
    }
    let upper = ext.to_uppercase();
    let ext = INVALID_CHARS.replace_all(&upper, "_");
    format!("{}.{}", base, ext.chars().take(3).collect::<String>())
}
