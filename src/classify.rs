//! Catalog entry classification
//!
//! warframe.market item slugs encode their kind in the name. The three rules
//! here are the load-bearing naming contracts the whole sync pipeline hangs
//! off, so they are written as explicit string predicates with fixture tests
//! instead of regex literals.

/// Category of a catalog entry, derived from its `url_name`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Individual prime part, e.g. `ember_prime_chassis`
    Part,
    /// Full prime set, e.g. `ember_prime_set`
    Set,
    /// Void relic, e.g. `axi_a1_relic`
    Relic,
    /// Anything else on the market (mods, rivens, arcanes, ...)
    Unclassified,
}

/// Classify an item slug. Deterministic and total; rules are checked in
/// Set, Part, Relic order.
pub fn classify(name: &str) -> Category {
    if is_set(name) {
        Category::Set
    } else if is_part(name) {
        Category::Part
    } else if is_relic(name) {
        Category::Relic
    } else {
        Category::Unclassified
    }
}

const SET_SUFFIX: &str = "_prime_set";
const RELIC_SUFFIX: &str = "_relic";
const PART_INFIX: &str = "prime_";
const PART_EXCLUDED_PREFIX: &str = "kavasa_";

/// A set slug ends with `_prime_set` and has a non-empty base name.
pub fn is_set(name: &str) -> bool {
    name.len() > SET_SUFFIX.len() && name.ends_with(SET_SUFFIX)
}

/// A part slug contains `prime_` somewhere in the middle of the name.
///
/// The occurrence must not sit at the start, must not be preceded by the
/// `kavasa_` collar slug (kavasa items are priced as a whole set only), and
/// must not be followed by exactly `set` at the end of the name (that is the
/// set slug, not a part).
pub fn is_part(name: &str) -> bool {
    for (idx, _) in name.match_indices(PART_INFIX) {
        let before = &name[..idx];
        let after = &name[idx + PART_INFIX.len()..];
        if before.is_empty() || after.is_empty() {
            continue;
        }
        if before.ends_with(PART_EXCLUDED_PREFIX) {
            continue;
        }
        if after == "set" {
            continue;
        }
        return true;
    }
    false
}

/// A relic slug ends with `_relic`, does not start with `r` (rules out the
/// `requiem_*_relic` family, which has no reward table on the market) and has
/// at least two characters before the suffix.
pub fn is_relic(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(RELIC_SUFFIX) else {
        return false;
    };
    let mut chars = stem.chars();
    match chars.next() {
        Some(c) if c != 'r' => {}
        _ => return false,
    }
    chars.next().is_some()
}

/// Strip the `_prime_set` suffix from a set slug, yielding the base name
/// shared by all of the set's parts.
pub fn set_base_name(set_url: &str) -> Option<&str> {
    if is_set(set_url) {
        set_url.strip_suffix(SET_SUFFIX)
    } else {
        None
    }
}
