//! Naming convention resolver.
//!
//! Maps a method identifier to an HTTP verb and a path segment. A fixed,
//! ordered table of verb prefixes is scanned; a prefix matches only when it
//! appears all-lowercase and is bounded by an uppercase letter, a
//! non-letter, or the end of the identifier. Identifiers with no recognized
//! prefix map to POST with the whole identifier as the segment.
//!
//! This is a pure function of the identifier and the configured
//! [`CaseStyle`]; it never touches the request.

use http::Method;

/// Word-casing style applied to the path segment derived from a method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStyle {
    /// `UserProfile` → `user_profile` (default)
    #[default]
    LowerUnderscored,
    /// Segment kept exactly as written
    AsIs,
    /// `UserProfile` → `userProfile`
    Camel,
}

/// Verb prefixes in match order. Earlier entries win; order is part of the
/// resolver contract.
const VERB_PREFIXES: [&str; 12] = [
    "get", "query", "set", "put", "add", "create", "post", "remove", "erase", "delete", "update",
    "patch",
];

fn verb_for_prefix(prefix: &str) -> Method {
    match prefix {
        "get" | "query" => Method::GET,
        "set" | "put" => Method::PUT,
        "add" | "create" | "post" => Method::POST,
        "remove" | "erase" | "delete" => Method::DELETE,
        "update" | "patch" => Method::PATCH,
        _ => Method::POST,
    }
}

/// A prefix only matches when the following character cannot continue a
/// lowercase word: uppercase, non-letter, or end of string.
fn prefix_bounded(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) => c.is_uppercase() || !c.is_alphabetic(),
    }
}

/// Resolve a method identifier to `(HTTP verb, path segment)`.
///
/// The remainder after the matched prefix is converted through `style`;
/// an empty remainder maps to the root segment `"/"`.
#[must_use]
pub fn resolve(name: &str, style: CaseStyle) -> (Method, String) {
    for prefix in VERB_PREFIXES {
        if let Some(rest) = name.strip_prefix(prefix) {
            if prefix_bounded(rest) {
                return (verb_for_prefix(prefix), segment_for(rest, style));
            }
        }
    }
    (Method::POST, segment_for(name, style))
}

fn segment_for(remainder: &str, style: CaseStyle) -> String {
    if remainder.is_empty() {
        "/".to_string()
    } else {
        apply_case(style, remainder)
    }
}

/// Convert an identifier fragment according to the casing style.
#[must_use]
pub fn apply_case(style: CaseStyle, fragment: &str) -> String {
    match style {
        CaseStyle::AsIs => fragment.to_string(),
        CaseStyle::Camel => {
            let mut chars = fragment.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        CaseStyle::LowerUnderscored => {
            let mut out = String::with_capacity(fragment.len() + 4);
            for (i, c) in fragment.chars().enumerate() {
                if c.is_uppercase() {
                    if i > 0 && !out.ends_with('_') {
                        out.push('_');
                    }
                    out.extend(c.to_lowercase());
                } else {
                    out.push(c);
                }
            }
            out
        }
    }
}
