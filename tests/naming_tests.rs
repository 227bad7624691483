//! Naming convention resolver properties.
//!
//! For every method name starting with a recognized prefix bounded by an
//! uppercase letter, the resolver yields the prefix's verb plus the cased
//! remainder; names without a recognized prefix map to POST.

use http::Method;
use webiface::naming::{apply_case, resolve, CaseStyle};

#[test]
fn prefix_table_is_exhaustive() {
    let cases = [
        ("getItems", Method::GET, "items"),
        ("queryOpenOrders", Method::GET, "open_orders"),
        ("setDisplayName", Method::PUT, "display_name"),
        ("putConfig", Method::PUT, "config"),
        ("addComment", Method::POST, "comment"),
        ("createAccount", Method::POST, "account"),
        ("postMessage", Method::POST, "message"),
        ("removeTag", Method::DELETE, "tag"),
        ("eraseHistory", Method::DELETE, "history"),
        ("deleteAccount", Method::DELETE, "account"),
        ("updateProfile", Method::PATCH, "profile"),
        ("patchSettings", Method::PATCH, "settings"),
    ];
    for (name, verb, segment) in cases {
        let (v, s) = resolve(name, CaseStyle::LowerUnderscored);
        assert_eq!(v, verb, "verb for {name}");
        assert_eq!(s, segment, "segment for {name}");
    }
}

#[test]
fn unrecognized_names_default_to_post() {
    for name in ["login", "logout", "submitOrder", "index"] {
        let (verb, _) = resolve(name, CaseStyle::LowerUnderscored);
        assert_eq!(verb, Method::POST, "verb for {name}");
    }
}

#[test]
fn lowercase_continuation_defeats_the_prefix() {
    // "settings" reads as one word, not "set" + "tings"
    let (verb, segment) = resolve("settings", CaseStyle::LowerUnderscored);
    assert_eq!(verb, Method::POST);
    assert_eq!(segment, "settings");
}

#[test]
fn bare_prefix_is_the_root_segment() {
    assert_eq!(resolve("get", CaseStyle::LowerUnderscored).1, "/");
    assert_eq!(resolve("query", CaseStyle::Camel).1, "/");
}

#[test]
fn casing_styles_differ_only_in_the_segment() {
    assert_eq!(resolve("getUserProfile", CaseStyle::AsIs).1, "UserProfile");
    assert_eq!(resolve("getUserProfile", CaseStyle::Camel).1, "userProfile");
    assert_eq!(
        resolve("getUserProfile", CaseStyle::LowerUnderscored).1,
        "user_profile"
    );
}

#[test]
fn case_application_is_stable() {
    assert_eq!(apply_case(CaseStyle::LowerUnderscored, "HTMLPage"), "h_t_m_l_page");
    assert_eq!(apply_case(CaseStyle::AsIs, "HTMLPage"), "HTMLPage");
}
