//! Translation provider boundary.
//!
//! Language resolution and message lookup live outside the core; the
//! dispatcher only needs a way to resolve the request language once and to
//! bind the two translate functions into the request context. When no
//! localization applies, [`IdentityTranslations`] returns the input text
//! unchanged and picks singular/plural by count.

use crate::server::ServerRequest;

/// External localization contract consumed by the dispatcher.
pub trait TranslationProvider: Send + Sync {
    /// Resolve the language tag for a request (e.g. from `Accept-Language`).
    fn resolve_language(&self, req: &dyn ServerRequest) -> String;

    /// Translate `text` in `language`, optionally disambiguated by `context`.
    fn translate(&self, language: &str, text: &str, context: Option<&str>) -> String;

    /// Translate with plural selection on `count`.
    fn translate_plural(
        &self,
        language: &str,
        text: &str,
        plural_text: &str,
        count: i64,
        context: Option<&str>,
    ) -> String;
}

/// Fallback provider: no language, identity translation, plural chosen by
/// `count == 1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslations;

impl TranslationProvider for IdentityTranslations {
    fn resolve_language(&self, _req: &dyn ServerRequest) -> String {
        String::new()
    }

    fn translate(&self, _language: &str, text: &str, _context: Option<&str>) -> String {
        text.to_string()
    }

    fn translate_plural(
        &self,
        _language: &str,
        text: &str,
        plural_text: &str,
        count: i64,
        _context: Option<&str>,
    ) -> String {
        if count == 1 {
            text.to_string()
        } else {
            plural_text.to_string()
        }
    }
}
