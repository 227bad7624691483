//! Per-request context.
//!
//! One [`RequestContext`] is built at the start of every dispatcher run and
//! threaded explicitly into the handler; it is never shared between
//! requests and holds no global or task-local state. An error-recovery
//! re-dispatch builds a fresh context over the same request/response pair
//! but keeps the original request id.

use crate::ids::RequestId;
use crate::server::{ServerRequest, ServerResponse};
use crate::session::SessionStore;
use crate::translation::TranslationProvider;
use std::sync::Arc;

/// Ambient state of one in-flight request.
pub struct RequestContext {
    /// Correlation id threaded through every log event of this dispatch
    pub request_id: RequestId,
    /// The live request handle
    pub request: Arc<dyn ServerRequest>,
    /// The live response handle
    pub response: Arc<dyn ServerResponse>,
    /// Language tag resolved for this request; empty when no localization
    /// context applies
    pub language: String,
    translations: Arc<dyn TranslationProvider>,
}

impl RequestContext {
    pub fn new(
        request_id: RequestId,
        request: Arc<dyn ServerRequest>,
        response: Arc<dyn ServerResponse>,
        translations: Arc<dyn TranslationProvider>,
    ) -> Self {
        let language = translations.resolve_language(request.as_ref());
        Self {
            request_id,
            request,
            response,
            language,
            translations,
        }
    }

    /// Translate `text` in the resolved request language.
    #[must_use]
    pub fn translate(&self, text: &str, context: Option<&str>) -> String {
        self.translations.translate(&self.language, text, context)
    }

    /// Translate with plural selection on `count`.
    #[must_use]
    pub fn translate_plural(
        &self,
        text: &str,
        plural_text: &str,
        count: i64,
        context: Option<&str>,
    ) -> String {
        self.translations
            .translate_plural(&self.language, text, plural_text, count, context)
    }

    /// Redirect to `url` with 302. The response is committed afterwards.
    pub fn redirect(&self, url: &str) {
        self.response.redirect(url, 302);
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.response.set_header(name, value);
    }

    pub fn set_status(&self, code: u16) {
        self.response.set_status(code);
    }

    /// The session attached to this request, if any.
    #[must_use]
    pub fn session(&self) -> Option<Arc<dyn SessionStore>> {
        self.request.session()
    }

    /// Return the session, creating one as a side effect if needed.
    #[must_use]
    pub fn start_session(&self) -> Arc<dyn SessionStore> {
        self.request.start_session()
    }

    /// Clear the session reference; subsequent reads behave as if no
    /// session ever existed until a new one is lazily started.
    pub fn terminate_session(&self) {
        self.request.terminate_session();
    }
}
