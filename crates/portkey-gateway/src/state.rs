use std::sync::Arc;

use portkey_analytics::Analytics;
use portkey_core::ShortCode;
use portkey_redirector::Redirector;
use portkey_shortener::Shortener;
use typed_builder::TypedBuilder;

use crate::session::SessionStore;

#[derive(Clone, TypedBuilder)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    redirector: Arc<dyn Redirector>,
    analytics: Arc<dyn Analytics>,
    sessions: Arc<dyn SessionStore>,
    /// Public origin the short links are served from, e.g. `https://pk.example`.
    #[builder(setter(into))]
    base_url: String,
}

impl AppState {
    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn redirector(&self) -> &dyn Redirector {
        self.redirector.as_ref()
    }

    pub fn analytics(&self) -> &dyn Analytics {
        self.analytics.as_ref()
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }
}
