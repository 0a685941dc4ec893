//! Session lifecycle engine.
//!
//! The [`SessionEngine`] is created once per application and shared across requests. Each
//! request goes through three steps:
//!
//! 1. [`SessionEngine::begin`] reads the signed identifier from the `Cookie` header and
//!    either recalls the stored session or mints a new one.
//! 2. The handler works with the returned [`RequestSession`].
//! 3. [`RequestSession::finalize`] decides whether to issue the cookie and whether to
//!    save, touch or destroy the stored record.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use http::HeaderMap;
//! # use gosub_session::config::SessionConfig;
//! # use gosub_session::engine::{RequestContext, SessionEngine};
//! # use gosub_session::store::MemoryStore;
//! # async fn demo() -> gosub_session::errors::Result<()> {
//! let config = SessionConfig::builder().secret("keyboard cat").build()?;
//! let engine = SessionEngine::new(config, Arc::new(MemoryStore::new()))?;
//!
//! let mut request = engine.begin(&RequestContext::default()).await?;
//! if let Some(session) = request.session_mut() {
//!     session.insert("views", 1)?;
//! }
//!
//! let mut response_headers = HeaderMap::new();
//! let report = request.finalize(&mut response_headers).await?;
//! assert!(report.cookie_set);
//! # Ok(()) }
//! ```
mod lifecycle;
mod request;

use std::sync::Arc;

use log::debug;

use crate::config::{self, SessionConfig};
use crate::cookies::{header, unsign_with_any};
use crate::errors::Result;
use crate::store::StoreHandle;

use lifecycle::Identifier;
pub use lifecycle::{Finalized, LifecycleState, RequestSession, StoreAction};
pub use request::RequestContext;

/// Prefix marking a signed cookie value.
const SIGNED_PREFIX: &str = "s:";

pub struct SessionEngine {
    /// Validated configuration, shared with every request.
    config: Arc<SessionConfig>,
    /// Backing store, shared with every session.
    store: StoreHandle,
}

impl SessionEngine {
    /// Creates an engine. The configuration is validated again so a hand-built
    /// [`SessionConfig`] cannot bypass the builder checks.
    pub fn new(config: SessionConfig, store: StoreHandle) -> Result<Self> {
        config::validate(&config)?;

        Ok(Self {
            config: Arc::new(config),
            store,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Resolves the session for an inbound request.
    ///
    /// Store lookup failures are logged and produce a fresh session; the only errors
    /// returned here come from identifier generation.
    pub async fn begin(&self, ctx: &RequestContext) -> Result<RequestSession> {
        let identifier = self.resolve_identifier(ctx);

        let mut request =
            RequestSession::new(self.config.clone(), self.store.clone(), ctx.clone(), &identifier);
        request.bind(identifier).await?;

        Ok(request)
    }

    fn resolve_identifier(&self, ctx: &RequestContext) -> Identifier {
        let Some(raw) = header::find(ctx.headers(), &self.config.name) else {
            return Identifier::None;
        };

        if let Some(signed) = raw.strip_prefix(SIGNED_PREFIX) {
            return match unsign_with_any(signed, self.config.secrets.as_slice()) {
                Some(sid) if !sid.is_empty() => Identifier::Signed(sid),
                _ => {
                    debug!("Session cookie signature is invalid");
                    Identifier::None
                }
            };
        }

        if self.config.accept_unsigned && !raw.is_empty() {
            debug!("Accepting unsigned legacy session cookie");
            return Identifier::Unsigned(raw);
        }

        debug!("Session cookie is not signed");
        Identifier::None
    }
}
