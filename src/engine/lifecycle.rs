use std::sync::Arc;

use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};
use log::{debug, warn};
use time::OffsetDateTime;

use crate::config::{SessionConfig, UnsetPolicy};
use crate::cookies::{sign, CookieAttributes, Secure};
use crate::engine::RequestContext;
use crate::errors::{Result, SessionError};
use crate::session::{Session, SessionData};
use crate::sid;
use crate::store::StoreHandle;

/// Identifier recovered from the inbound cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Identifier {
    None,
    /// Verified against one of the configured secrets.
    Signed(String),
    /// Raw legacy value, only used as a lookup key.
    Unsigned(String),
}

/// Per-request bookkeeping used by the finalization decisions. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleState {
    /// Verified identifier the client sent, if any.
    pub cookie_id: Option<String>,
    /// Identifier the session was bound with (generated or recalled).
    pub original_id: Option<String>,
    /// Fingerprint at bind time.
    pub original_hash: Option<String>,
    /// Fingerprint of the last known persisted state.
    pub saved_hash: Option<String>,
    /// Whether the cookie expiry was already pushed forward this request.
    pub touched: bool,
}

/// Store work performed during finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreAction {
    None,
    Saved,
    Touched,
    Destroyed,
}

/// Outcome of [`RequestSession::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub session_id: Option<String>,
    pub cookie_set: bool,
    pub action: StoreAction,
}

/// Session state of a single in-flight request.
///
/// Created by [`SessionEngine::begin`](crate::engine::SessionEngine::begin) and consumed by
/// [`RequestSession::finalize`]. Dropping it without finalizing writes nothing.
pub struct RequestSession {
    config: Arc<SessionConfig>,
    store: StoreHandle,
    ctx: RequestContext,
    /// Transport security of the request, resolved once at begin.
    secure: bool,
    /// Raw legacy id the client presented, replaced by a signed cookie once recalled.
    unsigned_id: Option<String>,
    state: LifecycleState,
    session: Option<Session>,
    session_id: Option<String>,
}

impl RequestSession {
    pub(crate) fn new(
        config: Arc<SessionConfig>,
        store: StoreHandle,
        ctx: RequestContext,
        identifier: &Identifier,
    ) -> Self {
        let secure = ctx.is_secure(config.proxy);

        Self {
            config,
            store,
            ctx,
            secure,
            unsigned_id: match identifier {
                Identifier::Unsigned(raw) => Some(raw.clone()),
                _ => None,
            },
            state: LifecycleState {
                cookie_id: match identifier {
                    Identifier::Signed(id) => Some(id.clone()),
                    _ => None,
                },
                ..LifecycleState::default()
            },
            session: None,
            session_id: None,
        }
    }

    /// Loads the session for `identifier`, or mints a new one. Lookup failures and misses
    /// both fall back to a new session.
    pub(crate) async fn bind(&mut self, identifier: Identifier) -> Result<()> {
        let sid = match identifier {
            Identifier::None => return self.generate().await,
            Identifier::Signed(sid) | Identifier::Unsigned(sid) => sid,
        };

        match self.store.get(&sid).await {
            Ok(Some(record)) => self.recall(sid, record),
            Ok(None) => {
                debug!("Session lookup missed, starting a new session");
                self.generate().await
            }
            Err(e) => {
                warn!("Session lookup failed, starting a new session: {}", e);
                self.generate().await
            }
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Detaches the session from the request. What happens to the stored record is
    /// decided by the configured [`UnsetPolicy`] at finalization.
    pub fn unset(&mut self) -> Option<Session> {
        self.session.take()
    }

    /// Destroys the stored record and detaches the session. Also works after
    /// [`RequestSession::unset`].
    pub async fn destroy(&mut self) -> Result<()> {
        match (self.session.as_mut(), &self.session_id) {
            (Some(session), _) => session.destroy().await?,
            (None, Some(sid)) => self.store.destroy(sid).await?,
            (None, None) => {}
        }
        self.session = None;
        Ok(())
    }

    /// Replaces the session with a fresh one under a new identifier. The old record is
    /// only removed when `regenerate_overwrites` is set.
    pub async fn regenerate(&mut self) -> Result<()> {
        if self.config.regenerate_overwrites {
            if let Some(sid) = &self.session_id {
                self.store.destroy(sid).await?;
            }
        }

        self.session = None;
        self.session_id = None;
        self.state.saved_hash = None;
        self.generate().await
    }

    async fn generate(&mut self) -> Result<()> {
        let sid = self.new_id().await;
        if sid.is_empty() {
            return Err(SessionError::InvalidSessionState(
                "identifier generator returned an empty id".into(),
            ));
        }

        let cookie = CookieAttributes::new(&self.config.cookie, OffsetDateTime::now_utc());
        let session = Session::builder()
            .id(sid.clone())
            .store(self.store.clone())
            .cookie(cookie)
            .build()?;

        self.state.original_id = Some(sid.clone());
        self.state.original_hash = Some(session.fingerprint());
        self.session_id = Some(sid);
        self.session = Some(session);
        Ok(())
    }

    async fn new_id(&self) -> String {
        if let Some(genid) = &self.config.genid {
            return genid(&self.ctx);
        }

        match self.store.generate(&self.ctx).await {
            Ok(sid) => sid,
            Err(e) => {
                warn!("Store failed to generate a session id, using the default: {}", e);
                sid::generate()
            }
        }
    }

    fn recall(&mut self, sid: String, record: SessionData) -> Result<()> {
        let cookie = CookieAttributes::new(&self.config.cookie, OffsetDateTime::now_utc());
        let session = Session::builder()
            .id(sid.clone())
            .store(self.store.clone())
            .cookie(cookie)
            .data(record)
            .build()?;

        let hash = session.fingerprint();
        if !self.config.resave {
            self.state.saved_hash = Some(hash.clone());
        }
        self.state.original_id = Some(sid.clone());
        self.state.original_hash = Some(hash);
        self.session_id = Some(sid);
        self.session = Some(session);
        Ok(())
    }

    fn is_modified(&self, sid: &str, hash: &str) -> bool {
        self.state.original_id.as_deref() != Some(sid)
            || self.state.original_hash.as_deref() != Some(hash)
    }

    fn is_saved(&self, sid: &str, hash: &str) -> bool {
        self.state.original_id.as_deref() == Some(sid)
            && self.state.saved_hash.as_deref() == Some(hash)
    }

    fn is_recurring(&self, sid: &str) -> bool {
        self.state.cookie_id.as_deref() == Some(sid)
    }

    fn should_save(&self, sid: &str, hash: &str) -> bool {
        if !self.config.save_uninitialized
            && self.state.saved_hash.is_none()
            && !self.is_recurring(sid)
        {
            self.is_modified(sid, hash)
        } else {
            !self.is_saved(sid, hash)
        }
    }

    fn should_touch(&self, sid: &str, hash: &str) -> bool {
        self.is_recurring(sid) && !self.should_save(sid, hash) && self.store.supports_touch()
    }

    fn should_set_cookie(&self, session: &Session, hash: &str) -> bool {
        let sid = session.id();
        if self.unsigned_id.is_some() && self.state.original_id == self.unsigned_id {
            return true;
        }

        if !self.is_recurring(sid) {
            self.config.save_uninitialized || self.is_modified(sid, hash)
        } else {
            self.config.rolling
                || (session.cookie.expires_at().is_some() && self.is_modified(sid, hash))
        }
    }

    fn should_destroy(&self) -> bool {
        self.session.is_none()
            && self.session_id.is_some()
            && self.config.unset == UnsetPolicy::Destroy
    }

    fn set_cookie(&self, session: &Session, headers: &mut HeaderMap) -> Result<()> {
        let secret = self.config.signing_secret().ok_or(SessionError::InvalidSecret)?;
        let value = format!("s:{}", sign(session.id(), secret)?);
        let line = session
            .cookie
            .resolved_for(self.secure)
            .serialize(&self.config.name, &value)?;

        let header = HeaderValue::from_str(&line)
            .map_err(|e| SessionError::attribute(format!("set-cookie header is invalid: {e}")))?;
        headers.append(SET_COOKIE, header);
        Ok(())
    }

    /// Runs the end-of-request decisions: destroy, cookie issuance, then save or touch.
    ///
    /// The `Set-Cookie` header is written to `headers` before any store write, so a
    /// persistence failure is returned only after the response headers are complete.
    pub async fn finalize(mut self, headers: &mut HeaderMap) -> Result<Finalized> {
        if self.session.as_ref().is_some_and(Session::is_destroyed) {
            self.session = None;
        }

        let mut report = Finalized {
            session_id: self.session_id.clone(),
            cookie_set: false,
            action: StoreAction::None,
        };

        if self.should_destroy() {
            if let Some(sid) = &self.session_id {
                debug!("Session unset, destroying stored record");
                self.store.destroy(sid).await?;
                report.action = StoreAction::Destroyed;
            }
        }

        let Some(mut session) = self.session.take() else {
            return Ok(report);
        };

        if let Some(saved) = session.take_saved_fingerprint() {
            self.state.saved_hash = Some(saved);
        }
        let hash = session.fingerprint();
        let sid = session.id().to_string();

        if !self.state.touched {
            session.touch();
            self.state.touched = true;
        }

        let mut failure: Option<SessionError> = None;

        if self.should_set_cookie(&session, &hash) {
            if session.cookie.secure.resolve(self.secure) == Secure::Always && !self.secure {
                debug!("Not issuing secure session cookie over an insecure connection");
            } else {
                match self.set_cookie(&session, headers) {
                    Ok(()) => report.cookie_set = true,
                    Err(e) => {
                        warn!("Failed to issue session cookie: {}", e);
                        failure = Some(e);
                    }
                }
            }
        }

        if self.should_save(&sid, &hash) {
            match session.save().await {
                Ok(()) => {
                    debug!("Session saved");
                    report.action = StoreAction::Saved;
                }
                Err(e) => {
                    warn!("Failed to save session: {}", e);
                    failure.get_or_insert(e);
                }
            }
        } else if self.should_touch(&sid, &hash) {
            let touched = match session.data() {
                Ok(data) => self.store.touch(&sid, &data).await,
                Err(e) => Err(e),
            };
            match touched {
                Ok(()) => {
                    debug!("Session touched");
                    report.action = StoreAction::Touched;
                }
                Err(e) => {
                    warn!("Failed to touch session: {}", e);
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
