//! Session entity.
//!
//! A [`Session`] is the request-scoped view of one client's server-side state: an
//! immutable identifier, the [`CookieAttributes`] of its cookie and an open property bag
//! of JSON values. Sessions are always bound to a store; [`Session::save`],
//! [`Session::reload`] and [`Session::destroy`] go straight to it.
//!
//! The persisted snapshot ([`Session::data`]) holds the application keys plus a `cookie`
//! entry and nothing else.
//!
//! ```rust
//! # use std::sync::Arc;
//! # use gosub_session::session::Session;
//! # use gosub_session::store::MemoryStore;
//! # async fn demo() -> gosub_session::errors::Result<()> {
//! let mut session = Session::builder()
//!     .id("abc")
//!     .store(Arc::new(MemoryStore::new()))
//!     .build()?;
//!
//! session.insert("views", 1)?;
//! session.save().await?;
//! # Ok(()) }
//! ```
pub mod fingerprint;

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::cookies::CookieAttributes;
use crate::errors::{Result, SessionError};
use crate::store::StoreHandle;

/// Persisted form of a session: application keys plus the reserved `cookie` entry.
pub type SessionData = BTreeMap<String, Value>;

/// Key under which the cookie attributes are stored. Applications cannot write it.
pub const COOKIE_KEY: &str = "cookie";

pub struct Session {
    id: String,
    /// Cookie directives for this session.
    pub cookie: CookieAttributes,
    /// Application data, never containing [`COOKIE_KEY`].
    data: SessionData,
    store: StoreHandle,
    /// Fingerprint of the last successful explicit save, until the engine collects it.
    saved_fingerprint: Option<String>,
    destroyed: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("cookie", &self.cookie)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`]. Both an identifier and a store are required.
#[derive(Default)]
pub struct SessionBuilder {
    id: Option<String>,
    store: Option<StoreHandle>,
    cookie: Option<CookieAttributes>,
    data: Option<SessionData>,
}

impl SessionBuilder {
    pub fn id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cookie(mut self, cookie: CookieAttributes) -> Self {
        self.cookie = Some(cookie);
        self
    }

    /// Initial data, typically a record recalled from the store. A `cookie` entry in it
    /// overrides [`SessionBuilder::cookie`].
    pub fn data(mut self, data: SessionData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn build(self) -> Result<Session> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(SessionError::InvalidSessionState(
                    "session has no identifier".into(),
                ))
            }
        };

        let Some(store) = self.store else {
            return Err(SessionError::InvalidSessionState(format!(
                "session {id} is not bound to a store"
            )));
        };

        let mut session = Session {
            id,
            cookie: self.cookie.unwrap_or_default(),
            data: SessionData::new(),
            store,
            saved_fingerprint: None,
            destroyed: false,
        };

        if let Some(data) = self.data {
            session.merge(data);
        }

        Ok(session)
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the value under `key` deserialized as `T`, or `None` when absent or of a
    /// different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert<K: Into<String>, V: Serialize>(&mut self, key: K, value: V) -> Result<Option<Value>> {
        let key = key.into();
        if key == COOKIE_KEY {
            return Err(SessionError::ReservedKey(key));
        }

        let value = serde_json::to_value(value)?;
        Ok(self.data.insert(key, value))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Removes all application data. The cookie is kept.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Persistable snapshot: application data plus the serialized cookie.
    pub fn data(&self) -> Result<SessionData> {
        let mut snapshot = self.data.clone();
        snapshot.insert(COOKIE_KEY.to_string(), serde_json::to_value(&self.cookie)?);
        Ok(snapshot)
    }

    /// Merges `data` into the session. Keys not present in `data` are left untouched;
    /// a `cookie` entry replaces the cookie attributes.
    pub fn merge(&mut self, data: SessionData) {
        for (key, value) in data {
            if key == COOKIE_KEY {
                match serde_json::from_value::<CookieAttributes>(value) {
                    Ok(cookie) => self.cookie = cookie,
                    Err(e) => warn!("Ignoring malformed stored session cookie: {}", e),
                }
            } else {
                self.data.insert(key, value);
            }
        }
    }

    /// Content hash of the application data, excluding the cookie.
    pub fn fingerprint(&self) -> String {
        fingerprint::fingerprint(&self.data)
    }

    /// Persists the snapshot under this session's id.
    pub async fn save(&mut self) -> Result<()> {
        let snapshot = self.data()?;
        self.store.set(&self.id, &snapshot).await?;
        self.saved_fingerprint = Some(self.fingerprint());
        self.destroyed = false;
        Ok(())
    }

    /// Replaces the in-memory data wholesale with the stored record. Unsaved changes are
    /// lost.
    pub async fn reload(&mut self) -> Result<()> {
        let record = self
            .store
            .get(&self.id)
            .await?
            .ok_or_else(|| SessionError::NotFound(self.id.clone()))?;

        self.data.clear();
        self.merge(record);
        Ok(())
    }

    /// Removes the stored record. The lifecycle engine will neither save this session
    /// nor issue its cookie afterwards.
    pub async fn destroy(&mut self) -> Result<()> {
        self.store.destroy(&self.id).await?;
        self.destroyed = true;
        Ok(())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Resets the cookie max age to its original value. Data is not touched.
    pub fn touch(&mut self) {
        self.reset_max_age();
    }

    pub fn reset_max_age(&mut self) {
        self.cookie.reset_expiry(OffsetDateTime::now_utc());
    }

    pub(crate) fn take_saved_fingerprint(&mut self) -> Option<String> {
        self.saved_fingerprint.take()
    }
}
