//! Session store infrastructure.
//!
//! A **session store** is the durable side of a session: it maps a session identifier
//! (`sid`) to the session's persisted snapshot ([`SessionData`]). The lifecycle engine
//! only talks to stores through the [`SessionStore`] trait, so backends can be swapped
//! without touching request handling.
//!
//! - [`MemoryStore`] is the reference implementation. It keeps everything in process
//!   memory, never evicts, and is meant for tests and development only.
//!
//! ## Contract
//! - `get` for an unknown sid is `Ok(None)`, never an error. `Ok(Some(empty))` means the
//!   record exists but holds no data.
//! - `set` replaces any previous record for the sid.
//! - `destroy` is idempotent.
//! - `touch` is optional. Stores that can refresh expiry cheaply return `true` from
//!   [`SessionStore::supports_touch`]; the default implementation falls back to `set`.
//! - `generate` mints a fresh identifier; the default is a random UUID v4.
//!
//! Implementations must be `Send + Sync` and synchronize internally; all methods take
//! `&self`.
//!
//! ## Example: sharing a store
//! ```rust
//! use std::sync::Arc;
//! use gosub_session::store::{MemoryStore, StoreHandle};
//!
//! let store: StoreHandle = Arc::new(MemoryStore::new());
//! let for_engine = store.clone();
//! # drop(for_engine);
//! ```
mod in_memory;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::RequestContext;
use crate::errors::Result;
use crate::session::SessionData;
use crate::sid;

pub use in_memory::MemoryStore;

/// A handle to a session store trait object.
pub type StoreHandle = Arc<dyn SessionStore>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the record for `sid`, or `None` when the store does not know it.
    async fn get(&self, sid: &str) -> Result<Option<SessionData>>;

    /// Inserts or fully replaces the record for `sid`.
    async fn set(&self, sid: &str, data: &SessionData) -> Result<()>;

    /// Removes the record for `sid`. Removing an unknown sid is not an error.
    async fn destroy(&self, sid: &str) -> Result<()>;

    /// Whether [`SessionStore::touch`] is cheaper than a full `set`.
    fn supports_touch(&self) -> bool {
        false
    }

    /// Refreshes the expiry of `sid` without rewriting its payload.
    async fn touch(&self, sid: &str, data: &SessionData) -> Result<()> {
        self.set(sid, data).await
    }

    /// Mints a new session identifier.
    async fn generate(&self, _ctx: &RequestContext) -> Result<String> {
        Ok(sid::generate())
    }
}
