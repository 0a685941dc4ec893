//! Signed-cookie HTTP session lifecycle.
//!
//! Start with [`SessionConfig::builder`], hand the config and a store to
//! [`SessionEngine::new`], then call [`SessionEngine::begin`] and
//! [`RequestSession::finalize`] around every request.
pub mod config;
pub mod cookies;
pub mod engine;
pub mod errors;
pub mod session;
pub mod sid;
pub mod store;

pub use config::{SessionConfig, UnsetPolicy};
pub use engine::{Finalized, RequestContext, RequestSession, SessionEngine, StoreAction};
pub use errors::SessionError;
pub use session::{Session, SessionData};
pub use store::{MemoryStore, SessionStore, StoreHandle};
