//! Session engine configuration.
//!
//! `SessionConfig` controls how the [`SessionEngine`](crate::engine::SessionEngine) names,
//! signs and issues the session cookie and when it writes to the store.
//!
//! `SessionConfig` provides defaults via [`Default`] and a fluent
//! [`SessionConfig::builder()`] that validates the result. At least one secret is
//! required, so the default config alone does not build.
//!
//! # Examples
//!
//! ```rust
//! use gosub_session::config::{SessionConfig, UnsetPolicy};
//! use gosub_session::cookies::{CookieOptions, SameSite};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = SessionConfig::builder()
//!     .secret("keyboard cat")
//!     .name("app.sid")
//!     .rolling(true)
//!     .save_uninitialized(false)
//!     .unset(UnsetPolicy::Destroy)
//!     .cookie(CookieOptions::default().max_age_ms(3_600_000).same_site(SameSite::Lax))
//!     .build()?; // returns Result<SessionConfig, ConfigError>
//! assert_eq!(cfg.name, "app.sid");
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `name`: cookie name (default: `connect.sid`).
//! - `secrets`: signing secrets. The first signs, all of them verify.
//! - `genid`: optional identifier generator, takes precedence over the store's.
//! - `cookie`: attribute overrides for new session cookies.
//! - `resave`: save unmodified sessions at the end of every request (default: true).
//! - `rolling`: re-issue the cookie on every response (default: false).
//! - `save_uninitialized`: save and issue new, unmodified sessions (default: true).
//! - `proxy`: `Some(true)` trusts `X-Forwarded-Proto` for transport security.
//! - `unset`: what happens when the handler drops the session (default: keep).
//! - `regenerate_overwrites`: keep the old record alive across `regenerate` unless false.
//! - `accept_unsigned`: accept raw, unsigned legacy cookie values as lookup keys.

use std::fmt;

use serde::Deserialize;

use crate::cookies::header;
use crate::cookies::CookieOptions;
use crate::sid::IdGenerator;

pub const DEFAULT_COOKIE_NAME: &str = "connect.sid";

/// What finalization does with a session the handler has unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsetPolicy {
    /// Leave the stored record alone.
    #[default]
    Keep,
    /// Remove the stored record.
    Destroy,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub name: String,
    pub secrets: Vec<String>,
    pub genid: Option<IdGenerator>,
    pub cookie: CookieOptions,
    pub resave: bool,
    pub rolling: bool,
    pub save_uninitialized: bool,
    pub proxy: Option<bool>,
    pub unset: UnsetPolicy,
    pub regenerate_overwrites: bool,
    pub accept_unsigned: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            secrets: Vec::new(),
            genid: None,
            cookie: CookieOptions::default(),
            resave: true,
            rolling: false,
            save_uninitialized: true,
            proxy: None,
            unset: UnsetPolicy::Keep,
            regenerate_overwrites: false,
            accept_unsigned: false,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("name", &self.name)
            .field("secrets", &format_args!("[{} redacted]", self.secrets.len()))
            .field("genid", &self.genid.is_some())
            .field("cookie", &self.cookie)
            .field("resave", &self.resave)
            .field("rolling", &self.rolling)
            .field("save_uninitialized", &self.save_uninitialized)
            .field("proxy", &self.proxy)
            .field("unset", &self.unset)
            .field("regenerate_overwrites", &self.regenerate_overwrites)
            .field("accept_unsigned", &self.accept_unsigned)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Secret used to sign outgoing cookies.
    pub fn signing_secret(&self) -> Option<&str> {
        self.secrets.first().map(String::as_str)
    }
}

/// Builder for [`SessionConfig`].
#[derive(Default)]
pub struct SessionConfigBuilder {
    inner: SessionConfig,
}

impl SessionConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut SessionConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.name = name.into()) }
    /// Replaces the secret list with a single secret.
    pub fn secret<S: Into<String>>(self, secret: S) -> Self { self.map(|c| c.secrets = vec![secret.into()]) }
    /// Replaces the secret list. The first entry signs; the rest only verify.
    pub fn secrets<I, S>(self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|c| c.secrets = secrets.into_iter().map(Into::into).collect())
    }
    pub fn genid(self, generator: IdGenerator) -> Self { self.map(|c| c.genid = Some(generator)) }
    pub fn cookie(self, options: CookieOptions) -> Self { self.map(|c| c.cookie = options) }
    pub fn resave(self, on: bool) -> Self { self.map(|c| c.resave = on) }
    pub fn rolling(self, on: bool) -> Self { self.map(|c| c.rolling = on) }
    pub fn save_uninitialized(self, on: bool) -> Self { self.map(|c| c.save_uninitialized = on) }
    pub fn proxy(self, trust: bool) -> Self { self.map(|c| c.proxy = Some(trust)) }
    pub fn unset(self, policy: UnsetPolicy) -> Self { self.map(|c| c.unset = policy) }
    pub fn regenerate_overwrites(self, on: bool) -> Self { self.map(|c| c.regenerate_overwrites = on) }
    pub fn accept_unsigned(self, on: bool) -> Self { self.map(|c| c.accept_unsigned = on) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut SessionConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one secret is required to sign session cookies")]
    EmptySecrets,
    #[error("secret #{0} is empty")]
    EmptySecret(usize),
    #[error("invalid cookie name {0:?}")]
    InvalidName(String),
}

pub(crate) fn validate(c: &SessionConfig) -> Result<(), ConfigError> {
    if c.secrets.is_empty() {
        return Err(ConfigError::EmptySecrets);
    }
    if let Some(idx) = c.secrets.iter().position(String::is_empty) {
        return Err(ConfigError::EmptySecret(idx));
    }
    if header::validate_name(&c.name).is_err() {
        return Err(ConfigError::InvalidName(c.name.clone()));
    }
    Ok(())
}
