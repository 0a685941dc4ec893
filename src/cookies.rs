// src/cookies.rs
//! Session cookie: [`CookieAttributes`], header wire format and value signing.
//!
//! - [`attributes`] holds the directives the server attaches to the session cookie
//!   (max age, expiry, path, domain and flags) and renders them as a `Set-Cookie` value.
//! - [`header`] parses inbound `Cookie` headers and validates outbound fields.
//! - [`signature`] signs and verifies the session identifier with one or more secrets.

pub mod attributes;
pub mod header;
pub mod signature;

pub use attributes::{CookieAttributes, CookieOptions, Priority, SameSite, Secure};
pub use header::parse;
pub use signature::{sign, unsign, unsign_with_any};
