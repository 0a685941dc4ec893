//! Cookie attribute model.
//!
//! [`CookieAttributes`] is owned by exactly one [`Session`](crate::session::Session) and is
//! stored alongside the session data under the reserved `cookie` key. The serialized shape
//! follows the wire values most session stores already use:
//!
//! ```json
//! { "maxAge": 86400000, "originalMaxAge": 86400000, "expires": "2026-10-19T10:00:00Z",
//!   "httpOnly": true, "secure": false, "path": "/", "sameSite": "lax", "signed": true,
//!   "partitioned": false }
//! ```
//!
//! `secure` accepts `true`, `false` or `"auto"`; `sameSite` accepts `false`, `true`
//! (strict), `"lax"`, `"strict"` or `"none"`.
//!
//! ## Expiry
//! `original_max_age_ms` is fixed when the attributes are created and only changes through
//! [`CookieAttributes::set_max_age`] or [`CookieAttributes::set_expires`]. Touching a
//! session calls [`CookieAttributes::reset_expiry`], which restores the max age and pushes
//! the expiry forward.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::cookies::header;
use crate::errors::{Result, SessionError};

/// Wire representation shared by [`Secure`] and [`SameSite`]: either a flag or a keyword.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FlagOrKeyword {
    Flag(bool),
    Keyword(String),
}

/// `SameSite` policy of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FlagOrKeyword", into = "FlagOrKeyword")]
pub enum SameSite {
    /// No `SameSite` attribute is emitted.
    #[default]
    Off,
    Lax,
    Strict,
    None,
}

impl FromStr for SameSite {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "false" | "off" => Ok(SameSite::Off),
            "true" | "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(SessionError::attribute(format!("sameSite {other:?} is invalid"))),
        }
    }
}

impl TryFrom<FlagOrKeyword> for SameSite {
    type Error = SessionError;

    fn try_from(value: FlagOrKeyword) -> Result<Self> {
        match value {
            FlagOrKeyword::Flag(true) => Ok(SameSite::Strict),
            FlagOrKeyword::Flag(false) => Ok(SameSite::Off),
            FlagOrKeyword::Keyword(s) => s.parse(),
        }
    }
}

impl From<SameSite> for FlagOrKeyword {
    fn from(value: SameSite) -> Self {
        match value {
            SameSite::Off => FlagOrKeyword::Flag(false),
            SameSite::Lax => FlagOrKeyword::Keyword("lax".into()),
            SameSite::Strict => FlagOrKeyword::Keyword("strict".into()),
            SameSite::None => FlagOrKeyword::Keyword("none".into()),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Off => write!(f, "false"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::Strict => write!(f, "Strict"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// `Secure` flag of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FlagOrKeyword", into = "FlagOrKeyword")]
pub enum Secure {
    Always,
    #[default]
    Never,
    /// Follows the transport security of the request the cookie is issued on.
    Auto,
}

impl Secure {
    /// Resolves [`Secure::Auto`] against the security of the current request.
    pub fn resolve(self, secure_request: bool) -> Secure {
        match self {
            Secure::Auto if secure_request => Secure::Always,
            Secure::Auto => Secure::Never,
            other => other,
        }
    }
}

impl FromStr for Secure {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Secure::Always),
            "false" => Ok(Secure::Never),
            "auto" => Ok(Secure::Auto),
            other => Err(SessionError::attribute(format!("secure {other:?} is invalid"))),
        }
    }
}

impl TryFrom<FlagOrKeyword> for Secure {
    type Error = SessionError;

    fn try_from(value: FlagOrKeyword) -> Result<Self> {
        match value {
            FlagOrKeyword::Flag(true) => Ok(Secure::Always),
            FlagOrKeyword::Flag(false) => Ok(Secure::Never),
            FlagOrKeyword::Keyword(s) => s.parse(),
        }
    }
}

impl From<Secure> for FlagOrKeyword {
    fn from(value: Secure) -> Self {
        match value {
            Secure::Always => FlagOrKeyword::Flag(true),
            Secure::Never => FlagOrKeyword::Flag(false),
            Secure::Auto => FlagOrKeyword::Keyword("auto".into()),
        }
    }
}

/// `Priority` attribute of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(SessionError::attribute(format!("priority {other:?} is invalid"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

/// User supplied cookie options. Unset fields fall back to the defaults documented on
/// [`CookieAttributes::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieOptions {
    /// Lifetime in milliseconds. `None` makes the cookie a browser-session cookie.
    #[serde(rename = "maxAge")]
    pub max_age_ms: Option<i64>,
    /// Absolute expiry; ignored when `max_age_ms` is set.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub http_only: Option<bool>,
    pub secure: Option<Secure>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub same_site: Option<SameSite>,
    pub signed: Option<bool>,
    pub partitioned: Option<bool>,
    pub priority: Option<Priority>,
}

impl CookieOptions {
    pub fn max_age_ms(mut self, ms: i64) -> Self { self.max_age_ms = Some(ms); self }
    pub fn expires(mut self, at: OffsetDateTime) -> Self { self.expires = Some(at); self }
    pub fn http_only(mut self, on: bool) -> Self { self.http_only = Some(on); self }
    pub fn secure(mut self, secure: Secure) -> Self { self.secure = Some(secure); self }
    pub fn path<S: Into<String>>(mut self, path: S) -> Self { self.path = Some(path.into()); self }
    pub fn domain<S: Into<String>>(mut self, domain: S) -> Self { self.domain = Some(domain.into()); self }
    pub fn same_site(mut self, same_site: SameSite) -> Self { self.same_site = Some(same_site); self }
    pub fn signed(mut self, on: bool) -> Self { self.signed = Some(on); self }
    pub fn partitioned(mut self, on: bool) -> Self { self.partitioned = Some(on); self }
    pub fn priority(mut self, priority: Priority) -> Self { self.priority = Some(priority); self }
}

fn default_true() -> bool {
    true
}

fn default_path() -> String {
    "/".to_string()
}

/// Directives attached to the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieAttributes {
    #[serde(rename = "maxAge", default)]
    max_age_ms: Option<i64>,
    #[serde(rename = "originalMaxAge", default)]
    original_max_age_ms: Option<i64>,
    #[serde(rename = "expires", default, with = "time::serde::rfc3339::option")]
    expires_at: Option<OffsetDateTime>,
    #[serde(default = "default_true")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: Secure,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub partitioned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            max_age_ms: None,
            original_max_age_ms: None,
            expires_at: None,
            http_only: true,
            secure: Secure::Never,
            path: default_path(),
            domain: None,
            same_site: SameSite::Off,
            signed: false,
            partitioned: false,
            priority: None,
        }
    }
}

impl CookieAttributes {
    /// Builds attributes from `options`, filling unset fields with `path="/"`,
    /// `http_only=true`, `secure=false`, `same_site=false` and `signed=false`.
    ///
    /// When a max age is given it becomes the original max age and the expiry is
    /// computed from `now`.
    pub fn new(options: &CookieOptions, now: OffsetDateTime) -> Self {
        let defaults = Self::default();
        let mut attrs = Self {
            max_age_ms: None,
            original_max_age_ms: None,
            expires_at: None,
            http_only: options.http_only.unwrap_or(defaults.http_only),
            secure: options.secure.unwrap_or(defaults.secure),
            path: options.path.clone().unwrap_or(defaults.path),
            domain: options.domain.clone(),
            same_site: options.same_site.unwrap_or(defaults.same_site),
            signed: options.signed.unwrap_or(defaults.signed),
            partitioned: options.partitioned.unwrap_or(defaults.partitioned),
            priority: options.priority,
        };

        match (options.max_age_ms, options.expires) {
            (Some(ms), _) => attrs.set_max_age(Some(ms), now),
            (None, Some(at)) => attrs.set_expires(Some(at), now),
            (None, None) => {}
        }

        attrs
    }

    pub fn max_age_ms(&self) -> Option<i64> {
        self.max_age_ms
    }

    pub fn original_max_age_ms(&self) -> Option<i64> {
        self.original_max_age_ms
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.expires_at
    }

    /// Remaining lifetime in milliseconds, or `0` for cookies without an expiry.
    pub fn remaining_ms(&self, now: OffsetDateTime) -> i64 {
        match self.expires_at {
            Some(at) => {
                let ms = (at - now).whole_milliseconds();
                ms.clamp(i64::MIN as i128, i64::MAX as i128) as i64
            }
            None => 0,
        }
    }

    /// Sets a new lifetime. This redefines the original max age.
    pub fn set_max_age(&mut self, ms: Option<i64>, now: OffsetDateTime) {
        self.max_age_ms = ms;
        self.original_max_age_ms = ms;
        self.expires_at = ms.map(|ms| expiry_from(now, ms));
    }

    /// Sets an absolute expiry. The remaining lifetime becomes the original max age.
    pub fn set_expires(&mut self, at: Option<OffsetDateTime>, now: OffsetDateTime) {
        self.expires_at = at;
        self.max_age_ms = at.map(|_| self.remaining_ms(now));
        self.original_max_age_ms = self.max_age_ms;
    }

    /// Restores the max age to its original value and moves the expiry forward.
    pub fn reset_expiry(&mut self, now: OffsetDateTime) {
        self.max_age_ms = self.original_max_age_ms;
        if let Some(ms) = self.max_age_ms {
            self.expires_at = Some(expiry_from(now, ms));
        }
    }

    /// Copy of these attributes with [`Secure::Auto`] resolved for the current request.
    pub fn resolved_for(&self, secure_request: bool) -> CookieAttributes {
        let mut resolved = self.clone();
        resolved.secure = self.secure.resolve(secure_request);
        resolved
    }

    /// Renders `name=value` followed by the attributes as a `Set-Cookie` header value.
    ///
    /// The value is percent-encoded. Attributes appear in a fixed order: `Max-Age`,
    /// `Domain`, `Path`, `Expires`, `HttpOnly`, `Secure`, `SameSite`, `Priority`,
    /// `Partitioned`. An unresolved [`Secure::Auto`] does not emit `Secure`.
    pub fn serialize(&self, name: &str, value: &str) -> Result<String> {
        header::validate_name(name)?;

        let value = urlencoding::encode(value);
        header::validate_field("value", &value)?;

        let mut out = format!("{name}={value}");

        if let Some(ms) = self.max_age_ms {
            out.push_str(&format!("; Max-Age={}", ms.div_euclid(1000)));
        }

        if let Some(domain) = &self.domain {
            header::validate_field("domain", domain)?;
            out.push_str(&format!("; Domain={domain}"));
        }

        if !self.path.is_empty() {
            header::validate_field("path", &self.path)?;
            out.push_str(&format!("; Path={}", self.path));
        }

        if let Some(at) = self.expires_at {
            out.push_str(&format!("; Expires={}", header::http_date(at)?));
        }

        if self.http_only {
            out.push_str("; HttpOnly");
        }

        if self.secure == Secure::Always {
            out.push_str("; Secure");
        }

        if self.same_site != SameSite::Off {
            out.push_str(&format!("; SameSite={}", self.same_site));
        }

        if let Some(priority) = self.priority {
            out.push_str(&format!("; Priority={priority}"));
        }

        if self.partitioned {
            out.push_str("; Partitioned");
        }

        Ok(out)
    }
}

fn expiry_from(now: OffsetDateTime, ms: i64) -> OffsetDateTime {
    now.saturating_add(Duration::milliseconds(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::header::parse;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-18 10:00:00 UTC);

    #[test]
    fn defaults_are_applied() {
        let c = CookieAttributes::new(&CookieOptions::default(), NOW);
        assert_eq!(c.path, "/");
        assert!(c.http_only);
        assert_eq!(c.secure, Secure::Never);
        assert_eq!(c.same_site, SameSite::Off);
        assert!(!c.signed);
        assert!(c.max_age_ms().is_none());
        assert!(c.expires_at().is_none());
        assert_eq!(c.remaining_ms(NOW), 0);
    }

    #[test]
    fn max_age_sets_original_and_expiry() {
        let c = CookieAttributes::new(&CookieOptions::default().max_age_ms(60_000), NOW);
        assert_eq!(c.max_age_ms(), Some(60_000));
        assert_eq!(c.original_max_age_ms(), Some(60_000));
        assert_eq!(c.expires_at(), Some(datetime!(2026-10-18 10:01:00 UTC)));
        assert_eq!(c.remaining_ms(NOW), 60_000);
    }

    #[test]
    fn reset_expiry_restores_original_max_age() {
        let mut c = CookieAttributes::new(&CookieOptions::default().max_age_ms(60_000), NOW);
        c.max_age_ms = Some(1);

        let later = NOW + Duration::seconds(30);
        c.reset_expiry(later);
        assert_eq!(c.max_age_ms(), Some(60_000));
        assert_eq!(c.original_max_age_ms(), Some(60_000));
        assert_eq!(c.expires_at(), Some(datetime!(2026-10-18 10:01:30 UTC)));

        // twice is the same as once
        let once = c.clone();
        c.reset_expiry(later);
        assert_eq!(c, once);
    }

    #[test]
    fn serialize_uses_fixed_attribute_order() {
        let c = CookieAttributes::new(
            &CookieOptions::default()
                .max_age_ms(3_600_500)
                .domain("example.com")
                .secure(Secure::Always)
                .same_site(SameSite::Lax)
                .priority(Priority::High)
                .partitioned(true),
            NOW,
        );

        let header = c.serialize("connect.sid", "abc").unwrap();
        assert_eq!(
            header,
            "connect.sid=abc; Max-Age=3600; Domain=example.com; Path=/; \
             Expires=Sun, 18 Oct 2026 11:00:00 GMT; HttpOnly; Secure; SameSite=Lax; \
             Priority=High; Partitioned"
        );
    }

    #[test]
    fn serialize_omits_absent_attributes() {
        let mut c = CookieAttributes::default();
        c.http_only = false;
        c.path.clear();
        assert_eq!(c.serialize("sid", "v").unwrap(), "sid=v");
    }

    #[test]
    fn serialize_rejects_bad_fields() {
        let c = CookieAttributes::default();
        assert!(matches!(c.serialize("bad name", "v"), Err(SessionError::InvalidAttribute(_))));
        assert!(matches!(c.serialize("a;b", "v"), Err(SessionError::InvalidAttribute(_))));
        assert!(matches!(c.serialize("", "v"), Err(SessionError::InvalidAttribute(_))));

        let mut c = CookieAttributes::default();
        c.domain = Some("exa\nmple.com".into());
        assert!(matches!(c.serialize("sid", "v"), Err(SessionError::InvalidAttribute(_))));

        let mut c = CookieAttributes::default();
        c.path = "/a; Secure".into();
        assert!(matches!(c.serialize("sid", "v"), Err(SessionError::InvalidAttribute(_))));
    }

    #[test]
    fn auto_secure_resolves_against_request() {
        let c = CookieAttributes::new(&CookieOptions::default().secure(Secure::Auto), NOW);
        assert!(!c.serialize("sid", "v").unwrap().contains("Secure"));
        assert!(c.resolved_for(true).serialize("sid", "v").unwrap().ends_with("; Secure"));
        assert_eq!(c.resolved_for(false).secure, Secure::Never);
    }

    #[test]
    fn parse_recovers_serialized_pair() {
        let combos = [
            CookieOptions::default(),
            CookieOptions::default().max_age_ms(1000).same_site(SameSite::Strict),
            CookieOptions::default().domain("a.example").path("/app").secure(Secure::Always),
            CookieOptions::default().expires(datetime!(2030-01-01 00:00:00 UTC)).http_only(false),
        ];

        for opts in combos {
            let c = CookieAttributes::new(&opts, NOW);
            let value = "s:3f1c.ab+c/d=";
            let header = c.serialize("connect.sid", value).unwrap();
            let parsed = parse(&header);
            assert_eq!(parsed.get("connect.sid").map(String::as_str), Some(value), "{header}");
        }
    }

    #[test]
    fn keyword_parsing() {
        assert_eq!("LAX".parse::<SameSite>().unwrap(), SameSite::Lax);
        assert_eq!("true".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert!("sometimes".parse::<SameSite>().is_err());
        assert_eq!("auto".parse::<Secure>().unwrap(), Secure::Auto);
        assert!("maybe".parse::<Secure>().is_err());
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn json_shape_round_trips_through_serde() {
        let c = CookieAttributes::new(
            &CookieOptions::default().max_age_ms(5_000).secure(Secure::Auto).same_site(SameSite::None),
            NOW,
        );
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["maxAge"], 5_000);
        assert_eq!(json["originalMaxAge"], 5_000);
        assert_eq!(json["secure"], "auto");
        assert_eq!(json["sameSite"], "none");
        assert_eq!(json["httpOnly"], true);

        let back: CookieAttributes = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn flag_values_deserialize() {
        let c: CookieAttributes =
            serde_json::from_str(r#"{"secure": true, "sameSite": true, "path": "/x"}"#).unwrap();
        assert_eq!(c.secure, Secure::Always);
        assert_eq!(c.same_site, SameSite::Strict);
        assert!(c.http_only);
        assert!(c.expires_at().is_none());

        let err = serde_json::from_str::<CookieAttributes>(r#"{"sameSite": "sometimes"}"#);
        assert!(err.is_err());
    }
}
