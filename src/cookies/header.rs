//! `Cookie` / `Set-Cookie` wire helpers.
//!
//! Parsing is deliberately minimal: an inbound `Cookie` header is split on `;`, every
//! `name=value` pair is trimmed, surrounding double quotes are removed and the value is
//! percent-decoded when possible. The first occurrence of a name wins; later duplicates
//! are ignored. Pairs without `=` (such as `HttpOnly` in a `Set-Cookie` value) are skipped.
use std::collections::HashMap;

use http::header::COOKIE;
use http::HeaderMap;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::errors::{Result, SessionError};

/// Parses a cookie header string into a `name -> value` map.
pub fn parse(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };

        let name = name.trim();
        if name.is_empty() || cookies.contains_key(name) {
            continue;
        }

        let mut value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }

        cookies.insert(name.to_string(), decode(value));
    }

    cookies
}

/// Collects every `Cookie` header of a request and returns the value for `name`.
pub fn find(headers: &HeaderMap, name: &str) -> Option<String> {
    let joined = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    if joined.is_empty() {
        return None;
    }

    parse(&joined).remove(name)
}

fn decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }

    match urlencoding::decode(value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value.to_string(),
    }
}

/// Formats `at` as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn http_date(at: OffsetDateTime) -> Result<String> {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .map_err(|e| SessionError::attribute(format!("expires is invalid: {e}")))
}

fn is_field_content(s: &str) -> bool {
    s.bytes().all(|b| b == b'\t' || (0x20..=0x7e).contains(&b))
}

/// Checks an attribute value (domain, path, encoded value).
pub(crate) fn validate_field(what: &str, s: &str) -> Result<()> {
    if !is_field_content(s) || s.contains(';') {
        return Err(SessionError::attribute(format!("{what} {s:?} is invalid")));
    }
    Ok(())
}

/// Checks a cookie name: non-empty visible ASCII without separators.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && is_field_content(name)
        && !name.contains(|c: char| matches!(c, ' ' | '\t' | '=' | ';' | ',' | '"'));

    if !valid {
        return Err(SessionError::attribute(format!("name {name:?} is invalid")));
    }
    Ok(())
}
