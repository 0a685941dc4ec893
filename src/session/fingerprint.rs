//! Content hash used for dirty checking.
//!
//! The hash is the hex SHA-256 of a canonical JSON rendering of the session data: object
//! keys sorted at every level, no whitespace. The `cookie` entry is left out so that
//! rolling expiry never looks like a data change.
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::session::{SessionData, COOKIE_KEY};

pub fn fingerprint(data: &SessionData) -> String {
    let mut out = String::from("{");
    let mut first = true;

    for (key, value) in data.iter().filter(|(k, _)| k.as_str() != COOKIE_KEY) {
        if !first {
            out.push(',');
        }
        first = false;
        write_key(key, &mut out);
        write_canonical(value, &mut out);
    }
    out.push('}');

    hex::encode(Sha256::digest(out.as_bytes()))
}

fn write_key(key: &str, out: &mut String) {
    out.push_str(&Value::String(key.to_string()).to_string());
    out.push(':');
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_key(key, out);
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> SessionData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn stable_for_equal_content() {
        let a = data(json!({"a": 1, "b": {"y": [1, 2], "x": "s"}}));
        let b = data(json!({"b": {"x": "s", "y": [1, 2]}, "a": 1}));
        assert_eq!(fingerprint(&a), fingerprint(&a));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn changes_with_data() {
        let a = data(json!({"count": 1}));
        let b = data(json!({"count": 2}));
        let c = data(json!({"count": [1]}));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn ignores_cookie_entry() {
        let a = data(json!({"count": 1, "cookie": {"maxAge": 1}}));
        let b = data(json!({"count": 1, "cookie": {"maxAge": 2}}));
        let c = data(json!({"count": 1}));
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn empty_session_hash_is_hash_of_empty_object() {
        let expected = hex::encode(Sha256::digest(b"{}"));
        assert_eq!(fingerprint(&SessionData::new()), expected);
    }
}
