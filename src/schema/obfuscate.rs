//! Redaction of sensitive fields before they hit the log.
//!
//! Mirrors `evohomeasync2/schema/const.py::obfuscate()`: booleans become
//! `null`, integers become `0`, email-shaped strings become a fixed
//! placeholder, everything else becomes a fixed-width placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::wire;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(wire::REGEX_EMAIL).unwrap());

/// Replace a single scalar value with its obfuscated form.
pub fn obfuscate_value(value: &Value) -> Value {
    match value {
        Value::Bool(_) => Value::Null,
        Value::Number(n) if n.is_i64() || n.is_u64() => Value::from(0),
        Value::String(s) if EMAIL_RE.is_match(s) => Value::String("nobody@nowhere.com".into()),
        Value::String(_) => Value::String("********".into()),
        other => other.clone(),
    }
}

/// Obfuscate a whole JSON object in place, replacing the value at each of
/// `keys` if present. Keys not present are left untouched; nested objects
/// are not descended into automatically (callers name the exact keys that
/// carry personal data, as the source does field-by-field).
pub fn obfuscate_fields(value: &mut Value, keys: &[&str]) {
    if let Value::Object(map) = value {
        for key in keys {
            if let Some(existing) = map.get(*key) {
                let redacted = obfuscate_value(existing);
                map.insert((*key).to_string(), redacted);
            }
        }
    }
}

/// Field names that carry personally identifying information on the
/// `userAccount` response, grounded in `evohomeasync2/schema/account.py`.
pub const USER_ACCOUNT_PII_FIELDS: &[&str] = &[
    "username",
    "lastname",
    "streetAddress",
    "city",
    "postcode",
];
