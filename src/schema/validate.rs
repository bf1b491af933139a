//! Lightweight structural validators run alongside typed (de)serialization,
//! grounded in the `voluptuous` schemas under `evohomeasync2/schema/`.
//! These exist because a server that adds an undocumented field must not
//! break deserialization (serde already ignores unknown fields), but a
//! missing or mistyped *required* field should still be caught and
//! reported as [`TccError::InvalidSchema`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::wire;
use crate::error::{Result, TccError};

static NUMERIC_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(wire::REGEX_NUMERIC_ID).unwrap());

/// All of the installation's opaque ids (`locationId`, `zoneId`, ...) are
/// digit strings on the wire.
pub fn is_valid_id(id: &str) -> bool {
    NUMERIC_ID_RE.is_match(id)
}

/// Check that `value` is an object containing every key in `required`,
/// each non-null.
pub fn require_keys(value: &Value, required: &[&str]) -> Result<()> {
    let Some(map) = value.as_object() else {
        return Err(TccError::invalid_schema("expected a JSON object"));
    };
    for key in required {
        match map.get(*key) {
            None | Some(Value::Null) => {
                return Err(TccError::invalid_schema(format!("missing field: {key}")));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Validate a heat setpoint is within the server's accepted range.
pub fn validate_heat_setpoint(value: f64) -> Result<()> {
    if !(5.0..=35.0).contains(&value) {
        return Err(TccError::invalid_schema(format!(
            "heatSetpoint out of range [5, 35]: {value}"
        )));
    }
    Ok(())
}

/// Validate the `userAccount` response carries its required fields.
pub fn validate_user_account(value: &Value) -> Result<()> {
    require_keys(
        value,
        &["userId", "username", "firstname", "lastname", "country", "language"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_strings_are_valid_ids() {
        assert!(is_valid_id("123456"));
        assert!(is_valid_id(""));
        assert!(!is_valid_id("abc123"));
    }

    #[test]
    fn require_keys_flags_missing_field() {
        let value = json!({"userId": "1"});
        assert!(require_keys(&value, &["userId", "username"]).is_err());
    }

    #[test]
    fn require_keys_flags_null_field() {
        let value = json!({"userId": "1", "username": null});
        assert!(require_keys(&value, &["userId", "username"]).is_err());
    }

    #[test]
    fn heat_setpoint_range_is_enforced() {
        assert!(validate_heat_setpoint(19.5).is_ok());
        assert!(validate_heat_setpoint(4.9).is_err());
        assert!(validate_heat_setpoint(35.1).is_err());
    }
}
