//! Builds the validated URL + body pairs for the v2 command surface.
//! Grounded in `evohomeasync2/controlsystem.py::_set_status` and
//! `evohomeasync2/zone.py::Zone.set_temperature`/`_set_heat_setpoint`.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::error::{Result, TccError};
use crate::schema::SystemMode;
use crate::schema::validate::validate_heat_setpoint;

const API_STRFTIME: &str = "%Y-%m-%dT%H:%M:%SZ";

fn format_until(until: DateTime<Utc>) -> String {
    until.format(API_STRFTIME).to_string()
}

/// `PUT temperatureControlSystem/{id}/mode`
pub fn set_system_mode(system_id: &str, mode: SystemMode, until: Option<DateTime<Utc>>) -> (String, Value) {
    let path = format!("temperatureControlSystem/{system_id}/mode");
    let body = match until {
        None => json!({"systemMode": mode, "permanent": true}),
        Some(until) => json!({
            "systemMode": mode,
            "permanent": false,
            "timeUntil": format_until(until),
        }),
    };
    (path, body)
}

/// `PUT temperatureZone/{id}/heatSetpoint` for a permanent or temporary
/// override.
pub fn set_zone_temperature(
    zone_id: &str,
    temperature: f64,
    until: Option<DateTime<Utc>>,
) -> Result<(String, Value)> {
    validate_heat_setpoint(temperature)?;
    let path = format!("temperatureZone/{zone_id}/heatSetpoint");
    let body = match until {
        None => json!({
            "setpointMode": "PermanentOverride",
            "heatSetpointValue": temperature,
        }),
        Some(until) => json!({
            "setpointMode": "TemporaryOverride",
            "heatSetpointValue": temperature,
            "timeUntil": format_until(until),
        }),
    };
    Ok((path, body))
}

/// `PUT temperatureZone/{id}/heatSetpoint` cancelling any override.
pub fn cancel_zone_override(zone_id: &str) -> (String, Value) {
    let path = format!("temperatureZone/{zone_id}/heatSetpoint");
    let body = json!({"setpointMode": "FollowSchedule"});
    (path, body)
}

/// `PUT domesticHotWater/{id}/state`
pub fn set_dhw_state(
    dhw_id: &str,
    mode: &str,
    state: &str,
    until: Option<DateTime<Utc>>,
) -> (String, Value) {
    let path = format!("domesticHotWater/{dhw_id}/state");
    let mut body = json!({"mode": mode, "state": state});
    if let Some(until) = until {
        body["untilTime"] = Value::String(format_until(until));
    }
    (path, body)
}

/// `GET {type}/{id}/schedule`
pub fn get_schedule_path(entity_type: &str, entity_id: &str) -> String {
    format!("{entity_type}/{entity_id}/schedule")
}

/// `PUT {type}/{id}/schedule`
pub fn put_schedule_path(entity_type: &str, entity_id: &str) -> String {
    format!("{entity_type}/{entity_id}/schedule")
}

pub fn validated_system_mode(mode: &str, allowed: &[SystemMode]) -> Result<SystemMode> {
    let parsed: SystemMode = serde_json::from_value(Value::String(mode.to_string()))
        .map_err(|_| TccError::invalid_schema(format!("unrecognized system mode: {mode}")))?;
    if !allowed.is_empty() && !allowed.contains(&parsed) {
        return Err(TccError::invalid_schema(format!(
            "system mode {mode} is not in this control system's allowedSystemModes"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn permanent_mode_omits_time_until() {
        let (path, body) = set_system_mode("333", SystemMode::Away, None);
        assert_eq!(path, "temperatureControlSystem/333/mode");
        assert_eq!(body["permanent"], json!(true));
        assert!(body.get("timeUntil").is_none());
    }

    #[test]
    fn temporary_mode_formats_time_until() {
        let until = Utc.with_ymd_and_hms(2025, 7, 10, 13, 0, 0).unwrap();
        let (_, body) = set_system_mode("333", SystemMode::Custom, Some(until));
        assert_eq!(body["timeUntil"], json!("2025-07-10T13:00:00Z"));
        assert_eq!(body["permanent"], json!(false));
    }

    #[test]
    fn zone_setpoint_rejects_out_of_range_temperature() {
        assert!(set_zone_temperature("1", 50.0, None).is_err());
    }

    #[test]
    fn zone_setpoint_temporary_matches_documented_shape() {
        let until = Utc.with_ymd_and_hms(2025, 7, 10, 13, 0, 0).unwrap();
        let (path, body) = set_zone_temperature("1", 20.5, Some(until)).unwrap();
        assert_eq!(path, "temperatureZone/1/heatSetpoint");
        assert_eq!(body["setpointMode"], json!("TemporaryOverride"));
        assert_eq!(body["heatSetpointValue"], json!(20.5));
        assert_eq!(body["timeUntil"], json!("2025-07-10T13:00:00Z"));
    }

    #[test]
    fn system_mode_validation_rejects_modes_outside_allowed_list() {
        let allowed = vec![SystemMode::Auto, SystemMode::Away];
        assert!(validated_system_mode("Auto", &allowed).is_ok());
        assert!(validated_system_mode("Custom", &allowed).is_err());
    }
}
