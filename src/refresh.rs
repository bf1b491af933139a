//! Applies a location-status payload onto an existing [`Installation`],
//! updating status slots in place without touching entity identity.
//! Grounded in `evohomeasync2/schema/status.py`'s status-payload schema
//! chain (`SCH_LOCATION_STATUS` down to `SCH_ZONE`/`SCH_DHW`).

use serde_json::Value;

use crate::error::{Result, TccError};
use crate::schema::validate::is_valid_id;
use crate::schema::{ActiveFault, DhwStateStatus, SetpointStatus, SystemModeStatus, TemperatureStatus};
use crate::tree::Installation;

/// Apply one location's status document. Zones/DHW named in the payload
/// get their status replaced; entities absent from the payload keep
/// whatever status they already had.
pub fn apply_location_status(installation: &mut Installation, status: &Value) -> Result<()> {
    let gateways = status
        .get("gateways")
        .and_then(Value::as_array)
        .ok_or_else(|| TccError::invalid_schema("location status: missing gateways"))?;

    for gateway in gateways {
        let systems = gateway
            .get("temperatureControlSystems")
            .and_then(Value::as_array)
            .ok_or_else(|| TccError::invalid_schema("location status: missing temperatureControlSystems"))?;

        for system in systems {
            let system_id = system
                .get("systemId")
                .and_then(Value::as_str)
                .ok_or_else(|| TccError::invalid_schema("tcs status: missing systemId"))?;
            if !is_valid_id(system_id) {
                return Err(TccError::invalid_schema(format!("tcs status: not a valid systemId: {system_id:?}")));
            }

            let Some(tcs) = installation.control_system_mut(system_id) else {
                log::warn!("status payload names unknown control system {system_id}, ignoring");
                continue;
            };

            if let Some(mode_json) = system.get("systemModeStatus") {
                match parse_system_mode_status(mode_json) {
                    Ok(parsed) => tcs.system_mode = Some(parsed),
                    Err(err) => log::warn!("tcs {system_id} systemModeStatus: {err}, keeping prior value"),
                }
            }
            if let Ok(faults) = parse_active_faults(system.get("activeFaults"))
                .inspect_err(|err| log::warn!("tcs {system_id} activeFaults: {err}, keeping prior value"))
            {
                tcs.active_faults = faults;
            }

            if let Some(zones) = system.get("zones").and_then(Value::as_array) {
                for zone_json in zones {
                    apply_zone_status(installation, zone_json);
                }
            }

            if let Some(dhw_json) = system.get("dhw") {
                apply_dhw_status(installation, dhw_json);
            }
        }
    }

    Ok(())
}

/// Per-entity status application never aborts the rest of the refresh: a
/// malformed `temperatureStatus`/`setpointStatus`/etc. is logged as a
/// warning and the entity simply keeps whatever status it already had -
/// the server is known to occasionally ship undocumented or malformed
/// sub-objects for one zone without that affecting any other.
fn apply_zone_status(installation: &mut Installation, zone_json: &Value) {
    let Some(zone_id) = zone_json.get("zoneId").and_then(Value::as_str) else {
        log::warn!("zone status entry missing zoneId, ignoring");
        return;
    };
    if !is_valid_id(zone_id) {
        log::warn!("zone status entry has malformed zoneId {zone_id:?}, ignoring");
        return;
    }

    let Some(zone) = installation.zone_mut(zone_id) else {
        log::warn!("status payload names unknown zone {zone_id}, ignoring");
        return;
    };

    if let Some(temp_json) = zone_json.get("temperatureStatus") {
        match parse_temperature_status(temp_json) {
            Ok(status) => zone.temperature = Some(status),
            Err(err) => log::warn!("zone {zone_id} temperatureStatus: {err}, keeping prior value"),
        }
    }
    if let Some(setpoint_json) = zone_json.get("setpointStatus") {
        match parse_setpoint_status(setpoint_json) {
            Ok(status) => zone.setpoint = Some(status),
            Err(err) => log::warn!("zone {zone_id} setpointStatus: {err}, keeping prior value"),
        }
    }
    match parse_active_faults(zone_json.get("activeFaults")) {
        Ok(faults) => zone.active_faults = faults,
        Err(err) => log::warn!("zone {zone_id} activeFaults: {err}, keeping prior value"),
    }
}

fn apply_dhw_status(installation: &mut Installation, dhw_json: &Value) {
    let Some(dhw_id) = dhw_json.get("dhwId").and_then(Value::as_str) else {
        log::warn!("dhw status entry missing dhwId, ignoring");
        return;
    };
    if !is_valid_id(dhw_id) {
        log::warn!("dhw status entry has malformed dhwId {dhw_id:?}, ignoring");
        return;
    }

    let Some(dhw) = installation.hotwater_mut(dhw_id) else {
        log::warn!("status payload names unknown dhw {dhw_id}, ignoring");
        return;
    };

    if let Some(temp_json) = dhw_json.get("temperatureStatus") {
        match parse_temperature_status(temp_json) {
            Ok(status) => dhw.temperature = Some(status),
            Err(err) => log::warn!("dhw {dhw_id} temperatureStatus: {err}, keeping prior value"),
        }
    }
    if let Some(state_json) = dhw_json.get("stateStatus") {
        match parse_dhw_state_status(state_json) {
            Ok(status) => dhw.state = Some(status),
            Err(err) => log::warn!("dhw {dhw_id} stateStatus: {err}, keeping prior value"),
        }
    }
    match parse_active_faults(dhw_json.get("activeFaults")) {
        Ok(faults) => dhw.active_faults = faults,
        Err(err) => log::warn!("dhw {dhw_id} activeFaults: {err}, keeping prior value"),
    }
}

fn parse_temperature_status(value: &Value) -> Result<TemperatureStatus> {
    serde_json::from_value(value.clone())
        .map_err(|err| TccError::invalid_schema(format!("temperatureStatus: {err}")))
}

fn parse_setpoint_status(value: &Value) -> Result<SetpointStatus> {
    serde_json::from_value(value.clone())
        .map_err(|err| TccError::invalid_schema(format!("setpointStatus: {err}")))
}

fn parse_dhw_state_status(value: &Value) -> Result<DhwStateStatus> {
    serde_json::from_value(value.clone())
        .map_err(|err| TccError::invalid_schema(format!("stateStatus: {err}")))
}

fn parse_system_mode_status(value: &Value) -> Result<SystemModeStatus> {
    serde_json::from_value(value.clone())
        .map_err(|err| TccError::invalid_schema(format!("systemModeStatus: {err}")))
}

fn parse_active_faults(value: Option<&Value>) -> Result<Vec<ActiveFault>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|f| {
                serde_json::from_value(f.clone())
                    .map_err(|err| TccError::invalid_schema(format!("activeFaults: {err}")))
            })
            .collect(),
        Some(_) => Err(TccError::invalid_schema("activeFaults: expected an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::build_installation;
    use serde_json::json;

    fn installation() -> Installation {
        let capabilities = json!({
            "setpointCapabilities": {
                "maxHeatSetpoint": 35.0,
                "minHeatSetpoint": 5.0,
                "valueResolution": 0.5,
                "allowedSetpointModes": ["PermanentOverride", "FollowSchedule", "TemporaryOverride"],
                "maxDuration": "1.00:00:00",
                "timingResolution": "00:10:00",
            },
            "scheduleCapabilities": {
                "maxSwitchpointsPerDay": 6,
                "minSwitchpointsPerDay": 1,
                "timingResolution": "00:10:00",
                "setpointValueResolution": 0.5,
            },
        });
        let mut zone = json!({"zoneId": "444", "name": "Lounge", "modelType": "RoundWireless", "zoneType": "RadiatorZone"});
        for (key, val) in capabilities.as_object().unwrap() {
            zone[key] = val.clone();
        }
        build_installation(&json!([{
            "locationInfo": {"locationId": "111", "name": "Home"},
            "gateways": [{
                "gatewayInfo": {"gatewayId": "222", "mac": "00:00:00:00:00:00"},
                "temperatureControlSystems": [{
                    "systemId": "333",
                    "modelType": "EvoTouch",
                    "allowedSystemModes": [],
                    "zones": [zone],
                    "dhw": {"dhwId": "555"}
                }]
            }]
        }]))
        .unwrap()
    }

    #[test]
    fn status_updates_zone_and_preserves_identity() {
        let mut installation = installation();
        let status = json!({
            "locationId": "111",
            "gateways": [{
                "gatewayId": "222",
                "temperatureControlSystems": [{
                    "systemId": "333",
                    "systemModeStatus": {"systemMode": "Auto", "isPermanent": true},
                    "zones": [{
                        "zoneId": "444",
                        "temperatureStatus": {"isAvailable": true, "temperature": 19.5},
                        "setpointStatus": {"targetHeatTemperature": 21.0, "setpointMode": "FollowSchedule"}
                    }]
                }]
            }]
        });
        apply_location_status(&mut installation, &status).unwrap();
        let zone = installation.zone("444").unwrap();
        assert_eq!(zone.temperature.as_ref().unwrap().temperature, Some(19.5));
        assert_eq!(zone.setpoint.as_ref().unwrap().target_heat_temperature, 21.0);
    }

    #[test]
    fn malformed_zone_id_in_status_is_ignored_not_fatal() {
        let mut installation = installation();
        let status = json!({
            "locationId": "111",
            "gateways": [{
                "gatewayId": "222",
                "temperatureControlSystems": [{
                    "systemId": "333",
                    "zones": [{"zoneId": "not-numeric", "temperatureStatus": {"isAvailable": false}}]
                }]
            }]
        });
        assert!(apply_location_status(&mut installation, &status).is_ok());
    }

    #[test]
    fn malformed_system_id_in_status_is_rejected() {
        let mut installation = installation();
        let status = json!({
            "locationId": "111",
            "gateways": [{
                "gatewayId": "222",
                "temperatureControlSystems": [{"systemId": "not-numeric", "zones": []}]
            }]
        });
        assert!(apply_location_status(&mut installation, &status).is_err());
    }

    #[test]
    fn unknown_zone_in_status_is_ignored_not_fatal() {
        let mut installation = installation();
        let status = json!({
            "locationId": "111",
            "gateways": [{
                "gatewayId": "222",
                "temperatureControlSystems": [{
                    "systemId": "333",
                    "zones": [{"zoneId": "999", "temperatureStatus": {"isAvailable": false}}]
                }]
            }]
        });
        assert!(apply_location_status(&mut installation, &status).is_ok());
    }

    #[test]
    fn missing_zone_in_status_retains_prior_value() {
        let mut installation = installation();
        installation.zone_mut("444").unwrap().temperature = Some(TemperatureStatus {
            is_available: true,
            temperature: Some(17.0),
        });

        let status = json!({
            "locationId": "111",
            "gateways": [{"gatewayId": "222", "temperatureControlSystems": [{"systemId": "333", "zones": []}]}]
        });
        apply_location_status(&mut installation, &status).unwrap();
        assert_eq!(
            installation.zone("444").unwrap().temperature.as_ref().unwrap().temperature,
            Some(17.0)
        );
    }

    #[test]
    fn malformed_zone_status_is_downgraded_to_a_warning_not_aborted() {
        let mut installation = installation();
        installation.zone_mut("444").unwrap().temperature = Some(TemperatureStatus {
            is_available: true,
            temperature: Some(17.0),
        });

        // setpointStatus is missing its required targetHeatTemperature; the
        // rest of the refresh (in particular temperatureStatus) must still
        // apply instead of the whole call failing.
        let status = json!({
            "locationId": "111",
            "gateways": [{
                "gatewayId": "222",
                "temperatureControlSystems": [{
                    "systemId": "333",
                    "zones": [{
                        "zoneId": "444",
                        "temperatureStatus": {"isAvailable": true, "temperature": 20.0},
                        "setpointStatus": {"setpointMode": "FollowSchedule"}
                    }]
                }]
            }]
        });
        apply_location_status(&mut installation, &status).unwrap();
        let zone = installation.zone("444").unwrap();
        assert_eq!(zone.temperature.as_ref().unwrap().temperature, Some(20.0));
        assert!(zone.setpoint.is_none());
    }
}
