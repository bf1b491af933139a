//! Wire schema: typed enums/structs for the TCC JSON API, plus the
//! validation, obfuscation and schedule-conversion helpers that sit around
//! them.

pub mod obfuscate;
pub mod schedule;
pub mod validate;

use serde::{Deserialize, Serialize};

/// Wire string constants shared by more than one module, kept together so
/// they aren't redefined in each place that needs them.
pub mod wire {
    pub const DHW_ON: &str = "On";
    pub const DHW_OFF: &str = "Off";

    pub const REGEX_EMAIL: &str = r"^([a-zA-Z0-9_\-.]+)@([a-zA-Z0-9_\-.]+)\.([a-zA-Z]{2,5})$";
    pub const REGEX_NUMERIC_ID: &str = r"^[0-9]*$";
}

/// `SystemMode` (`evohomeasync2/schema/const.py::SystemMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMode {
    Auto,
    AutoWithEco,
    AutoWithReset,
    Away,
    Custom,
    DayOff,
    HeatingOff,
}

/// `SetpointMode` for zones and DHW (`ZoneMode` in the Python source, but
/// shared here since the two operate identically on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetpointMode {
    FollowSchedule,
    PermanentOverride,
    TemporaryOverride,
}

/// DHW on/off state. Fixed to the wire-accurate mapping: the Python source
/// this crate is modeled on defines `OFF = "On"` / `ON = "Off"`, which is a
/// bug — this implementation uses `On`/`Off` for their plain meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DhwState {
    On,
    Off,
}

impl DhwState {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            DhwState::On => wire::DHW_ON,
            DhwState::Off => wire::DHW_OFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultType {
    #[serde(rename = "TempZoneActuatorCommunicationLost")]
    ZoneActuatorCommunicationLost,
    #[serde(rename = "TempZoneActuatorLowBattery")]
    ZoneActuatorLowBattery,
    #[serde(rename = "TempZoneSensorCommunicationLost")]
    ZoneSensorCommunicationLost,
    #[serde(rename = "TempZoneSensorLowBattery")]
    ZoneSensorLowBattery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TcsModelType {
    EvoTouch,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneModelType {
    HeatingZone,
    RoundWireless,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneType {
    RadiatorZone,
    Thermostat,
    ZoneValves,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFault {
    #[serde(rename = "faultType")]
    pub fault_type: FaultType,
    pub since: chrono::NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureStatus {
    #[serde(rename = "isAvailable")]
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointStatus {
    #[serde(rename = "targetHeatTemperature")]
    pub target_heat_temperature: f64,
    #[serde(rename = "setpointMode")]
    pub setpoint_mode: SetpointMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhwStateStatus {
    pub state: DhwState,
    pub mode: SetpointMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemModeStatus {
    #[serde(rename = "systemMode")]
    pub system_mode: SystemMode,
    #[serde(rename = "isPermanent")]
    pub is_permanent: bool,
    #[serde(rename = "timeUntil", skip_serializing_if = "Option::is_none")]
    pub time_until: Option<chrono::DateTime<chrono::Utc>>,
}

/// `setpointCapabilities` from a zone's config record
/// (`evohomeasync2/schema/config.py::SCH_SETPOINT_CAPABILITIES`), carried
/// as-is on [`crate::tree::Zone`] so callers can validate a requested
/// setpoint before issuing a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointCapabilities {
    #[serde(rename = "maxHeatSetpoint")]
    pub max_heat_setpoint: f64,
    #[serde(rename = "minHeatSetpoint")]
    pub min_heat_setpoint: f64,
    #[serde(rename = "valueResolution")]
    pub value_resolution: f64,
    #[serde(rename = "allowedSetpointModes")]
    pub allowed_setpoint_modes: Vec<SetpointMode>,
    #[serde(rename = "maxDuration")]
    pub max_duration: String,
    #[serde(rename = "timingResolution")]
    pub timing_resolution: String,
}

/// `scheduleCapabilities` from a zone's config record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCapabilities {
    #[serde(rename = "maxSwitchpointsPerDay")]
    pub max_switchpoints_per_day: u32,
    #[serde(rename = "minSwitchpointsPerDay")]
    pub min_switchpoints_per_day: u32,
    #[serde(rename = "timingResolution")]
    pub timing_resolution: String,
    #[serde(rename = "setpointValueResolution")]
    pub setpoint_value_resolution: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dhw_state_wire_strings_are_not_swapped() {
        assert_eq!(DhwState::On.as_wire_str(), "On");
        assert_eq!(DhwState::Off.as_wire_str(), "Off");
    }

    #[test]
    fn system_mode_round_trips_through_json() {
        let mode = SystemMode::AutoWithEco;
        let json = serde_json::to_string(&mode).unwrap();
        assert_eq!(json, "\"AutoWithEco\"");
        let back: SystemMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mode);
    }

    #[test]
    fn unknown_zone_type_falls_back_to_unknown_variant() {
        let parsed: ZoneType = serde_json::from_str("\"SomethingNew\"").unwrap();
        assert_eq!(parsed, ZoneType::Unknown);
    }
}
