//! Schedule model and the GET-form <-> PUT-form conversion.
//!
//! The server's GET and PUT schedule shapes differ in key case (camelCase
//! vs PascalCase, except `heatSetpoint` which stays camelCase on PUT) and
//! in how the day of week is encoded (name string vs 0..6 integer, Monday
//! first). Grounded in `evohomeasync2/schema/schedule.py` (the GET/PUT
//! voluptuous schema pairs) and `evohomeasync2/zone.py`'s `MAPPING`
//! string-replace, reimplemented here as a typed, total conversion instead
//! of a text-level substitution.

use crate::error::{Result, TccError};
use serde_json::{Map, Value};
use serde_repr::{Deserialize_repr, Serialize_repr};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// The PUT-form day encoding (`DayOfWeek`: `0..6`, Monday first). Kept as
/// a typed `repr(u8)` enum rather than a raw integer so a malformed PUT
/// document fails to deserialize instead of silently storing an
/// out-of-range day index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum DayOfWeek {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

impl DayOfWeek {
    fn from_name(name: &str) -> Option<Self> {
        DAY_NAMES.iter().position(|n| *n == name).map(Self::from_index)
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => DayOfWeek::Monday,
            1 => DayOfWeek::Tuesday,
            2 => DayOfWeek::Wednesday,
            3 => DayOfWeek::Thursday,
            4 => DayOfWeek::Friday,
            5 => DayOfWeek::Saturday,
            _ => DayOfWeek::Sunday,
        }
    }

    fn name(self) -> &'static str {
        DAY_NAMES[self as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub days: Vec<DaySchedule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub day_of_week: DayOfWeek,
    pub switchpoints: Vec<Switchpoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Switchpoint {
    Zone { heat_setpoint: f64, time_of_day: String },
    Dhw { dhw_state: String, time_of_day: String },
}

/// Parse a schedule from the server's GET-form JSON
/// (`{"dailySchedules": [{"dayOfWeek": "Monday", "switchpoints": [...] }]}`).
pub fn from_get_json(value: &Value) -> Result<Schedule> {
    let daily = require_array(value, "dailySchedules")?;
    let mut days = Vec::with_capacity(daily.len());
    for day in daily {
        let day_name = require_str(day, "dayOfWeek")?;
        let day_of_week = DayOfWeek::from_name(day_name)
            .ok_or_else(|| TccError::invalid_schema(format!("unknown dayOfWeek: {day_name}")))?;
        let switchpoints = require_array(day, "switchpoints")?
            .iter()
            .map(parse_get_switchpoint)
            .collect::<Result<Vec<_>>>()?;
        days.push(DaySchedule {
            day_of_week,
            switchpoints,
        });
    }
    Ok(Schedule { days })
}

fn parse_get_switchpoint(value: &Value) -> Result<Switchpoint> {
    let time_of_day = require_str(value, "timeOfDay")?.to_string();
    if let Some(dhw_state) = value.get("dhwState").and_then(Value::as_str) {
        Ok(Switchpoint::Dhw {
            dhw_state: dhw_state.to_string(),
            time_of_day,
        })
    } else if let Some(heat_setpoint) = value.get("heatSetpoint").and_then(Value::as_f64) {
        Ok(Switchpoint::Zone {
            heat_setpoint,
            time_of_day,
        })
    } else {
        Err(TccError::invalid_schema(
            "switchpoint has neither dhwState nor heatSetpoint",
        ))
    }
}

/// Parse a schedule from the server's PUT-form JSON
/// (`{"DailySchedules": [{"DayOfWeek": 0, "Switchpoints": [...] }]}`).
pub fn from_put_json(value: &Value) -> Result<Schedule> {
    let daily = require_array(value, "DailySchedules")?;
    let mut days = Vec::with_capacity(daily.len());
    for day in daily {
        let day_json = require(day, "DayOfWeek")?;
        let day_of_week: DayOfWeek = serde_json::from_value(day_json.clone())
            .map_err(|_| TccError::invalid_schema(format!("DayOfWeek out of range: {day_json}")))?;
        let switchpoints = require_array(day, "Switchpoints")?
            .iter()
            .map(parse_put_switchpoint)
            .collect::<Result<Vec<_>>>()?;
        days.push(DaySchedule {
            day_of_week,
            switchpoints,
        });
    }
    Ok(Schedule { days })
}

fn parse_put_switchpoint(value: &Value) -> Result<Switchpoint> {
    let time_of_day = require_str(value, "TimeOfDay")?.to_string();
    if let Some(dhw_state) = value.get("DhwState").and_then(Value::as_str) {
        Ok(Switchpoint::Dhw {
            dhw_state: dhw_state.to_string(),
            time_of_day,
        })
    } else if let Some(heat_setpoint) = value.get("heatSetpoint").and_then(Value::as_f64) {
        Ok(Switchpoint::Zone {
            heat_setpoint,
            time_of_day,
        })
    } else {
        Err(TccError::invalid_schema(
            "switchpoint has neither DhwState nor heatSetpoint",
        ))
    }
}

/// Render a schedule as the server's GET-form JSON.
pub fn to_get_json(schedule: &Schedule) -> Value {
    let daily = schedule
        .days
        .iter()
        .map(|day| {
            let switchpoints: Vec<Value> = day
                .switchpoints
                .iter()
                .map(|sp| {
                    let mut map = Map::new();
                    match sp {
                        Switchpoint::Zone {
                            heat_setpoint,
                            time_of_day,
                        } => {
                            map.insert("heatSetpoint".into(), Value::from(*heat_setpoint));
                            map.insert("timeOfDay".into(), Value::from(time_of_day.clone()));
                        }
                        Switchpoint::Dhw {
                            dhw_state,
                            time_of_day,
                        } => {
                            map.insert("dhwState".into(), Value::from(dhw_state.clone()));
                            map.insert("timeOfDay".into(), Value::from(time_of_day.clone()));
                        }
                    }
                    Value::Object(map)
                })
                .collect();
            let mut day_map = Map::new();
            day_map.insert("dayOfWeek".into(), Value::from(day.day_of_week.name()));
            day_map.insert("switchpoints".into(), Value::Array(switchpoints));
            Value::Object(day_map)
        })
        .collect();
    let mut root = Map::new();
    root.insert("dailySchedules".into(), Value::Array(daily));
    Value::Object(root)
}

/// Render a schedule as the server's PUT-form JSON.
pub fn to_put_json(schedule: &Schedule) -> Value {
    let daily = schedule
        .days
        .iter()
        .map(|day| {
            let switchpoints: Vec<Value> = day
                .switchpoints
                .iter()
                .map(|sp| {
                    let mut map = Map::new();
                    match sp {
                        Switchpoint::Zone {
                            heat_setpoint,
                            time_of_day,
                        } => {
                            // NOTE: heatSetpoint stays camelCase on PUT, unlike every
                            // other key - this is load-bearing on the real API.
                            map.insert("heatSetpoint".into(), Value::from(*heat_setpoint));
                            map.insert("TimeOfDay".into(), Value::from(time_of_day.clone()));
                        }
                        Switchpoint::Dhw {
                            dhw_state,
                            time_of_day,
                        } => {
                            map.insert("DhwState".into(), Value::from(dhw_state.clone()));
                            map.insert("TimeOfDay".into(), Value::from(time_of_day.clone()));
                        }
                    }
                    Value::Object(map)
                })
                .collect();
            let mut day_map = Map::new();
            day_map.insert(
                "DayOfWeek".into(),
                serde_json::to_value(day.day_of_week).expect("DayOfWeek serializes to an integer"),
            );
            day_map.insert("Switchpoints".into(), Value::Array(switchpoints));
            Value::Object(day_map)
        })
        .collect();
    let mut root = Map::new();
    root.insert("DailySchedules".into(), Value::Array(daily));
    Value::Object(root)
}

/// Convert a GET-form document directly to its PUT-form equivalent.
pub fn get_to_put(get_doc: &Value) -> Result<Value> {
    Ok(to_put_json(&from_get_json(get_doc)?))
}

/// Convert a PUT-form document directly to its GET-form equivalent.
pub fn put_to_get(put_doc: &Value) -> Result<Value> {
    Ok(to_get_json(&from_put_json(put_doc)?))
}

fn require_array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| TccError::invalid_schema(format!("missing or non-array field: {key}")))
}

fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TccError::invalid_schema(format!("missing or non-string field: {key}")))
}

fn require<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| TccError::invalid_schema(format!("missing field: {key}")))
}
