//! The resource tree: `Location -> Gateway -> ControlSystem -> {Zone, HotWater}`.
//!
//! Per the redesign guidance this crate follows, entities do not hold
//! parent back-references (the source's `Zone.tcs.gateway.location.client`
//! chain): the [`Installation`] owns flat, id-keyed stores and every
//! parent struct holds only the ids of its children, in server order.
//! `Zone` and `HotWater` are a tagged [`Entity`] enum behind a shared
//! [`HeatingEntity`] trait rather than a `ZoneBase` superclass.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, TccError};
use crate::schema::validate::is_valid_id;
use crate::schema::{
    ActiveFault, DhwStateStatus, ScheduleCapabilities, SetpointCapabilities, SetpointStatus,
    SystemModeStatus, TcsModelType, TemperatureStatus, ZoneModelType, ZoneType,
};

pub type LocationId = String;
pub type GatewayId = String;
pub type SystemId = String;
pub type ZoneId = String;
pub type DhwId = String;

#[derive(Debug, Clone)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub gateways: Vec<GatewayId>,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    pub id: GatewayId,
    pub mac: String,
    pub systems: Vec<SystemId>,
}

#[derive(Debug, Clone)]
pub struct ControlSystem {
    pub id: SystemId,
    pub model_type: TcsModelType,
    pub allowed_system_modes: Vec<crate::schema::SystemMode>,
    pub system_mode: Option<SystemModeStatus>,
    pub active_faults: Vec<ActiveFault>,
    pub zones: Vec<ZoneId>,
    pub hotwater: Option<DhwId>,
}

#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub model_type: ZoneModelType,
    pub zone_type: ZoneType,
    pub setpoint_capabilities: SetpointCapabilities,
    pub schedule_capabilities: ScheduleCapabilities,
    pub temperature: Option<TemperatureStatus>,
    pub setpoint: Option<SetpointStatus>,
    pub active_faults: Vec<ActiveFault>,
}

#[derive(Debug, Clone)]
pub struct HotWater {
    pub id: DhwId,
    pub temperature: Option<TemperatureStatus>,
    pub state: Option<DhwStateStatus>,
    pub active_faults: Vec<ActiveFault>,
}

/// A heating-capable entity: either an individually controlled `Zone` or
/// the installation's single `HotWater` channel.
#[derive(Debug, Clone)]
pub enum Entity {
    Zone(Zone),
    HotWater(HotWater),
}

/// Shared surface between zones and DHW, replacing the source's
/// `ZoneBase` inheritance chain.
pub trait HeatingEntity {
    fn id(&self) -> &str;
    fn active_faults(&self) -> &[ActiveFault];
    fn type_tag(&self) -> &'static str;
}

impl HeatingEntity for Entity {
    fn id(&self) -> &str {
        match self {
            Entity::Zone(z) => &z.id,
            Entity::HotWater(d) => &d.id,
        }
    }

    fn active_faults(&self) -> &[ActiveFault] {
        match self {
            Entity::Zone(z) => &z.active_faults,
            Entity::HotWater(d) => &d.active_faults,
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            Entity::Zone(_) => "temperatureZone",
            Entity::HotWater(_) => "domesticHotWater",
        }
    }
}

/// The full installation tree for one account, owned as a flat arena.
#[derive(Debug, Clone, Default)]
pub struct Installation {
    pub locations: HashMap<LocationId, Location>,
    pub location_order: Vec<LocationId>,
    pub gateways: HashMap<GatewayId, Gateway>,
    pub systems: HashMap<SystemId, ControlSystem>,
    pub entities: HashMap<String, Entity>,
    /// First-registered zone wins on a name collision, mirroring
    /// `src/evohomeasync/base.py`'s `named_devices` dict population order.
    pub zone_by_name: HashMap<String, ZoneId>,
}

impl Installation {
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        match self.entities.get(id) {
            Some(Entity::Zone(z)) => Some(z),
            _ => None,
        }
    }

    pub fn zone_mut(&mut self, id: &str) -> Option<&mut Zone> {
        match self.entities.get_mut(id) {
            Some(Entity::Zone(z)) => Some(z),
            _ => None,
        }
    }

    pub fn zone_by_id(&self, id: &str) -> Option<&Zone> {
        self.zone(id)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<&Zone> {
        self.zone_by_name.get(name).and_then(|id| self.zone(id))
    }

    pub fn hotwater(&self, id: &str) -> Option<&HotWater> {
        match self.entities.get(id) {
            Some(Entity::HotWater(d)) => Some(d),
            _ => None,
        }
    }

    pub fn hotwater_mut(&mut self, id: &str) -> Option<&mut HotWater> {
        match self.entities.get_mut(id) {
            Some(Entity::HotWater(d)) => Some(d),
            _ => None,
        }
    }

    pub fn control_system(&self, id: &str) -> Option<&ControlSystem> {
        self.systems.get(id)
    }

    pub fn control_system_mut(&mut self, id: &str) -> Option<&mut ControlSystem> {
        self.systems.get_mut(id)
    }

    /// Returns the sole control system in the installation, or
    /// [`TccError::NoSingleTcs`] if there are zero or more than one.
    pub fn single_tcs(&self) -> Result<&ControlSystem> {
        let mut iter = self.systems.values();
        let first = iter.next().ok_or(TccError::NoSingleTcs)?;
        if iter.next().is_some() {
            return Err(TccError::NoSingleTcs);
        }
        Ok(first)
    }

    pub fn all_zone_ids(&self) -> impl Iterator<Item = &ZoneId> {
        self.entities.iter().filter_map(|(id, entity)| match entity {
            Entity::Zone(_) => Some(id),
            Entity::HotWater(_) => None,
        })
    }
}

/// Build an [`Installation`] from the v2 `installationInfo` response.
pub fn build_installation(payload: &Value) -> Result<Installation> {
    let mut installation = Installation::default();

    let locations = payload
        .as_array()
        .ok_or_else(|| TccError::invalid_schema("installationInfo: expected a top-level array"))?;

    for location_json in locations {
        let location_info = require(location_json, "locationInfo")?;
        let location_id = require_id(location_info, "locationId")?.to_string();
        let name = require_str(location_info, "name")?.to_string();

        let gateways_json = require_array(location_json, "gateways")?;
        let mut gateway_ids = Vec::with_capacity(gateways_json.len());

        for gateway_json in gateways_json {
            let gateway_info = require(gateway_json, "gatewayInfo")?;
            let gateway_id = require_id(gateway_info, "gatewayId")?.to_string();
            let mac = gateway_info
                .get("mac")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let systems_json = require_array(gateway_json, "temperatureControlSystems")?;
            let mut system_ids = Vec::with_capacity(systems_json.len());

            for system_json in systems_json {
                let system_id = require_id(system_json, "systemId")?.to_string();
                let model_type = parse_enum(system_json, "modelType")?;
                let allowed_system_modes = system_json
                    .get("allowedSystemModes")
                    .and_then(Value::as_array)
                    .map(|modes| {
                        modes
                            .iter()
                            .filter_map(|m| m.get("systemMode").and_then(Value::as_str))
                            .filter_map(|m| serde_json::from_value(Value::String(m.to_string())).ok())
                            .collect()
                    })
                    .unwrap_or_default();

                let zones_json = require_array(system_json, "zones")?;
                let mut zone_ids = Vec::with_capacity(zones_json.len());
                for zone_json in zones_json {
                    let zone = parse_zone_config(zone_json)?;
                    let zone_id = zone.id.clone();
                    let zone_name = zone.name.clone();
                    zone_ids.push(zone_id.clone());
                    installation
                        .zone_by_name
                        .entry(zone_name)
                        .or_insert_with(|| zone_id.clone());
                    installation.entities.insert(zone_id, Entity::Zone(zone));
                }

                let hotwater_id = if let Some(dhw_json) = system_json.get("dhw") {
                    let dhw = parse_hotwater_config(dhw_json)?;
                    let dhw_id = dhw.id.clone();
                    installation
                        .entities
                        .insert(dhw_id.clone(), Entity::HotWater(dhw));
                    Some(dhw_id)
                } else {
                    None
                };

                installation.systems.insert(
                    system_id.clone(),
                    ControlSystem {
                        id: system_id.clone(),
                        model_type,
                        allowed_system_modes,
                        system_mode: None,
                        active_faults: Vec::new(),
                        zones: zone_ids,
                        hotwater: hotwater_id,
                    },
                );
                system_ids.push(system_id);
            }

            installation.gateways.insert(
                gateway_id.clone(),
                Gateway {
                    id: gateway_id.clone(),
                    mac,
                    systems: system_ids,
                },
            );
            gateway_ids.push(gateway_id);
        }

        installation.locations.insert(
            location_id.clone(),
            Location {
                id: location_id.clone(),
                name,
                gateways: gateway_ids,
            },
        );
        installation.location_order.push(location_id);
    }

    Ok(installation)
}

fn parse_zone_config(value: &Value) -> Result<Zone> {
    let id = require_id(value, "zoneId")?.to_string();
    let name = require_str(value, "name")?.to_string();
    let model_type = parse_enum(value, "modelType")?;
    let zone_type = parse_enum(value, "zoneType")?;
    let setpoint_capabilities = serde_json::from_value(require(value, "setpointCapabilities")?.clone())
        .map_err(|err| TccError::invalid_schema(format!("setpointCapabilities: {err}")))?;
    let schedule_capabilities = serde_json::from_value(require(value, "scheduleCapabilities")?.clone())
        .map_err(|err| TccError::invalid_schema(format!("scheduleCapabilities: {err}")))?;
    Ok(Zone {
        id,
        name,
        model_type,
        zone_type,
        setpoint_capabilities,
        schedule_capabilities,
        temperature: None,
        setpoint: None,
        active_faults: Vec::new(),
    })
}

fn parse_hotwater_config(value: &Value) -> Result<HotWater> {
    let id = require_id(value, "dhwId")?.to_string();
    Ok(HotWater {
        id,
        temperature: None,
        state: None,
        active_faults: Vec::new(),
    })
}

fn require<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value
        .get(key)
        .ok_or_else(|| TccError::invalid_schema(format!("missing field: {key}")))
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

/// Like [`require_str`], but additionally checks the value against the
/// digit-id format every opaque id uses on the wire.
fn require_id<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    let id = require_str(value, key)?;
    if !is_valid_id(id) {
        return Err(TccError::invalid_schema(format!("{key}: not a valid id: {id:?}")));
    }
    Ok(id)
}

fn parse_enum<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Result<T> {
    let raw = require(value, key)?;
    serde_json::from_value(raw.clone())
        .map_err(|err| TccError::invalid_schema(format!("{key}: {err}")))
}
