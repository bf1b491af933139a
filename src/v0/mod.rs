//! The legacy, session-id-based client. Smaller surface than [`crate::v2`]
//! but the same request pipeline underneath. Grounded in
//! `src/evohomeasync/base.py::EvohomeClient`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::v0::SessionManager;
use crate::cache::CredentialStore;
use crate::config::ClientConfig;
use crate::error::{Result, TccError};
use crate::requester::Requester;

const BASE_PATH_SUFFIX: &str = "WebAPI/api";
const API_STRFTIME: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    pub name: String,
    #[serde(rename = "thermostat")]
    pub thermostat: Value,
}

pub struct Client {
    requester: Requester,
    user_id: Option<String>,
    devices_by_id: HashMap<String, Device>,
    /// First-registered device wins on a name collision, matching
    /// `EvohomeClient.named_devices`.
    devices_by_name: HashMap<String, String>,
}

impl Client {
    pub fn new(client_id: impl Into<String>, password: impl Into<String>, config: ClientConfig) -> Self {
        let store = Arc::new(CredentialStore::new(config.cache_file.clone()));
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        let manager = Arc::new(SessionManager::new(
            client_id,
            password,
            config.base_url(),
            http,
            store,
        ));
        let base_url = format!("{}/{BASE_PATH_SUFFIX}", config.base_url());
        let requester = Requester::new(base_url, config.request_timeout, manager);
        Client {
            requester,
            user_id: None,
            devices_by_id: HashMap::new(),
            devices_by_name: HashMap::new(),
        }
    }

    pub async fn update(&mut self) -> Result<()> {
        let account: Value = self.requester.get("accountInfo").await?.into_json()?;
        let user_id = account
            .get("userID")
            .and_then(Value::as_str)
            .ok_or_else(|| TccError::invalid_schema("accountInfo: missing userID"))?
            .to_string();

        let path = format!("locations?userId={user_id}&allData=True");
        let locations: Value = self.requester.get(&path).await?.into_json()?;
        self.populate_devices(&locations)?;
        self.user_id = Some(user_id);
        Ok(())
    }

    fn populate_devices(&mut self, locations: &Value) -> Result<()> {
        let locations = locations
            .as_array()
            .ok_or_else(|| TccError::invalid_schema("locations: expected an array"))?;

        for location in locations {
            let devices = location
                .get("devices")
                .and_then(Value::as_array)
                .ok_or_else(|| TccError::invalid_schema("location: missing devices"))?;
            for device_json in devices {
                let device: Device = serde_json::from_value(device_json.clone())
                    .map_err(|err| TccError::invalid_schema(format!("device: {err}")))?;
                self.devices_by_name
                    .entry(device.name.clone())
                    .or_insert_with(|| device.device_id.clone());
                self.devices_by_id.insert(device.device_id.clone(), device);
            }
        }
        Ok(())
    }

    pub fn device_by_id(&self, id: &str) -> Option<&Device> {
        self.devices_by_id.get(id)
    }

    pub fn device_by_name(&self, name: &str) -> Option<&Device> {
        self.devices_by_name.get(name).and_then(|id| self.devices_by_id.get(id))
    }

    pub fn temperatures(&self) -> Vec<(String, Option<f64>, Option<f64>)> {
        self.devices_by_id
            .values()
            .map(|device| {
                let temp = device
                    .thermostat
                    .get("indoorTemperature")
                    .and_then(Value::as_f64);
                let setpoint = device
                    .thermostat
                    .get("changeableValues")
                    .and_then(|cv| cv.get("heatSetpoint"))
                    .and_then(|hs| hs.get("value"))
                    .and_then(Value::as_f64);
                (device.name.clone(), temp, setpoint)
            })
            .collect()
    }

    /// `PUT evoTouchSystems?locationId={id}`
    pub async fn set_system_mode(
        &self,
        location_id: &str,
        quick_action: &str,
        until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = format!("evoTouchSystems?locationId={location_id}");
        let mut body = json!({"QuickAction": quick_action});
        if let Some(until) = until {
            body["QuickActionNextTime"] = Value::String(until.format(API_STRFTIME).to_string());
        }
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    /// `PUT devices/{id}/thermostat/changeableValues/heatSetpoint`
    pub async fn set_heat_setpoint(
        &self,
        device_id: &str,
        value: f64,
        next_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        crate::schema::validate::validate_heat_setpoint(value)?;
        let path = format!("devices/{device_id}/thermostat/changeableValues/heatSetpoint");
        let body = match next_time {
            None => json!({"Value": value, "Status": "Hold"}),
            Some(next_time) => json!({
                "Value": value,
                "Status": "Temporary",
                "NextTime": next_time.format(API_STRFTIME).to_string(),
            }),
        };
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    /// `PUT devices/{id}/thermostat/changeableValues`
    pub async fn set_dhw(
        &self,
        device_id: &str,
        status: &str,
        mode: Option<&str>,
        next_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let path = format!("devices/{device_id}/thermostat/changeableValues");
        let mut body = json!({"Status": status});
        if let Some(mode) = mode {
            body["Mode"] = Value::String(mode.to_string());
        }
        if let Some(next_time) = next_time {
            body["NextTime"] = Value::String(next_time.format(API_STRFTIME).to_string());
        }
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    /// Poll a v0 comm task until it reaches a terminal state.
    /// `GET commTasks?commTaskId={id}`
    pub async fn comm_task_state(&self, comm_task_id: &str) -> Result<String> {
        let path = format!("commTasks?commTaskId={comm_task_id}");
        let body = self.requester.get(&path).await?.into_json()?;
        body.get("state")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TccError::invalid_schema("commTasks: missing state"))
    }
}
