//! The modern, OAuth-based client. Ties together the credential manager
//! (`crate::auth::v2`), the authenticated requester (`crate::requester`),
//! the resource tree (`crate::tree`) and the command surface
//! (`crate::command`) into the public client API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::v2::OAuthManager;
use crate::cache::CredentialStore;
use crate::command;
use crate::config::ClientConfig;
use crate::error::{Result, TccError};
use crate::refresh;
use crate::requester::Requester;
use crate::schema::obfuscate::{USER_ACCOUNT_PII_FIELDS, obfuscate_fields};
use crate::schema::validate::validate_user_account;
use crate::schema::{DhwState, SystemMode};
use crate::tree::{ControlSystem, HotWater, Installation, Zone, build_installation};

const BASE_PATH_SUFFIX: &str = "WebAPI/emea/api/v1";

/// `SCH_USER_ACCOUNT` (`evohomeasync2/schema/account.py`), minus the
/// fields the client never needs to act on.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    pub firstname: String,
    pub country: String,
    pub language: String,
}

pub struct Client {
    requester: Requester,
    config: ClientConfig,
    user_account: Option<UserAccount>,
    installation: Installation,
}

impl Client {
    pub fn new(client_id: impl Into<String>, password: impl Into<String>, config: ClientConfig) -> Self {
        let store = Arc::new(CredentialStore::new(config.cache_file.clone()));
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        let manager = Arc::new(OAuthManager::new(
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
            config,
            user_account: None,
            installation: Installation::default(),
        }
    }

    pub fn user_account(&self) -> Result<&UserAccount> {
        self.user_account
            .as_ref()
            .ok_or_else(|| TccError::invalid_config("call update() before reading user_account"))
    }

    pub fn installation(&self) -> &Installation {
        &self.installation
    }

    pub fn single_tcs(&self) -> Result<&ControlSystem> {
        self.installation.single_tcs()
    }

    pub fn zone_by_id(&self, id: &str) -> Option<&Zone> {
        self.installation.zone_by_id(id)
    }

    pub fn zone_by_name(&self, name: &str) -> Option<&Zone> {
        self.installation.zone_by_name(name)
    }

    pub fn hotwater(&self, id: &str) -> Option<&HotWater> {
        self.installation.hotwater(id)
    }

    /// Fetch the user account, installation config (if `reset_config` or
    /// not yet fetched) and the latest status for every location.
    pub async fn update(&mut self, reset_config: bool) -> Result<()> {
        let mut account_json = self.requester.get("userAccount").await?.into_json()?;
        if let Err(err) = validate_user_account(&account_json) {
            log::warn!("userAccount response failed validation: {err}");
        }
        if self.config.obfuscate_logs {
            let mut logged = account_json.clone();
            obfuscate_fields(&mut logged, USER_ACCOUNT_PII_FIELDS);
            log::debug!("userAccount = {logged}");
        }
        let account: UserAccount = serde_json::from_value(account_json.take())
            .map_err(|err| TccError::invalid_schema(format!("userAccount: {err}")))?;
        let user_id = account.user_id.clone();
        self.user_account = Some(account);

        if reset_config || self.installation.locations.is_empty() {
            let path = format!(
                "location/installationInfo?userId={user_id}&includeTemperatureControlSystems=True"
            );
            let config_json = self.requester.get(&path).await?.into_json()?;
            self.installation = build_installation(&config_json)?;
        }

        for location_id in self.installation.location_order.clone() {
            let path =
                format!("location/{location_id}/status?includeTemperatureControlSystems=True");
            let status_json = self.requester.get(&path).await?.into_json()?;
            refresh::apply_location_status(&mut self.installation, &status_json)?;
        }

        Ok(())
    }

    pub async fn set_system_mode(
        &self,
        system_id: &str,
        mode: SystemMode,
        until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if let Some(tcs) = self.installation.control_system(system_id) {
            if !tcs.allowed_system_modes.is_empty() && !tcs.allowed_system_modes.contains(&mode) {
                return Err(TccError::invalid_schema(format!(
                    "{mode:?} is not in this control system's allowedSystemModes"
                )));
            }
        }
        let (path, body) = command::set_system_mode(system_id, mode, until);
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    pub async fn set_zone_temperature(
        &self,
        zone_id: &str,
        temperature: f64,
        until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (path, body) = command::set_zone_temperature(zone_id, temperature, until)?;
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    pub async fn cancel_zone_override(&self, zone_id: &str) -> Result<()> {
        let (path, body) = command::cancel_zone_override(zone_id);
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    pub async fn set_dhw_state(
        &self,
        dhw_id: &str,
        mode: &str,
        state: DhwState,
        until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (path, body) = command::set_dhw_state(dhw_id, mode, state.as_wire_str(), until);
        self.requester.put(&path, &body).await?;
        Ok(())
    }

    /// Fetch and normalize a zone/DHW schedule into GET form.
    pub async fn get_schedule(&self, entity_type: &str, entity_id: &str) -> Result<Value> {
        let path = command::get_schedule_path(entity_type, entity_id);
        let body = self.requester.get(&path).await?.into_json()?;
        if let Err(err) = crate::schema::schedule::from_get_json(&body) {
            log::warn!("{entity_type}/{entity_id} schedule failed validation: {err}");
        }
        Ok(body)
    }

    /// Push a GET-form schedule document, converting it to the PUT shape
    /// the server expects.
    pub async fn set_schedule(&self, entity_type: &str, entity_id: &str, get_form: &Value) -> Result<()> {
        let put_form = crate::schema::schedule::get_to_put(get_form)?;
        let path = command::put_schedule_path(entity_type, entity_id);
        self.requester.put(&path, &put_form).await?;
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
