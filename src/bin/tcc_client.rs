//! Smoke-test harness over the library surface: logs in with the v2
//! client, refreshes status, and prints each zone's temperature.
//!
//! This is not a feature-complete CLI (no argument parsing, no keyring)
//! - it exists to give the crate something runnable, driven by
//! environment variables and plain-text logging.

use std::env;

use tcc_client::ClientConfig;
use tcc_client::v2::Client;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let username = env::var("TCC_USERNAME")?;
    let password = env::var("TCC_PASSWORD")?;

    let config = ClientConfig::default();
    let mut client = Client::new(username, password, config);

    client.update(false).await?;

    let account = client.user_account()?;
    log::info!("logged in as {} ({})", account.firstname, account.user_id);

    for zone_id in client.installation().all_zone_ids().cloned().collect::<Vec<_>>() {
        if let Some(zone) = client.zone_by_id(&zone_id) {
            let temp = zone
                .temperature
                .as_ref()
                .and_then(|t| t.temperature)
                .map(|t| t.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            log::info!("zone {} ({}): {temp}°C", zone.name, zone.id);
        }
    }

    Ok(())
}
