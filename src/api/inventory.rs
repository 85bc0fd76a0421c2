//! File-backed intercom API.
//!
//! Devices come from a JSON inventory (`{"devices": [...]}`); snapshots are
//! fetched over HTTP from each device's photo URL. Refreshing a property
//! re-reads the inventory so rotated URLs get picked up.

use super::{IntercomApi, IntercomDevice};
use crate::config::InventoryConfig;
use crate::error::IntercomApiError;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize)]
struct InventoryFile {
    devices: Vec<IntercomDevice>,
}

async fn read_inventory(path: &Path) -> Result<Vec<IntercomDevice>, IntercomApiError> {
    let content = tokio::fs::read_to_string(path).await?;
    let inventory: InventoryFile = serde_json::from_str(&content)?;
    Ok(inventory.devices)
}

pub struct InventoryApi {
    path: PathBuf,
    client: reqwest::Client,
    devices: RwLock<BTreeMap<u64, IntercomDevice>>,
}

impl InventoryApi {
    /// Load the inventory and build the HTTP client used for snapshots.
    pub async fn load(config: &InventoryConfig) -> Result<Self, IntercomApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        let devices = read_inventory(&config.path).await?;
        info!(
            "[Inventory] Loaded {} intercom device(s) from {}",
            devices.len(),
            config.path.display()
        );

        Ok(Self {
            path: config.path.clone(),
            client,
            devices: RwLock::new(devices.into_iter().map(|d| (d.id, d)).collect()),
        })
    }
}

#[async_trait]
impl IntercomApi for InventoryApi {
    fn devices(&self) -> Vec<IntercomDevice> {
        self.devices.read().values().cloned().collect()
    }

    fn device(&self, device_id: u64) -> Option<IntercomDevice> {
        self.devices.read().get(&device_id).cloned()
    }

    async fn fetch_snapshot(&self, device_id: u64) -> Result<Vec<u8>, IntercomApiError> {
        let photo_url = self
            .device(device_id)
            .ok_or(IntercomApiError::UnknownDevice(device_id))?
            .photo_url
            .ok_or(IntercomApiError::MissingPhotoUrl(device_id))?;

        debug!("[Inventory] Fetching snapshot for {} from {}", device_id, photo_url);

        let resp = self.client.get(&photo_url).send().await?;
        if !resp.status().is_success() {
            return Err(IntercomApiError::Status {
                status: resp.status().as_u16(),
                url: photo_url,
            });
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(IntercomApiError::EmptySnapshot(photo_url));
        }

        Ok(bytes.to_vec())
    }

    async fn update_property_intercoms(&self, property_id: u64) -> Result<(), IntercomApiError> {
        let fresh: Vec<IntercomDevice> = read_inventory(&self.path)
            .await?
            .into_iter()
            .filter(|d| d.property_id == property_id)
            .collect();

        let count = fresh.len();
        {
            let mut devices = self.devices.write();
            devices.retain(|_, d| d.property_id != property_id);
            devices.extend(fresh.into_iter().map(|d| (d.id, d)));
        }

        info!(
            "[Inventory] Refreshed property {}: {} intercom device(s)",
            property_id, count
        );
        Ok(())
    }
}
