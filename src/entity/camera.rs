//! Camera entity for Pik intercoms.
//!
//! Stills come from the vendor photo endpoint when the device has one, and
//! from a single frame of the RTSP stream otherwise. Photo failures are
//! counted; once the retrieval error threshold is reached the property's
//! devices are refreshed so stale URLs get replaced.

use super::{
    CameraImage, DOMAIN, DeviceInfo, DeviceMetadata, SUPPORT_STREAM, flatten_stream_urls,
};
use crate::api::{IntercomApi, IntercomDevice};
use crate::config::ConfigEntry;
use crate::error::{BridgeError, Result};
use crate::media::FrameGrabber;
use async_trait::async_trait;
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Treats empty URLs the same as missing ones.
fn non_empty(url: Option<&str>) -> Option<&str> {
    url.filter(|u| !u.is_empty())
}

/// Register one camera entity per camera-capable device of the API object.
pub fn setup_cameras(
    entry: &ConfigEntry,
    api: Arc<dyn IntercomApi>,
    frame_grabber: Arc<dyn FrameGrabber>,
) -> Vec<IntercomCamera> {
    debug!(
        "Setting up 'camera' platform for entry {}",
        entry.entry_id
    );

    api.devices()
        .iter()
        .filter(|device| device.has_camera)
        .map(|device| IntercomCamera::new(entry, device, api.clone(), frame_grabber.clone()))
        .collect()
}

/// Camera entity wrapping one intercom device.
pub struct IntercomCamera {
    config_entry_id: String,
    device_id: u64,
    property_id: u64,
    entity_id: String,
    retrieval_error_threshold: u32,
    /// Consecutive photo endpoint failures since the last success or refresh.
    failed_retrieval_counter: AtomicU32,
    api: Arc<dyn IntercomApi>,
    frame_grabber: Arc<dyn FrameGrabber>,
}

impl IntercomCamera {
    pub fn new(
        entry: &ConfigEntry,
        device: &IntercomDevice,
        api: Arc<dyn IntercomApi>,
        frame_grabber: Arc<dyn FrameGrabber>,
    ) -> Self {
        Self {
            config_entry_id: entry.entry_id.clone(),
            device_id: device.id,
            property_id: device.property_id,
            entity_id: format!("camera.{}_camera", device.id),
            retrieval_error_threshold: entry.retrieval_error_threshold(),
            failed_retrieval_counter: AtomicU32::new(0),
            api,
            frame_grabber,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn device_id(&self) -> u64 {
        self.device_id
    }

    pub fn config_entry_id(&self) -> &str {
        &self.config_entry_id
    }

    pub fn retrieval_error_threshold(&self) -> u32 {
        self.retrieval_error_threshold
    }

    pub fn failed_retrieval_count(&self) -> u32 {
        self.failed_retrieval_counter.load(Ordering::SeqCst)
    }

    fn device(&self) -> Result<IntercomDevice> {
        self.api
            .device(self.device_id)
            .ok_or(BridgeError::DeviceNotFound(self.device_id))
    }

    /// Fallback for devices without a photo endpoint.
    async fn image_from_stream(
        &self,
        stream_url: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Option<Vec<u8>> {
        let Some(stream_url) = non_empty(stream_url) else {
            warn!("[{}] No video source available", self.entity_id);
            return None;
        };

        debug!("[{}] Fetching snapshot from video feed", self.entity_id);
        match self.frame_grabber.grab_frame(stream_url, width, height).await {
            Some(image) => {
                debug!("[{}] Retrieved snapshot from video feed", self.entity_id);
                Some(image)
            }
            None => {
                warn!("[{}] Video source did not provide any image", self.entity_id);
                None
            }
        }
    }
}

impl DeviceMetadata for IntercomCamera {
    fn unique_id(&self) -> String {
        format!("intercom_camera_{}_{}", self.property_id, self.device_id)
    }

    fn name(&self) -> Result<String> {
        let device = self.device()?;
        let name = [device.renamed_name, device.human_name]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or(device.name);
        Ok(name)
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:doorbell-video")
    }

    fn device_info(&self) -> Result<DeviceInfo> {
        let device = self.device()?;
        Ok(DeviceInfo {
            model: format!("{} / {}", device.kind, device.mode),
            manufacturer: device.device_category,
            identifiers: vec![(DOMAIN.to_string(), device.id.to_string())],
            name: device.name,
        })
    }

    fn extra_state_attributes(&self) -> Result<serde_json::Value> {
        let device = self.device()?;
        Ok(serde_json::json!({
            "photo_url": device.photo_url,
            "stream_url": device.stream_url,
            "all_stream_urls": flatten_stream_urls(device.video.as_ref()),
            "face_detection": device.face_detection,
        }))
    }
}

#[async_trait]
impl CameraImage for IntercomCamera {
    async fn camera_image(
        &self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Option<Vec<u8>>> {
        let device = self.device()?;

        if non_empty(device.photo_url.as_deref()).is_none() {
            return Ok(self
                .image_from_stream(device.stream_url.as_deref(), width, height)
                .await);
        }

        let threshold = self.retrieval_error_threshold;
        match self.api.fetch_snapshot(self.device_id).await {
            Ok(image) => {
                self.failed_retrieval_counter.store(0, Ordering::SeqCst);
                return Ok(Some(image));
            }
            Err(e) => {
                let failed = self.failed_retrieval_counter.fetch_add(1, Ordering::SeqCst) + 1;
                if failed < threshold {
                    error!(
                        "[{}] Error ({}/{}): {}",
                        self.entity_id, failed, threshold, e
                    );
                    return Ok(None);
                }
            }
        }

        self.failed_retrieval_counter.store(0, Ordering::SeqCst);
        error!(
            "[{}] Retrieval error threshold ({}) reached. Attempting data update to refresh URLs",
            self.entity_id, threshold
        );
        self.api.update_property_intercoms(device.property_id).await?;

        Ok(None)
    }

    async fn stream_source(&self) -> Option<String> {
        self.api.device(self.device_id)?.stream_url
    }

    fn supported_features(&self) -> u32 {
        SUPPORT_STREAM
    }
}
