//! Host-side integration: entity lifecycle per config entry and the blocking
//! image shim for hosts that call in from outside the async runtime.

use crate::api::IntercomApi;
use crate::config::ConfigEntry;
use crate::entity::{CameraImage, IntercomCamera, setup_cameras};
use crate::error::{BridgeError, Result};
use crate::media::FrameGrabber;
use log::info;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Camera entities registered per config entry.
#[derive(Default)]
pub struct IntegrationHost {
    entries: RwLock<HashMap<String, Vec<Arc<IntercomCamera>>>>,
}

impl IntegrationHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the camera entities of `entry`, replacing any earlier set.
    ///
    /// Returns the number of entities added.
    pub fn setup_entry(
        &self,
        entry: &ConfigEntry,
        api: Arc<dyn IntercomApi>,
        frame_grabber: Arc<dyn FrameGrabber>,
    ) -> usize {
        let cameras: Vec<Arc<IntercomCamera>> = setup_cameras(entry, api, frame_grabber)
            .into_iter()
            .map(Arc::new)
            .collect();
        let count = cameras.len();

        if self
            .entries
            .write()
            .insert(entry.entry_id.clone(), cameras)
            .is_some()
        {
            info!("Replaced camera entities of entry {}", entry.entry_id);
        }
        info!("Added {} camera(s) for entry {}", count, entry.entry_id);
        count
    }

    pub fn entities(&self, entry_id: &str) -> Vec<Arc<IntercomCamera>> {
        self.entries.read().get(entry_id).cloned().unwrap_or_default()
    }

    /// Look up a camera of `entry_id` by its device id.
    pub fn camera(&self, entry_id: &str, device_id: u64) -> Option<Arc<IntercomCamera>> {
        self.entries
            .read()
            .get(entry_id)?
            .iter()
            .find(|camera| camera.device_id() == device_id)
            .cloned()
    }

    /// Drop the entities of `entry_id`. Returns false for unknown entries.
    pub fn unload_entry(&self, entry_id: &str) -> bool {
        match self.entries.write().remove(entry_id) {
            Some(cameras) => {
                info!(
                    "Unloaded {} camera(s) of entry {}",
                    cameras.len(),
                    entry_id
                );
                true
            }
            None => false,
        }
    }
}

/// Synchronous image access for host threads outside the runtime.
///
/// The request runs as a task on the runtime behind `handle`; the calling
/// thread blocks until it completes. Must not be called from within an async
/// context.
pub struct BlockingCamera {
    camera: Arc<dyn CameraImage>,
    handle: Handle,
}

impl BlockingCamera {
    pub fn new(camera: Arc<dyn CameraImage>, handle: Handle) -> Self {
        Self { camera, handle }
    }

    pub fn camera_image(&self, width: Option<u32>, height: Option<u32>) -> Result<Option<Vec<u8>>> {
        let (tx, rx) = oneshot::channel();
        let camera = self.camera.clone();

        self.handle.spawn(async move {
            let _ = tx.send(camera.camera_image(width, height).await);
        });

        rx.blocking_recv()
            .map_err(|_| BridgeError::TaskFailed("camera image task ended without a result".into()))?
    }
}
