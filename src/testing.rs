//! Scripted API and frame grabber doubles shared by unit tests.

use crate::api::{IntercomApi, IntercomDevice};
use crate::error::IntercomApiError;
use crate::media::FrameGrabber;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted API: snapshot calls pop queued results, refresh calls are counted.
pub(crate) struct FakeApi {
    pub(crate) devices: Mutex<Vec<IntercomDevice>>,
    snapshots: Mutex<VecDeque<std::result::Result<Vec<u8>, IntercomApiError>>>,
    snapshot_calls: AtomicUsize,
    refresh_calls: Mutex<Vec<u64>>,
    refresh_fails: bool,
}

impl FakeApi {
    pub(crate) fn new(devices: Vec<IntercomDevice>) -> Self {
        Self {
            devices: Mutex::new(devices),
            snapshots: Mutex::new(VecDeque::new()),
            snapshot_calls: AtomicUsize::new(0),
            refresh_calls: Mutex::new(Vec::new()),
            refresh_fails: false,
        }
    }

    pub(crate) fn failing_refresh(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    pub(crate) fn queue_failures(&self, count: usize) {
        let mut snapshots = self.snapshots.lock();
        for _ in 0..count {
            snapshots.push_back(Err(IntercomApiError::Status {
                status: 504,
                url: "https://cdn.example/photo.jpg".to_string(),
            }));
        }
    }

    pub(crate) fn queue_image(&self, image: &[u8]) {
        self.snapshots.lock().push_back(Ok(image.to_vec()));
    }

    pub(crate) fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_calls(&self) -> Vec<u64> {
        self.refresh_calls.lock().clone()
    }
}

#[async_trait]
impl IntercomApi for FakeApi {
    fn devices(&self) -> Vec<IntercomDevice> {
        self.devices.lock().clone()
    }

    fn device(&self, device_id: u64) -> Option<IntercomDevice> {
        self.devices.lock().iter().find(|d| d.id == device_id).cloned()
    }

    async fn fetch_snapshot(
        &self,
        device_id: u64,
    ) -> std::result::Result<Vec<u8>, IntercomApiError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        self.snapshots
            .lock()
            .pop_front()
            .unwrap_or(Err(IntercomApiError::UnknownDevice(device_id)))
    }

    async fn update_property_intercoms(
        &self,
        property_id: u64,
    ) -> std::result::Result<(), IntercomApiError> {
        self.refresh_calls.lock().push(property_id);
        if self.refresh_fails {
            return Err(IntercomApiError::Status {
                status: 503,
                url: "https://api.example/intercoms".to_string(),
            });
        }
        Ok(())
    }
}

/// Records grab requests and answers with a fixed frame.
pub(crate) struct FakeGrabber {
    frame: Option<Vec<u8>>,
    pub(crate) calls: Mutex<Vec<(String, Option<u32>, Option<u32>)>>,
}

impl FakeGrabber {
    pub(crate) fn returning(frame: Option<&[u8]>) -> Self {
        Self {
            frame: frame.map(<[u8]>::to_vec),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FrameGrabber for FakeGrabber {
    async fn grab_frame(
        &self,
        stream_url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Option<Vec<u8>> {
        self.calls
            .lock()
            .push((stream_url.to_string(), width, height));
        self.frame.clone()
    }
}

pub(crate) fn device(id: u64) -> IntercomDevice {
    IntercomDevice {
        id,
        property_id: 42,
        name: format!("Intercom {}", id),
        human_name: None,
        renamed_name: None,
        device_category: "Pik Domofon".to_string(),
        kind: "IP".to_string(),
        mode: "video".to_string(),
        has_camera: true,
        face_detection: false,
        photo_url: Some(format!("https://cdn.example/{}.jpg", id)),
        stream_url: Some(format!("rtsp://media.example/{}", id)),
        video: None,
    }
}
