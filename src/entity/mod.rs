//! Host-facing entity surface.
//!
//! A camera entity is one struct implementing two independent capabilities:
//! [`DeviceMetadata`] (identity and attributes) and [`CameraImage`] (stills
//! and stream source).

pub mod camera;

use crate::api::VideoStreams;
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use serde::Serialize;

pub use camera::{IntercomCamera, setup_cameras};

/// Integration domain used in device identifiers.
pub const DOMAIN: &str = "pik_intercom";

/// Camera exposes a live stream source.
pub const SUPPORT_STREAM: u32 = 2;

/// Device registry block shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub identifiers: Vec<(String, String)>,
}

/// One stream source with its quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEntry {
    pub quality: String,
    pub source: String,
}

/// One entry per source, grouped by quality in key order.
pub fn flatten_stream_urls(streams: Option<&VideoStreams>) -> Vec<StreamEntry> {
    let Some(streams) = streams else {
        return Vec::new();
    };

    streams
        .keys()
        .flat_map(|quality| {
            streams.get_all(quality).iter().map(move |source| StreamEntry {
                quality: quality.to_string(),
                source: source.clone(),
            })
        })
        .collect()
}

/// Identity and descriptive attributes of an entity.
pub trait DeviceMetadata {
    fn unique_id(&self) -> String;

    fn name(&self) -> Result<String>;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    fn device_info(&self) -> Result<DeviceInfo>;

    fn extra_state_attributes(&self) -> Result<serde_json::Value>;
}

/// Still-image and stream access of a camera entity.
///
/// Controls default to [`BridgeError::NotImplemented`]; hardware that has no
/// power or motion detection control simply leaves them alone.
#[async_trait]
pub trait CameraImage: Send + Sync {
    async fn camera_image(
        &self,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Option<Vec<u8>>>;

    async fn stream_source(&self) -> Option<String>;

    fn supported_features(&self) -> u32;

    fn motion_detection_enabled(&self) -> bool {
        false
    }

    fn turn_on(&self) -> Result<()> {
        Err(BridgeError::NotImplemented("turn_on"))
    }

    fn turn_off(&self) -> Result<()> {
        Err(BridgeError::NotImplemented("turn_off"))
    }

    fn enable_motion_detection(&self) -> Result<()> {
        Err(BridgeError::NotImplemented("enable_motion_detection"))
    }

    fn disable_motion_detection(&self) -> Result<()> {
        Err(BridgeError::NotImplemented("disable_motion_detection"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_stream_urls_preserves_grouping() {
        let mut streams = VideoStreams::new();
        streams.insert("high", "rtsp://h1");
        streams.insert("low", "rtsp://l1");
        streams.insert("high", "rtsp://h2");

        let entries = flatten_stream_urls(Some(&streams));
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.quality.as_str(), e.source.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("high", "rtsp://h1"), ("high", "rtsp://h2"), ("low", "rtsp://l1")]
        );
    }

    #[test]
    fn test_flatten_stream_urls_without_mapping() {
        assert!(flatten_stream_urls(None).is_empty());
        assert!(flatten_stream_urls(Some(&VideoStreams::new())).is_empty());
    }

    #[test]
    fn test_stream_entry_serializes_as_object() {
        let entry = StreamEntry {
            quality: "hd".to_string(),
            source: "rtsp://x".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            serde_json::json!({"quality": "hd", "source": "rtsp://x"})
        );
    }
}
