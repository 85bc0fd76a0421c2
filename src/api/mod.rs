//! Intercom vendor API surface consumed by the camera entities.
//!
//! The API object owns the device list and keeps it current; entities only
//! read devices through it and ask it for snapshots or a property refresh.

pub mod inventory;

use crate::error::IntercomApiError;
use async_trait::async_trait;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub use inventory::InventoryApi;

/// Intercom unit as reported by the vendor API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntercomDevice {
    pub id: u64,
    pub property_id: u64,
    pub name: String,
    #[serde(default)]
    pub human_name: Option<String>,
    #[serde(default)]
    pub renamed_name: Option<String>,
    #[serde(default)]
    pub device_category: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub has_camera: bool,
    #[serde(default)]
    pub face_detection: bool,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub video: Option<VideoStreams>,
}

/// Stream sources grouped by quality tier.
///
/// A quality may map to several sources. Qualities keep the order in which
/// they were first seen, and sources keep insertion order within a quality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoStreams {
    entries: Vec<(String, Vec<String>)>,
}

impl VideoStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source under `quality`, creating the quality if needed.
    pub fn insert(&mut self, quality: impl Into<String>, source: impl Into<String>) {
        let quality = quality.into();
        let source = source.into();
        match self.entries.iter_mut().find(|(q, _)| *q == quality) {
            Some((_, sources)) => sources.push(source),
            None => self.entries.push((quality, vec![source])),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(quality, _)| quality.as_str())
    }

    /// All sources registered for `quality`, empty when unknown.
    pub fn get_all(&self, quality: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(q, _)| q == quality)
            .map(|(_, sources)| sources.as_slice())
            .unwrap_or(&[])
    }
}

impl Serialize for VideoStreams {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(q, sources)| (q, sources)))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

struct VideoStreamsVisitor;

impl<'de> Visitor<'de> for VideoStreamsVisitor {
    type Value = VideoStreams;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of quality to a source or a list of sources")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut streams = VideoStreams::new();
        while let Some((quality, sources)) = map.next_entry::<String, OneOrMany>()? {
            match sources {
                OneOrMany::One(source) => streams.insert(quality, source),
                OneOrMany::Many(sources) => {
                    for source in sources {
                        streams.insert(quality.clone(), source);
                    }
                }
            }
        }
        Ok(streams)
    }
}

impl<'de> Deserialize<'de> for VideoStreams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(VideoStreamsVisitor)
    }
}

/// Vendor API client as seen by the camera entities.
#[async_trait]
pub trait IntercomApi: Send + Sync {
    /// Current devices, ordered by id.
    fn devices(&self) -> Vec<IntercomDevice>;

    /// Current state of one device, if the API still knows it.
    fn device(&self, device_id: u64) -> Option<IntercomDevice>;

    /// Fetch a still image from the device's photo endpoint.
    async fn fetch_snapshot(&self, device_id: u64) -> Result<Vec<u8>, IntercomApiError>;

    /// Reload the devices of a property, repopulating their URLs.
    async fn update_property_intercoms(&self, property_id: u64) -> Result<(), IntercomApiError>;
}
