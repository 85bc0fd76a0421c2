//! Single-frame grabbing from live video streams.

mod ffmpeg;

use async_trait::async_trait;

pub use ffmpeg::FfmpegFrameGrabber;

/// Grabs one still frame from a stream URL.
///
/// Implementations handle their own timeouts and report every failure as
/// `None`; callers only care whether an image came back.
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    async fn grab_frame(
        &self,
        stream_url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Option<Vec<u8>>;
}
