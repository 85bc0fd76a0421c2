use super::FrameGrabber;
use crate::config::FfmpegConfig;
use async_trait::async_trait;
use log::{debug, warn};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Frame grabber backed by an `ffmpeg` subprocess.
pub struct FfmpegFrameGrabber {
    binary: String,
    timeout: Duration,
}

impl FfmpegFrameGrabber {
    pub fn new(config: &FfmpegConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Arguments reading one frame over TCP RTSP and writing MJPEG to stdout.
    fn build_args(stream_url: &str, width: Option<u32>, height: Option<u32>) -> Vec<String> {
        let mut args: Vec<String> = ["-rtsp_transport", "tcp", "-i", stream_url, "-frames:v", "1"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if width.is_some() || height.is_some() {
            // -1 keeps the aspect ratio for the missing dimension
            let w = width.map_or(-1, i64::from);
            let h = height.map_or(-1, i64::from);
            args.push("-vf".to_string());
            args.push(format!("scale={}:{}", w, h));
        }

        args.extend(
            ["-f", "image2pipe", "-vcodec", "mjpeg", "-loglevel", "error", "-y", "-"]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }
}

#[async_trait]
impl FrameGrabber for FfmpegFrameGrabber {
    async fn grab_frame(
        &self,
        stream_url: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Option<Vec<u8>> {
        // kill_on_drop: a timed-out grab drops the Child, which kills ffmpeg
        let child = match Command::new(&self.binary)
            .args(Self::build_args(stream_url, width, height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("[ffmpeg] Failed to spawn {}: {}", self.binary, e);
                return None;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if !output.status.success() => {
                warn!(
                    "[ffmpeg] Frame grab failed ({}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Ok(Ok(output)) if output.stdout.is_empty() => {
                warn!("[ffmpeg] Frame grab returned no data");
                None
            }
            Ok(Ok(output)) => {
                debug!("[ffmpeg] Grabbed frame of {} bytes", output.stdout.len());
                Some(output.stdout)
            }
            Ok(Err(e)) => {
                warn!("[ffmpeg] Frame grab execution failed: {}", e);
                None
            }
            Err(_) => {
                warn!(
                    "[ffmpeg] Frame grab timed out after {}s",
                    self.timeout.as_secs()
                );
                None
            }
        }
    }
}
