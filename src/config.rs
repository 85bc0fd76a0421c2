use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Lowest retrieval error threshold accepted, whatever the configured value.
pub const MIN_RETRIEVAL_ERROR_THRESHOLD: u32 = 5;

/// Clamp a configured retrieval error threshold to the supported floor.
pub fn effective_retrieval_error_threshold(configured: u32) -> u32 {
    configured.max(MIN_RETRIEVAL_ERROR_THRESHOLD)
}

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

fn load_dotenv_from(env_path: &Path) {
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: called from main before the async runtime spawns worker threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split .env content into key/value pairs, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifier of the integration instance the cameras belong to.
    pub entry_id: String,
    pub camera: CameraConfig,
    pub inventory: InventoryConfig,
    pub ffmpeg: FfmpegConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Consecutive snapshot failures before a property refresh is forced.
    /// Values below [`MIN_RETRIEVAL_ERROR_THRESHOLD`] are raised to it.
    pub retrieval_error_threshold: u32,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub path: PathBuf,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FfmpegConfig {
    pub binary: String,
    pub timeout_secs: u64,
}

/// Per-integration-instance settings handed to the camera platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub entry_id: String,
    pub retrieval_error_threshold: u32,
}

impl ConfigEntry {
    pub fn new(entry_id: impl Into<String>, retrieval_error_threshold: u32) -> Self {
        Self {
            entry_id: entry_id.into(),
            retrieval_error_threshold,
        }
    }

    /// Threshold with the floor applied.
    pub fn retrieval_error_threshold(&self) -> u32 {
        effective_retrieval_error_threshold(self.retrieval_error_threshold)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry_id: "pik_intercom".to_string(),
            camera: CameraConfig {
                retrieval_error_threshold: MIN_RETRIEVAL_ERROR_THRESHOLD,
                poll_interval_secs: 10,
            },
            inventory: InventoryConfig {
                path: PathBuf::from("intercoms.json"),
                http_timeout_secs: 10,
            },
            ffmpeg: FfmpegConfig {
                binary: "ffmpeg".to_string(),
                timeout_secs: 15,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(entry_id) = std::env::var("CONFIG_ENTRY_ID") {
            config.entry_id = entry_id;
        }
        if let Ok(threshold) = std::env::var("RETRIEVAL_ERROR_THRESHOLD")
            && let Ok(t) = threshold.parse()
        {
            config.camera.retrieval_error_threshold = t;
        }
        if let Ok(interval) = std::env::var("POLL_INTERVAL_SECS")
            && let Ok(i) = interval.parse()
        {
            config.camera.poll_interval_secs = i;
        }

        // Inventory configuration
        if let Ok(path) = std::env::var("INVENTORY_PATH") {
            config.inventory.path = PathBuf::from(path);
        }
        if let Ok(timeout) = std::env::var("HTTP_TIMEOUT_SECS")
            && let Ok(t) = timeout.parse()
        {
            config.inventory.http_timeout_secs = t;
        }

        // ffmpeg configuration
        if let Ok(binary) = std::env::var("FFMPEG_BINARY") {
            config.ffmpeg.binary = binary;
        }
        if let Ok(timeout) = std::env::var("FFMPEG_TIMEOUT_SECS")
            && let Ok(t) = timeout.parse()
        {
            config.ffmpeg.timeout_secs = t;
        }

        config
    }

    /// Threshold actually applied by the camera entities.
    pub fn retrieval_error_threshold(&self) -> u32 {
        effective_retrieval_error_threshold(self.camera.retrieval_error_threshold)
    }

    pub fn config_entry(&self) -> ConfigEntry {
        ConfigEntry::new(self.entry_id.clone(), self.camera.retrieval_error_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_floor() {
        assert_eq!(effective_retrieval_error_threshold(0), 5);
        assert_eq!(effective_retrieval_error_threshold(2), 5);
        assert_eq!(effective_retrieval_error_threshold(5), 5);
        assert_eq!(effective_retrieval_error_threshold(8), 8);
    }

    #[test]
    fn test_config_threshold_uses_floor() {
        let mut config = Config::default();
        config.camera.retrieval_error_threshold = 3;
        assert_eq!(config.retrieval_error_threshold(), 5);

        config.camera.retrieval_error_threshold = 12;
        assert_eq!(config.retrieval_error_threshold(), 12);
    }

    #[test]
    fn test_config_entry_from_config() {
        let mut config = Config::default();
        config.entry_id = "entry-1".to_string();
        config.camera.retrieval_error_threshold = 1;

        let entry = config.config_entry();
        assert_eq!(entry.entry_id, "entry-1");
        assert_eq!(entry.retrieval_error_threshold, 1);
        assert_eq!(entry.retrieval_error_threshold(), 5);
    }

    #[test]
    fn test_parse_dotenv() {
        let content = r#"
# comment
INVENTORY_PATH = /srv/intercoms.json
CONFIG_ENTRY_ID="home entry"
FFMPEG_BINARY='/usr/bin/ffmpeg'
broken line
EMPTY=
"#;
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![
                ("INVENTORY_PATH", "/srv/intercoms.json"),
                ("CONFIG_ENTRY_ID", "home entry"),
                ("FFMPEG_BINARY", "/usr/bin/ffmpeg"),
                ("EMPTY", ""),
            ]
        );
    }

    #[test]
    fn test_single_quote_value_kept() {
        let pairs = parse_dotenv("KEY=\"");
        assert_eq!(pairs, vec![("KEY", "\"")]);
    }
}
