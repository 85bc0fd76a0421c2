use thiserror::Error as ThisError;

/// Failures reported by the intercom vendor API.
#[derive(ThisError, Debug)]
pub enum IntercomApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Empty snapshot body from {0}")]
    EmptySnapshot(String),

    #[error("Device {0} has no photo URL")]
    MissingPhotoUrl(u64),

    #[error("Unknown intercom device: {0}")]
    UnknownDevice(u64),

    #[error("Failed to read inventory: {0}")]
    Inventory(#[from] std::io::Error),

    #[error("Failed to parse inventory: {0}")]
    InventoryFormat(#[from] serde_json::Error),
}

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Intercom API error: {0}")]
    Api(#[from] IntercomApiError),

    #[error("Intercom device not found: {0}")]
    DeviceNotFound(u64),

    #[error("Operation not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
