use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid zone geometry: {0}")]
    InvalidZone(String),

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("evidence storage failed for {identifier}: {reason}")]
    Storage { identifier: String, reason: String },
}
