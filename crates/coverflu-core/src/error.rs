use thiserror::Error;

use crate::tiles::ResourceHandle;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Texture upload failed: {0}")]
    Upload(String),

    #[error("Texture release failed: {0}")]
    Release(String),

    #[error("Unknown resource handle: {0}")]
    UnknownHandle(ResourceHandle),

    #[error("Async runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
