use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("usage error: {0}")]
    Usage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("sample sink error: {0}")]
    Sink(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;
