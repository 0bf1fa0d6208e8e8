use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActuatorError {
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Serial write failed: {0}")]
    Write(#[source] io::Error),

    #[error("Serial flush failed: {0}")]
    Flush(#[source] io::Error),
}
