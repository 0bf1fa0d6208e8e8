use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("No frame available")]
    NoFrame,

    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Resize error: {0}")]
    Resize(String),
}

impl From<turbojpeg::Error> for CaptureError {
    fn from(err: turbojpeg::Error) -> Self {
        CaptureError::Decode(err.to_string())
    }
}

impl From<ureq::Error> for CaptureError {
    fn from(err: ureq::Error) -> Self {
        CaptureError::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = CaptureError::SizeMismatch {
            expected: 12,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "Frame size mismatch: expected 12 bytes, got 4"
        );
        assert_eq!(CaptureError::NoFrame.to_string(), "No frame available");
        assert_eq!(
            CaptureError::Http("timed out".into()).to_string(),
            "HTTP error: timed out"
        );
    }

    #[test]
    fn test_error_conversion_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::WouldBlock, "again");
        let err: CaptureError = io_err.into();
        match err {
            CaptureError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
            other => panic!("Expected Io variant, got {:?}", other),
        }
    }
}
