#[cfg(feature = "v4l2")]
pub mod camera;
pub mod decoder;
#[cfg(feature = "v4l2")]
pub mod device;
pub mod error;
pub mod resize;
pub mod snapshot;
pub mod source;

#[cfg(feature = "v4l2")]
pub use camera::CameraSource;
pub use decoder::{DecodedImage, FrameDecoder, MjpegDecoder, YuyvDecoder};
pub use error::CaptureError;
pub use resize::FrameResizer;
pub use snapshot::SnapshotSource;
pub use source::{FrameSource, SourceSpec, open_source};
