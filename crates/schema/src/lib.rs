//! Data types shared between capture, inference and the controller.

mod detection;
mod frame;

pub use detection::{BoundingBox, Detection};
pub use frame::Frame;
