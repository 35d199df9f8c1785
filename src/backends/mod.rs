// SPDX-License-Identifier: GPL-3.0-only

//! Frame acquisition seam
//!
//! The touch pipeline never talks to a driver directly. Anything that can
//! hand out the latest depth and color buffers implements [`FrameSource`];
//! the capture loop polls it once per application frame.

pub mod frame_loop;
pub mod synthetic;
pub mod types;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use synthetic::{Finger, SyntheticSource};
pub use types::{ColorFrame, DepthFrame};

/// Provider of the current depth and color buffers
///
/// Both methods may return `None` while the device has nothing new, which the
/// pipeline treats as a skipped cycle.
pub trait FrameSource: Send + Sync {
    /// Latest depth buffer, millimeters per pixel
    fn depth_frame(&self) -> Option<DepthFrame>;

    /// Latest color buffer, registered through the sensor calibration
    fn color_frame(&self) -> Option<ColorFrame>;

    /// Name for logging
    fn name(&self) -> &str {
        "frame-source"
    }
}
