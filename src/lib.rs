// SPDX-License-Identifier: GPL-3.0-only

//! Touch input for projector-camera systems
//!
//! A depth camera looks at a surface that a projector draws on. This crate
//! turns depth frames into tracked touches and maps them into the
//! coordinates of a projected screen.
//!
//! # Architecture
//!
//! - [`backends`]: frame sources and the capture loop thread
//! - [`depth`]: per-frame depth data (sensor points, plane heights, colors)
//! - [`touch`]: candidate detection, tracking and the [`TouchInput`] facade
//! - [`projection`]: screens, projector displays and screen projection
//! - [`geometry`] and [`calibration`]: camera models, planes, homography
//! - [`config`]: user configuration
//!
//! # Example
//!
//! ```ignore
//! let input = Arc::new(TouchInput::new(&config)?);
//! let capture = input.spawn_capture(source, Duration::from_millis(33));
//!
//! for touch in input.project_touch_to_screen(&screen, &display)? {
//!     println!("{} at {:?}", touch.id, touch.position);
//! }
//! ```

pub mod backends;
pub mod calibration;
pub mod config;
pub mod constants;
pub mod depth;
pub mod errors;
pub mod geometry;
pub mod projection;
pub mod touch;

// Re-export commonly used types
pub use backends::{FrameSource, SyntheticSource};
pub use config::Config;
pub use errors::{TouchError, TouchResult};
pub use projection::{DepthPoint, ProjectorDisplay, Screen, ScreenProjector};
pub use touch::{Touch, TouchId, TouchInput, TrackedPoint};
