// SPDX-License-Identifier: GPL-3.0-only

//! Screen projection
//!
//! Maps a sensed point into the local 2D frame of a physical screen. Two
//! strategies exist:
//!
//! - **Normalized ray** (default): the point's normalized projector
//!   coordinates select a projector pixel, a ray from the projector through
//!   that pixel is intersected with the screen plane, and the hit is expressed
//!   in screen coordinates with the origin at the top-left corner.
//! - **Raw depth**: the sensor-space point goes straight through the inverse
//!   of the screen location. No precision is lost to the ray cast.
//!
//! Everything here is pure. Screens and displays are read-only inputs.

mod display;
mod screen;

pub use display::ProjectorDisplay;
pub use screen::Screen;

use crate::errors::{TouchError, TouchResult};
use crate::geometry::{Vec3, transform_point};
use serde::{Deserialize, Serialize};

/// A depth sample expressed in screen coordinates, for bulk export
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Opaque 0xAARRGGBB
    pub color: u32,
}

/// Projection strategy and clipping policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenProjector {
    /// Skip the ray cast and transform sensor points directly
    pub use_raw_depth: bool,
    /// Return points outside the screen instead of dropping them
    pub compute_outsiders: bool,
}

impl ScreenProjector {
    pub fn new(use_raw_depth: bool, compute_outsiders: bool) -> Self {
        Self {
            use_raw_depth,
            compute_outsiders,
        }
    }

    /// Project a point into `screen` coordinates
    ///
    /// `sensor_point` is the point in sensor space (mm), `normalized_point`
    /// its normalized projector coordinates with the height above the surface
    /// as z. Returns `None` when there is no intersection or, unless outsiders
    /// are computed, when the result lies outside `[0, width] x [0, height]`.
    pub fn project(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
        sensor_point: &Vec3,
        normalized_point: &Vec3,
    ) -> Option<Vec3> {
        let screen_point = if self.use_raw_depth {
            transform_point(screen.world_to_local(), sensor_point)
        } else {
            let pointer = display.project_pointer(screen, normalized_point.x, normalized_point.y)?;
            Vec3::new(
                pointer.x * screen.width(),
                pointer.y * screen.height(),
                normalized_point.z,
            )
        };

        if !screen_point.iter().all(|v| v.is_finite()) {
            return None;
        }

        if self.compute_outsiders || screen.contains(screen_point.x, screen_point.y) {
            Some(screen_point)
        } else {
            None
        }
    }

    /// Same as [`project`](Self::project), reporting failures as errors
    pub fn project_checked(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
        sensor_point: &Vec3,
        normalized_point: &Vec3,
    ) -> TouchResult<Vec3> {
        self.project(screen, display, sensor_point, normalized_point)
            .ok_or(TouchError::NoIntersection)
    }
}
