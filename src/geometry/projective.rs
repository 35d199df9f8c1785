// SPDX-License-Identifier: GPL-3.0-only

//! Pinhole device model shared by the depth camera, color camera and projector

use super::Vec3;
use crate::constants::kinect;
use serde::{Deserialize, Serialize};

/// Intrinsic parameters of a camera or projector
///
/// Image convention: origin at the top-left pixel, x right, y down, z forward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectiveDevice {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
}

impl Default for ProjectiveDevice {
    fn default() -> Self {
        Self {
            fx: kinect::FX,
            fy: kinect::FY,
            cx: kinect::CX,
            cy: kinect::CY,
            width: kinect::WIDTH,
            height: kinect::HEIGHT,
        }
    }
}

impl ProjectiveDevice {
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.fx.is_finite()
            && self.fy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
            && self.cx.is_finite()
            && self.cy.is_finite()
    }

    /// Number of pixels in a frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Point on the z = 1 image plane seen by pixel (`px`, `py`)
    pub fn pixel_to_world_norm(&self, px: f32, py: f32) -> Vec3 {
        Vec3::new((px - self.cx) / self.fx, (py - self.cy) / self.fy, 1.0)
    }

    /// Back-project a pixel with a known depth (mm along z)
    pub fn unproject(&self, px: f32, py: f32, depth_mm: f32) -> Vec3 {
        self.pixel_to_world_norm(px, py) * depth_mm
    }

    /// Project a device-space point to sub-pixel coordinates
    ///
    /// Points at or behind the optical center have no image.
    pub fn world_to_pixel(&self, point: &Vec3) -> Option<(f32, f32)> {
        if point.z <= f32::EPSILON {
            return None;
        }
        Some((
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        ))
    }

    /// Buffer offset of the pixel seeing `point`, if it falls inside the frame
    ///
    /// Pixel centers sit on integer coordinates, matching [`unproject`](Self::unproject).
    pub fn pixel_offset(&self, point: &Vec3) -> Option<usize> {
        let (px, py) = self.world_to_pixel(point)?;
        let (px, py) = (px.round(), py.round());
        if !(px.is_finite() && py.is_finite()) || px < 0.0 || py < 0.0 {
            return None;
        }
        let (x, y) = (px as u32, py as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }
}
