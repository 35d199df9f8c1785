// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic depth camera
//!
//! Renders a flat surface seen straight on, with round "fingers" standing
//! above it at configurable heights. Used by the `simulate` command and by
//! tests that need a frame source without hardware.

use super::FrameSource;
use super::types::{ColorFrame, DepthFrame};
use crate::calibration::{HomographyCalibration, PlaneAndProjectionCalibration, PlaneCalibration};
use crate::errors::TouchResult;
use crate::geometry::{Plane, ProjectiveDevice, Vec3};
use crate::projection::{ProjectorDisplay, Screen};
use std::sync::Mutex;
use tracing::debug;

/// Surface color in the synthetic color frame
const SURFACE_RGB: [u8; 3] = [128, 128, 128];

/// A disc above the surface, in depth pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Finger {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Height above the surface (mm)
    pub height_mm: f32,
    pub rgb: [u8; 3],
}

impl Finger {
    /// Finger resting on the surface, inside the default touch band
    pub fn touching(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            radius: 6.0,
            height_mm: 8.0,
            rgb: [220, 40, 40],
        }
    }

    /// Finger hovering well above the touch band
    pub fn hovering(x: f32, y: f32, height_mm: f32) -> Self {
        Self {
            x,
            y,
            radius: 8.0,
            height_mm,
            rgb: [40, 40, 220],
        }
    }

    fn covers(&self, px: u32, py: u32) -> bool {
        let dx = px as f32 + 0.5 - self.x;
        let dy = py as f32 + 0.5 - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

#[derive(Debug)]
struct Scene {
    fingers: Vec<Finger>,
    available: bool,
    frames_served: u64,
}

/// Deterministic frame source for a flat surface
#[derive(Debug)]
pub struct SyntheticSource {
    device: ProjectiveDevice,
    surface_depth_mm: u16,
    scene: Mutex<Scene>,
}

impl SyntheticSource {
    pub fn new(device: ProjectiveDevice, surface_depth_mm: u16) -> Self {
        Self {
            device,
            surface_depth_mm,
            scene: Mutex::new(Scene {
                fingers: Vec::new(),
                available: true,
                frames_served: 0,
            }),
        }
    }

    pub fn with_fingers(self, fingers: Vec<Finger>) -> Self {
        self.set_fingers(fingers);
        self
    }

    pub fn device(&self) -> &ProjectiveDevice {
        &self.device
    }

    pub fn surface_depth_mm(&self) -> u16 {
        self.surface_depth_mm
    }

    /// Replace every finger in the scene
    pub fn set_fingers(&self, fingers: Vec<Finger>) {
        if let Ok(mut scene) = self.scene.lock() {
            scene.fingers = fingers;
        }
    }

    pub fn fingers(&self) -> Vec<Finger> {
        self.scene
            .lock()
            .map(|scene| scene.fingers.clone())
            .unwrap_or_default()
    }

    /// Simulate a device that has not produced a frame yet
    pub fn set_available(&self, available: bool) {
        if let Ok(mut scene) = self.scene.lock() {
            scene.available = available;
        }
    }

    /// Depth frames handed out so far
    pub fn frames_served(&self) -> u64 {
        self.scene.lock().map(|s| s.frames_served).unwrap_or(0)
    }

    /// Calibration matching the rendered scene
    pub fn calibration(&self) -> PlaneAndProjectionCalibration {
        let depth = self.surface_depth_mm as f32;
        PlaneAndProjectionCalibration {
            plane: PlaneCalibration {
                plane: Plane::new(Vec3::new(0.0, 0.0, depth), Vec3::new(0.0, 0.0, -1.0)),
                ..PlaneCalibration::default()
            },
            homography: HomographyCalibration::from_device(&self.device),
        }
    }

    /// Screen covering the whole field of view on the surface
    ///
    /// Its top-left corner is seen by the top-left depth pixel.
    pub fn surface_screen(&self) -> TouchResult<Screen> {
        let depth = self.surface_depth_mm as f32;
        let w = self.device.width as f32;
        let h = self.device.height as f32;
        let bottom_left = self.device.unproject(0.0, h, depth);
        Screen::from_axes(
            bottom_left,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            w * depth / self.device.fx,
            h * depth / self.device.fy,
        )
    }

    /// Projector sharing the depth camera's optical center
    pub fn display(&self) -> ProjectorDisplay {
        ProjectorDisplay::co_located(self.device)
    }

    fn render_depth(&self, fingers: &[Finger]) -> Vec<u16> {
        let (w, h) = (self.device.width, self.device.height);
        let mut data = vec![self.surface_depth_mm; (w * h) as usize];
        for finger in fingers {
            let depth = (self.surface_depth_mm as f32 - finger.height_mm).max(1.0) as u16;
            for_each_covered(finger, w, h, |offset| data[offset] = depth);
        }
        data
    }

    fn render_color(&self, fingers: &[Finger]) -> Vec<u8> {
        let (w, h) = (self.device.width, self.device.height);
        let mut data = SURFACE_RGB.repeat((w * h) as usize);
        for finger in fingers {
            for_each_covered(finger, w, h, |offset| {
                data[offset * 3..offset * 3 + 3].copy_from_slice(&finger.rgb)
            });
        }
        data
    }
}

fn for_each_covered(finger: &Finger, width: u32, height: u32, mut f: impl FnMut(usize)) {
    let x0 = (finger.x - finger.radius).floor().max(0.0) as u32;
    let y0 = (finger.y - finger.radius).floor().max(0.0) as u32;
    let x1 = ((finger.x + finger.radius).ceil().max(0.0) as u32).min(width);
    let y1 = ((finger.y + finger.radius).ceil().max(0.0) as u32).min(height);
    for y in y0..y1 {
        for x in x0..x1 {
            if finger.covers(x, y) {
                f((y * width + x) as usize);
            }
        }
    }
}

impl FrameSource for SyntheticSource {
    fn depth_frame(&self) -> Option<DepthFrame> {
        let fingers = {
            let mut scene = self.scene.lock().ok()?;
            if !scene.available {
                debug!("Synthetic source unavailable");
                return None;
            }
            scene.frames_served += 1;
            scene.fingers.clone()
        };
        Some(DepthFrame::new(
            self.device.width,
            self.device.height,
            self.render_depth(&fingers),
        ))
    }

    fn color_frame(&self) -> Option<ColorFrame> {
        let fingers = {
            let scene = self.scene.lock().ok()?;
            if !scene.available {
                return None;
            }
            scene.fingers.clone()
        };
        Some(ColorFrame::new(
            self.device.width,
            self.device.height,
            self.render_color(&fingers),
        ))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
