// SPDX-License-Identifier: GPL-3.0-only

//! Projector model used for the normalized-ray projection

use super::Screen;
use crate::errors::{TouchError, TouchResult};
use crate::geometry::{ProjectiveDevice, Ray3, Vec3, transform_point};
use nalgebra::Matrix4;

/// Projector intrinsics and its pose relative to the depth sensor
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectorDisplay {
    device: ProjectiveDevice,
    /// Sensor space to projector space
    extrinsics: Matrix4<f32>,
    /// Projector space to sensor space
    extrinsics_inv: Matrix4<f32>,
}

impl ProjectorDisplay {
    pub fn new(device: ProjectiveDevice, extrinsics: Matrix4<f32>) -> TouchResult<Self> {
        let extrinsics_inv = extrinsics
            .try_inverse()
            .ok_or_else(|| TouchError::Config("projector extrinsics are singular".to_string()))?;
        Ok(Self {
            device,
            extrinsics,
            extrinsics_inv,
        })
    }

    /// Projector whose optical center and axes coincide with the sensor's
    pub fn co_located(device: ProjectiveDevice) -> Self {
        Self {
            device,
            extrinsics: Matrix4::identity(),
            extrinsics_inv: Matrix4::identity(),
        }
    }

    pub fn device(&self) -> &ProjectiveDevice {
        &self.device
    }

    pub fn extrinsics(&self) -> &Matrix4<f32> {
        &self.extrinsics
    }

    pub fn frame_width(&self) -> u32 {
        self.device.width
    }

    pub fn frame_height(&self) -> u32 {
        self.device.height
    }

    /// Screen position seen by the projector pixel at normalized (`px`, `py`)
    ///
    /// The ray from the projector center through that pixel is moved into
    /// sensor space and intersected with the screen plane. The result is
    /// normalized to the screen size with the origin at the top-left corner;
    /// z is always 1. Returns `None` when the ray misses the plane.
    pub fn project_pointer(&self, screen: &Screen, px: f32, py: f32) -> Option<Vec3> {
        let viewed = self.device.pixel_to_world_norm(
            px * self.device.width as f32,
            py * self.device.height as f32,
        );

        let origin = transform_point(&self.extrinsics_inv, &Vec3::zeros());
        let viewed = transform_point(&self.extrinsics_inv, &viewed);

        let hit = screen.plane().intersect_ray(&Ray3::through(origin, viewed))?;
        let (u, v) = screen.world_to_normalized(&hit);
        // Screen y grows upward, image y grows downward
        Some(Vec3::new(u, 1.0 - v, 1.0))
    }

    /// Same as [`project_pointer`](Self::project_pointer), as a `Result`
    pub fn project_pointer_checked(&self, screen: &Screen, px: f32, py: f32) -> TouchResult<Vec3> {
        self.project_pointer(screen, px, py)
            .ok_or(TouchError::NoIntersection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shifted_projector() {
        let device = ProjectiveDevice {
            fx: 500.0,
            fy: 500.0,
            cx: 320.0,
            cy: 240.0,
            width: 640,
            height: 480,
        };
        // Projector 100 mm to the right of the sensor: sensor x = projector x + 100
        let extrinsics = Matrix4::new_translation(&Vec3::new(-100.0, 0.0, 0.0));
        let display = ProjectorDisplay::new(device, extrinsics).unwrap();

        let screen = Screen::from_axes(
            Vec3::new(-320.0, 240.0, 500.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            640.0,
            480.0,
        )
        .unwrap();

        let p = display.project_pointer(&screen, 0.5, 0.5).unwrap();
        // Hits the plane at sensor x = 100, local x = 420
        assert!((p.x - 420.0 / 640.0).abs() < 1e-4);
        assert!((p.y - 0.5).abs() < 1e-4);
        assert_eq!(p.z, 1.0);
    }

    #[test]
    fn test_singular_extrinsics() {
        let result = ProjectorDisplay::new(ProjectiveDevice::default(), Matrix4::zeros());
        assert!(matches!(result, Err(TouchError::Config(_))));
    }

    #[test]
    fn test_screen_behind_projector() {
        let display = ProjectorDisplay::co_located(ProjectiveDevice::default());
        let screen = Screen::from_axes(
            Vec3::new(0.0, 0.0, -500.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            640.0,
            480.0,
        )
        .unwrap();
        assert_eq!(
            display.project_pointer_checked(&screen, 0.5, 0.5),
            Err(TouchError::NoIntersection)
        );
    }
}
