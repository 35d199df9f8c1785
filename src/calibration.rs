// SPDX-License-Identifier: GPL-3.0-only

//! Calibration bundle consumed by the touch pipeline
//!
//! Values arrive already computed (from the configuration file or a
//! calibration tool); this module only applies them.

use crate::constants::{TOUCH_BAND_2D_MM, TRACK_NEAR_DIST_2D, TRACK_NEAR_DIST_3D};
use crate::geometry::{Plane, Vec3, transform_point};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Thresholds for one detection mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarTouchCalibration {
    /// Largest world distance (mm) between neighbouring samples of one region
    pub maximum_distance: f32,
    /// Regions with fewer samples are noise
    pub minimum_component_size: u32,
    /// Neighbourhood radius in pixels when growing a region
    pub search_depth: u32,
    /// Maximum number of growth steps from the seed sample
    pub maximum_recursion: u32,
    /// Match distance (mm) used by the tracker
    pub tracking_max_distance: f32,
}

impl PlanarTouchCalibration {
    /// Defaults for fingers resting on the surface
    pub fn default_2d() -> Self {
        Self {
            maximum_distance: 10.0,
            minimum_component_size: 3,
            search_depth: 1,
            maximum_recursion: 200,
            tracking_max_distance: TRACK_NEAR_DIST_2D,
        }
    }

    /// Defaults for hands and objects above the surface
    pub fn default_3d() -> Self {
        Self {
            maximum_distance: 25.0,
            minimum_component_size: 10,
            search_depth: 2,
            maximum_recursion: 500,
            tracking_max_distance: TRACK_NEAR_DIST_3D,
        }
    }

    /// Copy adapted to an image scaled by `scale`
    ///
    /// Lengths scale linearly, the component size is an area and scales
    /// quadratically. Search depth and recursion never drop below 1.
    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            maximum_distance: self.maximum_distance * scale,
            minimum_component_size: (self.minimum_component_size as f32 * scale * scale) as u32,
            search_depth: ((self.search_depth as f32 * scale) as u32).max(1),
            maximum_recursion: ((self.maximum_recursion as f32 * scale) as u32).max(1),
            tracking_max_distance: self.tracking_max_distance * scale,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.maximum_distance.is_finite() && self.maximum_distance > 0.0) {
            return Err(format!("maximum_distance must be positive, got {}", self.maximum_distance));
        }
        if !(self.tracking_max_distance.is_finite() && self.tracking_max_distance > 0.0) {
            return Err(format!(
                "tracking_max_distance must be positive, got {}",
                self.tracking_max_distance
            ));
        }
        if self.search_depth == 0 {
            return Err("search_depth must be at least 1".to_string());
        }
        if self.maximum_recursion == 0 {
            return Err("maximum_recursion must be at least 1".to_string());
        }
        Ok(())
    }
}

/// The physical surface and the band above it counted as touching
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneCalibration {
    pub plane: Plane,
    /// Touch band height (mm)
    pub height: f32,
}

impl Default for PlaneCalibration {
    fn default() -> Self {
        Self {
            plane: Plane::new(Vec3::new(0.0, 0.0, 1000.0), Vec3::new(0.0, 0.0, -1.0)),
            height: TOUCH_BAND_2D_MM,
        }
    }
}

impl PlaneCalibration {
    /// Height of `point` above the surface
    pub fn height_of(&self, point: &Vec3) -> f32 {
        self.plane.distance_to(point)
    }

    /// Above the surface and inside the touch band
    pub fn has_good_distance(&self, point: &Vec3) -> bool {
        let h = self.height_of(point);
        h > 0.0 && h <= self.height
    }
}

/// Mapping from sensor space to normalized projector coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomographyCalibration {
    pub matrix: Matrix4<f32>,
}

impl Default for HomographyCalibration {
    /// Projector sharing the optical center of the default depth camera
    fn default() -> Self {
        Self::from_device(&crate::geometry::ProjectiveDevice::default())
    }
}

impl HomographyCalibration {
    /// Homography for a projector co-located with `device`
    pub fn from_device(device: &crate::geometry::ProjectiveDevice) -> Self {
        let w = device.width as f32;
        let h = device.height as f32;
        #[rustfmt::skip]
        let matrix = Matrix4::new(
            device.fx / w, 0.0,           device.cx / w, 0.0,
            0.0,           device.fy / h, device.cy / h, 0.0,
            0.0,           0.0,           0.0,           0.0,
            0.0,           0.0,           1.0,           0.0,
        );
        Self { matrix }
    }

    /// Normalized projector coordinates of `point` (z is left at 0)
    pub fn project(&self, point: &Vec3) -> Vec3 {
        let p = transform_point(&self.matrix, point);
        Vec3::new(p.x, p.y, 0.0)
    }
}

/// Plane and projector calibration used together for every depth sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneAndProjectionCalibration {
    pub plane: PlaneCalibration,
    pub homography: HomographyCalibration,
}

impl PlaneAndProjectionCalibration {
    /// Normalized projector x/y with the height above the surface as z
    pub fn project(&self, point: &Vec3) -> Vec3 {
        let mut projected = self.homography.project(point);
        projected.z = self.plane.height_of(point);
        projected
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.plane.plane.is_valid() {
            return Err("plane normal must be non-zero".to_string());
        }
        if !(self.plane.height.is_finite() && self.plane.height > 0.0) {
            return Err(format!("plane height must be positive, got {}", self.plane.height));
        }
        if self.homography.matrix.iter().any(|v| !v.is_finite()) {
            return Err("homography contains non-finite values".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_calibration() {
        let calib = PlanarTouchCalibration::default_3d().scaled(2.0);
        assert_eq!(calib.maximum_distance, 50.0);
        assert_eq!(calib.minimum_component_size, 40);
        assert_eq!(calib.search_depth, 4);
        assert_eq!(calib.maximum_recursion, 1000);
        assert_eq!(calib.tracking_max_distance, TRACK_NEAR_DIST_3D * 2.0);
    }

    #[test]
    fn test_downscaled_calibration_stays_valid() {
        let calib = PlanarTouchCalibration::default_2d().scaled(0.25);
        assert_eq!(calib.search_depth, 1);
        assert!(calib.maximum_recursion >= 1);
        assert!(calib.validate().is_ok());

        let tiny = PlanarTouchCalibration::default_3d().scaled(0.001);
        assert_eq!(tiny.search_depth, 1);
        assert_eq!(tiny.maximum_recursion, 1);
    }

    #[test]
    fn test_touch_band() {
        let calib = PlaneCalibration::default();
        assert!(calib.has_good_distance(&Vec3::new(0.0, 0.0, 990.0)));
        assert!(!calib.has_good_distance(&Vec3::new(0.0, 0.0, 1000.0)));
        assert!(!calib.has_good_distance(&Vec3::new(0.0, 0.0, 900.0)));
        assert!(!calib.has_good_distance(&Vec3::new(0.0, 0.0, 1010.0)));
    }

    #[test]
    fn test_default_homography_matches_depth_pixels() {
        let device = crate::geometry::ProjectiveDevice::default();
        let calib = PlaneAndProjectionCalibration::default();
        let p = device.unproject(160.0, 120.0, 990.0);
        let projected = calib.project(&p);
        assert!((projected.x - 0.25).abs() < 1e-4);
        assert!((projected.y - 0.25).abs() < 1e-4);
        assert!((projected.z - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PlanarTouchCalibration::default_2d().validate().is_ok());
        let mut calib = PlanarTouchCalibration::default_2d();
        calib.maximum_distance = f32::NAN;
        assert!(calib.validate().is_err());

        let mut bundle = PlaneAndProjectionCalibration::default();
        bundle.plane.plane.normal = Vec3::zeros();
        assert!(bundle.validate().is_err());
    }
}
