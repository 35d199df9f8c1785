// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Kinect v1 depth camera intrinsics at the 640x480 depth resolution
///
/// Used as the default sensor model when no calibration overrides them.
pub mod kinect {
    /// Focal length X (pixels)
    pub const FX: f32 = 594.21;
    /// Focal length Y (pixels)
    pub const FY: f32 = 591.04;
    /// Principal point X (pixels)
    pub const CX: f32 = 339.5;
    /// Principal point Y (pixels)
    pub const CY: f32 = 242.7;

    /// Depth frame width
    pub const WIDTH: u32 = 640;
    /// Depth frame height
    pub const HEIGHT: u32 = 480;

    /// Sensor depth range limits (millimeters)
    pub const DEPTH_MIN_MM: u16 = 400;
    pub const DEPTH_MAX_MM: u16 = 4000;
}

/// Invalid depth marker value
pub const DEPTH_INVALID_MM: u16 = 0;

/// Default matching distance between frames for 2D touches (mm)
pub const TRACK_NEAR_DIST_2D: f32 = 30.0;
/// Default matching distance between frames for 3D touches (mm)
///
/// Hands above the surface are noisier than fingers on it.
pub const TRACK_NEAR_DIST_3D: f32 = 70.0;

/// Height of the band above the surface counted as touching (mm)
pub const TOUCH_BAND_2D_MM: f32 = 15.0;
/// Maximum height above the surface for 3D candidates (mm)
pub const MAX_HEIGHT_3D_MM: f32 = 300.0;

/// Default producer cadence (one application frame at 30 fps)
pub const FRAME_INTERVAL_MS: u64 = 33;

/// Dot products below this are treated as a ray parallel to a plane
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Name used for the configuration directory
pub const APP_NAME: &str = "procam-touch";

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_distances() {
        // 3D tracking tolerates more noise than touches on the surface
        assert!(TRACK_NEAR_DIST_3D > TRACK_NEAR_DIST_2D);
    }

    #[test]
    fn test_depth_range() {
        assert!(kinect::DEPTH_MIN_MM < kinect::DEPTH_MAX_MM);
        assert!(DEPTH_INVALID_MM < kinect::DEPTH_MIN_MM);
    }
}
