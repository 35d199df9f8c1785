// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use procam_touch::constants::{self, kinect};
use procam_touch::geometry::ProjectiveDevice;

#[test]
fn test_default_device_uses_kinect_intrinsics() {
    let device = ProjectiveDevice::default();
    assert_eq!(device.fx, kinect::FX);
    assert_eq!(device.fy, kinect::FY);
    assert_eq!(device.width, kinect::WIDTH);
    assert_eq!(device.height, kinect::HEIGHT);
}

#[test]
fn test_principal_point_inside_frame() {
    assert!(kinect::CX > 0.0 && kinect::CX < kinect::WIDTH as f32);
    assert!(kinect::CY > 0.0 && kinect::CY < kinect::HEIGHT as f32);
}

#[test]
fn test_touch_band_below_volume_limit() {
    assert!(constants::TOUCH_BAND_2D_MM < constants::MAX_HEIGHT_3D_MM);
}

#[test]
fn test_version_is_set() {
    assert!(!constants::app_info::version().is_empty());
}
