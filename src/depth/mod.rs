// SPDX-License-Identifier: GPL-3.0-only

//! Per-pixel depth state shared by detection and projection
//!
//! [`DepthData`] is the frame buffer of the touch pipeline. Each update
//! overwrites every array wholesale from one depth/color pair: sensor-space
//! positions, projected positions, colors and the lists of samples valid for
//! 2D and 3D detection. Samples are never mutated individually.

use crate::backends::{ColorFrame, DepthFrame};
use crate::calibration::PlaneAndProjectionCalibration;
use crate::config::SensorSettings;
use crate::constants::DEPTH_INVALID_MM;
use crate::errors::{TouchError, TouchResult};
use crate::geometry::{Vec3, transform_point};
use tracing::trace;

/// One depth sample, copied out of [`DepthData`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthDataElement {
    /// Offset of the sample in the depth frame
    pub offset: usize,
    /// Position in sensor space (mm)
    pub sensor_point: Vec3,
    /// Normalized projector x/y, height above the surface as z
    pub projected_point: Vec3,
    /// Opaque 0xAARRGGBB, 0 when the color camera does not see the sample
    pub color: u32,
}

/// Buffer offset in the color frame of a sensor-space point
pub fn find_color_offset(sensor: &SensorSettings, point: &Vec3) -> Option<usize> {
    let in_color = transform_point(&sensor.depth_to_color, point);
    sensor.color.pixel_offset(&in_color)
}

#[derive(Debug, Clone)]
pub struct DepthData {
    width: u32,
    height: u32,
    sensor_points: Vec<Vec3>,
    projected_points: Vec<Vec3>,
    point_colors: Vec<u32>,
    valid: Vec<bool>,
    valid_points_2d: Vec<usize>,
    valid_points_3d: Vec<usize>,
    timestamp_ms: u64,
    frames: u64,
}

impl DepthData {
    /// Empty buffer for the depth frame size of `sensor`
    pub fn new(sensor: &SensorSettings) -> Self {
        let count = sensor.depth.pixel_count();
        Self {
            width: sensor.depth.width,
            height: sensor.depth.height,
            sensor_points: vec![Vec3::zeros(); count],
            projected_points: vec![Vec3::zeros(); count],
            point_colors: vec![0; count],
            valid: vec![false; count],
            valid_points_2d: Vec::new(),
            valid_points_3d: Vec::new(),
            timestamp_ms: 0,
            frames: 0,
        }
    }

    /// Overwrite the buffer from a new depth/color pair
    ///
    /// Frames whose size does not match the sensor model are rejected before
    /// anything is written.
    pub fn update(
        &mut self,
        depth: &DepthFrame,
        color: &ColorFrame,
        sensor: &SensorSettings,
        calibration: &PlaneAndProjectionCalibration,
        max_height_3d: f32,
        timestamp_ms: u64,
    ) -> TouchResult<()> {
        if depth.width != self.width || depth.height != self.height || !depth.is_complete() {
            return Err(TouchError::Config(format!(
                "depth frame {:?} does not match sensor {}x{}",
                depth, self.width, self.height
            )));
        }
        if !color.is_complete() {
            return Err(TouchError::Config(format!("incomplete color frame {:?}", color)));
        }

        self.valid_points_2d.clear();
        self.valid_points_3d.clear();

        for y in 0..self.height {
            for x in 0..self.width {
                let offset = (y * self.width + x) as usize;
                let raw = depth.data[offset];

                if raw == DEPTH_INVALID_MM || raw < sensor.min_depth_mm || raw > sensor.max_depth_mm
                {
                    self.clear_sample(offset);
                    continue;
                }

                let point = sensor.depth.unproject(x as f32, y as f32, raw as f32);
                let projected = calibration.project(&point);
                // Samples the homography sends to infinity
                if !projected.iter().all(|v| v.is_finite()) {
                    self.clear_sample(offset);
                    continue;
                }

                self.valid[offset] = true;
                self.sensor_points[offset] = point;
                self.projected_points[offset] = projected;
                self.point_colors[offset] = find_color_offset(sensor, &point)
                    .and_then(|c| color.packed_argb(c))
                    .unwrap_or(0);

                let height = projected.z;
                if calibration.plane.has_good_distance(&point) {
                    self.valid_points_2d.push(offset);
                }
                if height > 0.0 && height <= max_height_3d {
                    self.valid_points_3d.push(offset);
                }
            }
        }

        self.timestamp_ms = timestamp_ms;
        self.frames += 1;

        trace!(
            valid_2d = self.valid_points_2d.len(),
            valid_3d = self.valid_points_3d.len(),
            timestamp_ms,
            "Depth data updated"
        );
        Ok(())
    }

    fn clear_sample(&mut self, offset: usize) {
        self.valid[offset] = false;
        self.sensor_points[offset] = Vec3::zeros();
        self.projected_points[offset] = Vec3::zeros();
        self.point_colors[offset] = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of successful updates
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn is_valid(&self, offset: usize) -> bool {
        self.valid.get(offset).copied().unwrap_or(false)
    }

    pub fn sensor_point(&self, offset: usize) -> Vec3 {
        self.sensor_points[offset]
    }

    pub fn projected_point(&self, offset: usize) -> Vec3 {
        self.projected_points[offset]
    }

    pub fn color(&self, offset: usize) -> u32 {
        self.point_colors[offset]
    }

    /// Samples inside the touch band, in scan order
    pub fn valid_points_2d(&self) -> &[usize] {
        &self.valid_points_2d
    }

    /// Samples above the surface up to the 3D height limit, in scan order
    pub fn valid_points_3d(&self) -> &[usize] {
        &self.valid_points_3d
    }

    pub fn element(&self, offset: usize) -> DepthDataElement {
        DepthDataElement {
            offset,
            sensor_point: self.sensor_points[offset],
            projected_point: self.projected_points[offset],
            color: self.point_colors[offset],
        }
    }
}
