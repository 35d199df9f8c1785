// SPDX-License-Identifier: GPL-3.0-only

//! Touch candidate extraction
//!
//! Both modes grow connected regions out of the samples their validity list
//! admits, drop regions below the minimum size and reduce each region to one
//! candidate. They differ in what counts as connected and in the reduction:
//!
//! | Mode | Samples | Connected when | Candidate |
//! |------|---------|----------------|-----------|
//! | 2D | inside the touch band | within `search_depth` pixels and heights within `maximum_distance` | region centroid |
//! | 3D | up to the 3D height limit | within `search_depth` pixels and `maximum_distance` mm in sensor space | lowest sample (the tip) |
//!
//! Detection only reads [`DepthData`]; the scratch buffers live here.

use super::point::TouchCandidate;
use crate::calibration::PlanarTouchCalibration;
use crate::depth::DepthData;
use crate::geometry::Vec3;
use std::collections::VecDeque;
use tracing::trace;

/// Which samples and which metric a detector uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionMode {
    /// Touches on the surface
    Surface,
    /// Points above the surface
    Volume,
}

impl DetectionMode {
    pub fn is_3d(&self) -> bool {
        matches!(self, DetectionMode::Volume)
    }
}

/// Connected-region touch detector for one mode
#[derive(Debug)]
pub struct TouchDetection {
    mode: DetectionMode,
    calibration: PlanarTouchCalibration,
    /// Stamp of the pass in which an offset was in the validity list
    member: Vec<u32>,
    /// Stamp of the pass in which an offset was assigned to a region
    visited: Vec<u32>,
    pass: u32,
}

impl TouchDetection {
    pub fn new(mode: DetectionMode, calibration: PlanarTouchCalibration) -> Self {
        Self {
            mode,
            calibration,
            member: Vec::new(),
            visited: Vec::new(),
            pass: 0,
        }
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    pub fn calibration(&self) -> &PlanarTouchCalibration {
        &self.calibration
    }

    pub fn set_calibration(&mut self, calibration: PlanarTouchCalibration) {
        self.calibration = calibration;
    }

    /// Extract at most `precision` candidates, largest regions first
    ///
    /// # Panics
    ///
    /// When `precision` is 0: a disabled mode must not be run.
    pub fn compute(&mut self, data: &DepthData, precision: usize) -> Vec<TouchCandidate> {
        assert!(precision > 0, "{:?} detection run with precision 0", self.mode);

        let samples = match self.mode {
            DetectionMode::Surface => data.valid_points_2d(),
            DetectionMode::Volume => data.valid_points_3d(),
        };
        self.begin_pass(data, samples);

        let mut candidates = Vec::new();
        let mut region = Vec::new();
        for &seed in samples {
            if self.visited[seed] == self.pass {
                continue;
            }
            self.grow_region(data, seed, &mut region);
            if region.len() < self.calibration.minimum_component_size as usize {
                continue;
            }
            candidates.push(self.reduce(data, &region));
        }

        // Stable: equal sizes keep scan order
        candidates.sort_by(|a, b| b.size.cmp(&a.size));
        candidates.truncate(precision);

        trace!(
            mode = ?self.mode,
            samples = samples.len(),
            candidates = candidates.len(),
            "Touch detection pass"
        );
        candidates
    }

    fn begin_pass(&mut self, data: &DepthData, samples: &[usize]) {
        let count = data.width() as usize * data.height() as usize;
        if self.member.len() != count {
            self.member = vec![0; count];
            self.visited = vec![0; count];
            self.pass = 0;
        }
        self.pass = self.pass.wrapping_add(1);
        if self.pass == 0 {
            // Stamps wrapped; old stamps could collide with the new pass
            self.member.fill(0);
            self.visited.fill(0);
            self.pass = 1;
        }
        for &offset in samples {
            self.member[offset] = self.pass;
        }
    }

    /// Breadth-first growth from `seed`, bounded by `maximum_recursion` steps
    fn grow_region(&mut self, data: &DepthData, seed: usize, region: &mut Vec<usize>) {
        region.clear();
        let width = data.width() as i64;
        let height = data.height() as i64;
        let radius = self.calibration.search_depth.max(1) as i64;
        let max_steps = self.calibration.maximum_recursion;

        let mut queue = VecDeque::new();
        self.visited[seed] = self.pass;
        queue.push_back((seed, 0u32));

        while let Some((offset, steps)) = queue.pop_front() {
            region.push(offset);
            if steps >= max_steps {
                continue;
            }

            let x = (offset as i64) % width;
            let y = (offset as i64) / width;
            for ny in (y - radius).max(0)..=(y + radius).min(height - 1) {
                for nx in (x - radius).max(0)..=(x + radius).min(width - 1) {
                    let neighbour = (ny * width + nx) as usize;
                    if self.member[neighbour] != self.pass || self.visited[neighbour] == self.pass
                    {
                        continue;
                    }
                    if !self.connected(data, offset, neighbour) {
                        continue;
                    }
                    self.visited[neighbour] = self.pass;
                    queue.push_back((neighbour, steps + 1));
                }
            }
        }
    }

    fn connected(&self, data: &DepthData, a: usize, b: usize) -> bool {
        let max = self.calibration.maximum_distance;
        match self.mode {
            DetectionMode::Surface => {
                (data.projected_point(a).z - data.projected_point(b).z).abs() <= max
            }
            DetectionMode::Volume => (data.sensor_point(a) - data.sensor_point(b)).norm() <= max,
        }
    }

    fn reduce(&self, data: &DepthData, region: &[usize]) -> TouchCandidate {
        match self.mode {
            DetectionMode::Surface => {
                let n = region.len() as f32;
                let mut position = Vec3::zeros();
                let mut sensor_position = Vec3::zeros();
                for &offset in region {
                    position += data.projected_point(offset);
                    sensor_position += data.sensor_point(offset);
                }
                position /= n;
                sensor_position /= n;

                // Representative sample: the one closest to the centroid
                let source_offset = region
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let da = (data.sensor_point(a) - sensor_position).norm_squared();
                        let db = (data.sensor_point(b) - sensor_position).norm_squared();
                        da.total_cmp(&db).then(a.cmp(&b))
                    })
                    .unwrap_or(region[0]);

                TouchCandidate {
                    position,
                    sensor_position,
                    source_offset,
                    size: region.len(),
                    is_3d: false,
                }
            }
            DetectionMode::Volume => {
                let tip = region
                    .iter()
                    .copied()
                    .min_by(|&a, &b| {
                        let ha = data.projected_point(a).z;
                        let hb = data.projected_point(b).z;
                        ha.total_cmp(&hb).then(a.cmp(&b))
                    })
                    .unwrap_or(region[0]);

                TouchCandidate {
                    position: data.projected_point(tip),
                    sensor_position: data.sensor_point(tip),
                    source_offset: tip,
                    size: region.len(),
                    is_3d: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Finger, FrameSource, SyntheticSource};
    use crate::config::SensorSettings;
    use crate::geometry::ProjectiveDevice;

    fn device() -> ProjectiveDevice {
        ProjectiveDevice {
            fx: 100.0,
            fy: 100.0,
            cx: 32.0,
            cy: 24.0,
            width: 64,
            height: 48,
        }
    }

    fn data_for(fingers: Vec<Finger>) -> DepthData {
        let source = SyntheticSource::new(device(), 1000).with_fingers(fingers);
        let sensor = SensorSettings {
            depth: device(),
            color: device(),
            ..SensorSettings::default()
        };
        let mut data = DepthData::new(&sensor);
        data.update(
            &source.depth_frame().unwrap(),
            &source.color_frame().unwrap(),
            &sensor,
            &source.calibration(),
            300.0,
            0,
        )
        .unwrap();
        data
    }

    #[test]
    fn test_surface_candidates_at_finger_centroids() {
        let data = data_for(vec![Finger::touching(10.5, 10.5), Finger::touching(40.5, 30.5)]);
        let mut detection =
            TouchDetection::new(DetectionMode::Surface, PlanarTouchCalibration::default_2d());
        let candidates = detection.compute(&data, 5);

        assert_eq!(candidates.len(), 2);
        for c in &candidates {
            assert!(!c.is_3d);
            assert!((c.position.z - 8.0).abs() < 1e-3);
        }
        let near_first = candidates.iter().any(|c| {
            (c.position.x - 10.0 / 64.0).abs() < 1e-3 && (c.position.y - 10.0 / 48.0).abs() < 1e-3
        });
        assert!(near_first);
    }

    #[test]
    fn test_precision_caps_candidates() {
        let data = data_for(vec![
            Finger::touching(10.0, 10.0),
            Finger::touching(30.0, 10.0),
            Finger::touching(50.0, 10.0),
        ]);
        let mut detection =
            TouchDetection::new(DetectionMode::Surface, PlanarTouchCalibration::default_2d());
        assert_eq!(detection.compute(&data, 2).len(), 2);
        assert_eq!(detection.compute(&data, 10).len(), 3);
    }

    #[test]
    fn test_volume_ignores_nothing_above_surface() {
        let data = data_for(vec![Finger::touching(10.0, 10.0), Finger::hovering(40.0, 30.0, 120.0)]);

        let mut surface =
            TouchDetection::new(DetectionMode::Surface, PlanarTouchCalibration::default_2d());
        assert_eq!(surface.compute(&data, 5).len(), 1);

        let mut volume =
            TouchDetection::new(DetectionMode::Volume, PlanarTouchCalibration::default_3d());
        let candidates = volume.compute(&data, 5);
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.is_3d));
        assert!(candidates.iter().any(|c| (c.position.z - 120.0).abs() < 1e-2));
    }

    #[test]
    fn test_small_regions_are_noise() {
        let mut tiny = Finger::touching(10.0, 10.0);
        tiny.radius = 0.8;
        let data = data_for(vec![tiny]);
        let mut calibration = PlanarTouchCalibration::default_2d();
        calibration.minimum_component_size = 5;
        let mut detection = TouchDetection::new(DetectionMode::Surface, calibration);
        assert!(detection.compute(&data, 5).is_empty());
    }

    #[test]
    fn test_detection_is_repeatable() {
        let data = data_for(vec![Finger::hovering(20.0, 20.0, 60.0)]);
        let mut detection =
            TouchDetection::new(DetectionMode::Volume, PlanarTouchCalibration::default_3d());
        let first = detection.compute(&data, 3);
        let second = detection.compute(&data, 3);
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "precision 0")]
    fn test_zero_precision_is_a_bug() {
        let data = data_for(Vec::new());
        let mut detection =
            TouchDetection::new(DetectionMode::Surface, PlanarTouchCalibration::default_2d());
        detection.compute(&data, 0);
    }
}
