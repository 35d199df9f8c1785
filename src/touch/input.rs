// SPDX-License-Identifier: GPL-3.0-only

//! Depth-camera touch input
//!
//! [`TouchInput`] owns the pipeline state behind two guards:
//!
//! - the **depth guard** around [`DepthData`] and the detectors. An update
//!   holds it for the whole overwrite + detection of one frame, so nobody
//!   sees a half-written frame.
//! - the **touch-point guard** around the tracked lists. Tracking takes it
//!   only to merge one frame's candidates; projections take it for one full
//!   traversal of the lists.
//!
//! No path holds both guards at once: an update releases the depth guard
//! before it takes the touch-point guard. Holding [`TouchInput::lock`] while
//! calling the depth readers is therefore safe. A third guard serializes
//! whole update cycles so candidates are merged in frame order; consumers
//! never take it.

use super::detection::{DetectionMode, TouchDetection};
use super::point::{Touch, TouchCandidate, TrackedPoint};
use super::tracker::PointTracker;
use crate::backends::{CaptureLoopController, ColorFrame, FrameSource, LoopAction};
use crate::calibration::{PlaneAndProjectionCalibration, PlanarTouchCalibration};
use crate::config::{Config, SensorSettings};
use crate::depth::{DepthData, DepthDataElement, find_color_offset};
use crate::errors::{FrameKind, TouchError, TouchResult};
use crate::geometry::Vec3;
use crate::projection::{DepthPoint, ProjectorDisplay, Screen, ScreenProjector};
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

struct DepthState {
    data: DepthData,
    detection_2d: TouchDetection,
    detection_3d: TouchDetection,
}

/// Tracked points handed to consumers
#[derive(Debug, Default)]
pub struct TouchPoints {
    points_2d: Vec<TrackedPoint>,
    points_3d: Vec<TrackedPoint>,
    tracker: PointTracker,
}

impl TouchPoints {
    pub fn points_2d(&self) -> &[TrackedPoint] {
        &self.points_2d
    }

    pub fn points_3d(&self) -> &[TrackedPoint] {
        &self.points_3d
    }

    /// 2D points followed by 3D points
    pub fn iter(&self) -> impl Iterator<Item = &TrackedPoint> {
        self.points_2d.iter().chain(self.points_3d.iter())
    }
}

/// The touch-point guard held across several reads
///
/// Tracking is blocked while it is alive; dropping it unlocks.
pub struct TouchPointsGuard<'a> {
    guard: MutexGuard<'a, TouchPoints>,
}

impl Deref for TouchPointsGuard<'_> {
    type Target = TouchPoints;

    fn deref(&self) -> &TouchPoints {
        &self.guard
    }
}

/// Touch detection and tracking fed by a depth camera
pub struct TouchInput {
    sensor: SensorSettings,
    calibration: PlaneAndProjectionCalibration,
    max_height_3d: f32,
    /// Held for a whole update cycle, by producers only
    cycle: Mutex<()>,
    depth: Mutex<DepthState>,
    touch_points: Mutex<TouchPoints>,
    precision_2d: AtomicUsize,
    precision_3d: AtomicUsize,
    use_raw_depth: AtomicBool,
    compute_outsiders: AtomicBool,
    started: Instant,
}

impl TouchInput {
    pub fn new(config: &Config) -> TouchResult<Self> {
        config.validate()?;

        info!(
            width = config.sensor.depth.width,
            height = config.sensor.depth.height,
            precision_2d = config.precision_2d,
            precision_3d = config.precision_3d,
            "Creating touch input"
        );

        Ok(Self {
            sensor: config.sensor,
            calibration: config.calibration,
            max_height_3d: config.max_height_3d,
            cycle: Mutex::new(()),
            depth: Mutex::new(DepthState {
                data: DepthData::new(&config.sensor),
                detection_2d: TouchDetection::new(DetectionMode::Surface, config.touch_2d),
                detection_3d: TouchDetection::new(DetectionMode::Volume, config.touch_3d),
            }),
            touch_points: Mutex::new(TouchPoints::default()),
            precision_2d: AtomicUsize::new(config.precision_2d),
            precision_3d: AtomicUsize::new(config.precision_3d),
            use_raw_depth: AtomicBool::new(config.use_raw_depth),
            compute_outsiders: AtomicBool::new(config.compute_outsiders),
            started: Instant::now(),
        })
    }

    fn lock_depth(&self) -> TouchResult<MutexGuard<'_, DepthState>> {
        self.depth.lock().map_err(|_| {
            error!("Depth data guard poisoned");
            TouchError::Interrupted("depth data")
        })
    }

    fn lock_points(&self) -> TouchResult<MutexGuard<'_, TouchPoints>> {
        self.touch_points.lock().map_err(|_| {
            error!("Touch point guard poisoned");
            TouchError::Interrupted("touch points")
        })
    }

    // ===== Producer side =====

    /// Run one cycle, timestamped with the time since creation
    pub fn update(&self, source: &dyn FrameSource) -> TouchResult<()> {
        self.update_at(source, self.started.elapsed().as_millis() as u64)
    }

    /// Run one cycle: refresh depth data, detect, track
    ///
    /// Detection runs under the depth guard, tracking under the touch-point
    /// guard, one after the other.
    ///
    /// A missing depth or color frame returns early without touching any
    /// state; tracked points stay as they were and age out on later cycles.
    pub fn update_at(&self, source: &dyn FrameSource, timestamp_ms: u64) -> TouchResult<()> {
        let depth = source
            .depth_frame()
            .ok_or(TouchError::MissingFrame(FrameKind::Depth))?;
        let color = source
            .color_frame()
            .ok_or(TouchError::MissingFrame(FrameKind::Color))?;

        let precision_2d = self.precision_2d();
        let precision_3d = self.precision_3d();

        let _cycle = self.cycle.lock().map_err(|_| {
            error!("Update cycle guard poisoned");
            TouchError::Interrupted("update cycle")
        })?;

        let (candidates_2d, candidates_3d, distance_2d, distance_3d) = {
            let mut state = self.lock_depth()?;
            let state = &mut *state;
            state.data.update(
                &depth,
                &color,
                &self.sensor,
                &self.calibration,
                self.max_height_3d,
                timestamp_ms,
            )?;

            (
                (precision_2d > 0).then(|| state.detection_2d.compute(&state.data, precision_2d)),
                (precision_3d > 0).then(|| state.detection_3d.compute(&state.data, precision_3d)),
                state.detection_2d.calibration().tracking_max_distance,
                state.detection_3d.calibration().tracking_max_distance,
            )
        };

        if candidates_2d.is_none() && candidates_3d.is_none() {
            return Ok(());
        }

        let mut points = self.lock_points()?;
        let points = &mut *points;
        if let Some(candidates) = candidates_2d {
            points.tracker.track_points(
                &mut points.points_2d,
                &candidates,
                timestamp_ms,
                distance_2d,
            );
        }
        if let Some(candidates) = candidates_3d {
            points.tracker.track_points(
                &mut points.points_3d,
                &candidates,
                timestamp_ms,
                distance_3d,
            );
        }

        debug!(
            timestamp_ms,
            tracked_2d = points.points_2d.len(),
            tracked_3d = points.points_3d.len(),
            "Touch input updated"
        );
        Ok(())
    }

    /// Run [`update`](Self::update) on its own thread, once per `interval`
    pub fn spawn_capture(
        self: &Arc<Self>,
        source: Arc<dyn FrameSource>,
        interval: Duration,
    ) -> CaptureLoopController {
        let input = Arc::clone(self);
        let name = format!("touch-capture-{}", source.name());

        CaptureLoopController::start(&name, interval, move || {
            match input.update(source.as_ref()) {
                Ok(()) => {}
                Err(TouchError::MissingFrame(kind)) => {
                    debug!(%kind, "Frame not available, skipping cycle");
                }
                Err(e) => warn!(error = %e, "Touch update failed, skipping cycle"),
            }
            LoopAction::Continue
        })
    }

    // ===== Consumer side =====

    fn projector(&self) -> ScreenProjector {
        ScreenProjector::new(self.use_raw_depth(), self.compute_outsiders())
    }

    /// Tracked points of both lists as touches on `screen`
    ///
    /// Points that do not project onto the screen are skipped.
    pub fn project_touch_to_screen(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
    ) -> TouchResult<Vec<Touch>> {
        let projector = self.projector();
        let points = self.lock_points()?;
        Ok(points
            .iter()
            .filter_map(|tp| create_touch(&projector, screen, display, tp))
            .collect())
    }

    /// Project one depth sample onto `screen`
    pub fn project_point_to_screen(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
        element: &DepthDataElement,
    ) -> Option<Vec3> {
        self.projector().project(
            screen,
            display,
            &element.sensor_point,
            &element.projected_point,
        )
    }

    /// Every sample valid for 3D detection in the current frame
    pub fn depth_data(&self) -> TouchResult<Vec<DepthDataElement>> {
        let state = self.lock_depth()?;
        Ok(state
            .data
            .valid_points_3d()
            .iter()
            .map(|&offset| state.data.element(offset))
            .collect())
    }

    /// 2D-valid samples followed by 3D-valid samples, on `screen`
    pub fn project_depth_data(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
    ) -> TouchResult<Vec<DepthPoint>> {
        let mut points = self.project_depth_data_2d(screen, display)?;
        points.extend(self.project_depth_data_3d(screen, display)?);
        Ok(points)
    }

    pub fn project_depth_data_2d(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
    ) -> TouchResult<Vec<DepthPoint>> {
        self.project_depth_data_mode(screen, display, DetectionMode::Surface)
    }

    pub fn project_depth_data_3d(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
    ) -> TouchResult<Vec<DepthPoint>> {
        self.project_depth_data_mode(screen, display, DetectionMode::Volume)
    }

    fn project_depth_data_mode(
        &self,
        screen: &Screen,
        display: &ProjectorDisplay,
        mode: DetectionMode,
    ) -> TouchResult<Vec<DepthPoint>> {
        let projector = self.projector();
        let state = self.lock_depth()?;
        let data = &state.data;
        let offsets = match mode {
            DetectionMode::Surface => data.valid_points_2d(),
            DetectionMode::Volume => data.valid_points_3d(),
        };

        Ok(offsets
            .iter()
            .filter_map(|&offset| {
                let p = projector.project(
                    screen,
                    display,
                    &data.sensor_point(offset),
                    &data.projected_point(offset),
                )?;
                Some(DepthPoint {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    color: data.color(offset),
                })
            })
            .collect())
    }

    /// 2D candidates of the current frame, without tracking
    ///
    /// # Panics
    ///
    /// When `precision` is 0.
    pub fn find_2d_touch_raw(&self, precision: usize) -> TouchResult<Vec<TouchCandidate>> {
        assert!(precision > 0, "raw 2D detection needs a precision above 0");
        let mut state = self.lock_depth()?;
        let state = &mut *state;
        Ok(state.detection_2d.compute(&state.data, precision))
    }

    /// 3D candidates of the current frame, without tracking
    ///
    /// # Panics
    ///
    /// When `precision` is 0.
    pub fn find_3d_touch_raw(&self, precision: usize) -> TouchResult<Vec<TouchCandidate>> {
        assert!(precision > 0, "raw 3D detection needs a precision above 0");
        let mut state = self.lock_depth()?;
        let state = &mut *state;
        Ok(state.detection_3d.compute(&state.data, precision))
    }

    /// Color each tracked 2D point with the color camera pixel it lies on
    pub fn update_touch_colors_2d(&self, color: &ColorFrame) -> TouchResult<()> {
        let mut points = self.lock_points()?;
        for tp in points.points_2d.iter_mut() {
            tp.color = find_color_offset(&self.sensor, &tp.sensor_position)
                .and_then(|offset| color.packed_argb(offset));
        }
        Ok(())
    }

    /// Snapshot of the tracked 2D points
    pub fn touch_points_2d(&self) -> TouchResult<Vec<TrackedPoint>> {
        Ok(self.lock_points()?.points_2d.clone())
    }

    /// Snapshot of the tracked 3D points
    pub fn touch_points_3d(&self) -> TouchResult<Vec<TrackedPoint>> {
        Ok(self.lock_points()?.points_3d.clone())
    }

    /// Hold the touch-point guard across several reads
    ///
    /// Tracking waits until the guard is dropped. The depth readers
    /// ([`depth_data`](Self::depth_data), the `project_depth_data*` family and
    /// the raw finders) may still be called meanwhile. Calling a method that
    /// takes the touch-point guard itself from the same thread would deadlock.
    pub fn lock(&self) -> TouchResult<TouchPointsGuard<'_>> {
        Ok(TouchPointsGuard {
            guard: self.lock_points()?,
        })
    }

    // ===== Settings =====

    pub fn set_precision(&self, precision_2d: usize, precision_3d: usize) {
        self.set_precision_2d(precision_2d);
        self.set_precision_3d(precision_3d);
    }

    /// Candidate cap for 2D detection, 0 disables it
    pub fn set_precision_2d(&self, precision: usize) {
        self.precision_2d.store(precision, Ordering::Relaxed);
    }

    /// Candidate cap for 3D detection, 0 disables it
    pub fn set_precision_3d(&self, precision: usize) {
        self.precision_3d.store(precision, Ordering::Relaxed);
    }

    pub fn precision_2d(&self) -> usize {
        self.precision_2d.load(Ordering::Relaxed)
    }

    pub fn precision_3d(&self) -> usize {
        self.precision_3d.load(Ordering::Relaxed)
    }

    pub fn set_use_raw_depth(&self, enabled: bool) {
        self.use_raw_depth.store(enabled, Ordering::Relaxed);
    }

    pub fn use_raw_depth(&self) -> bool {
        self.use_raw_depth.load(Ordering::Relaxed)
    }

    pub fn set_compute_outsiders(&self, enabled: bool) {
        self.compute_outsiders.store(enabled, Ordering::Relaxed);
    }

    pub fn compute_outsiders(&self) -> bool {
        self.compute_outsiders.load(Ordering::Relaxed)
    }

    /// Replace the thresholds of one detection mode
    pub fn set_touch_calibration(
        &self,
        mode: DetectionMode,
        calibration: PlanarTouchCalibration,
    ) -> TouchResult<()> {
        calibration.validate().map_err(TouchError::Config)?;
        let mut state = self.lock_depth()?;
        match mode {
            DetectionMode::Surface => state.detection_2d.set_calibration(calibration),
            DetectionMode::Volume => state.detection_3d.set_calibration(calibration),
        }
        Ok(())
    }

    pub fn calibration(&self) -> &PlaneAndProjectionCalibration {
        &self.calibration
    }

    pub fn sensor(&self) -> &SensorSettings {
        &self.sensor
    }
}

fn create_touch(
    projector: &ScreenProjector,
    screen: &Screen,
    display: &ProjectorDisplay,
    tp: &TrackedPoint,
) -> Option<Touch> {
    let position = projector.project(screen, display, &tp.sensor_position, &tp.position)?;
    let previous_position = projector
        .project(
            screen,
            display,
            &tp.previous_sensor_position,
            &tp.previous_position,
        )
        .unwrap_or(position);

    Some(Touch {
        id: tp.id,
        position,
        previous_position,
        is_ghost: tp.is_ghost(),
        is_3d: tp.is_3d,
        point: tp.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Finger, SyntheticSource};
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

    fn setup(fingers: Vec<Finger>) -> (TouchInput, SyntheticSource) {
        let source = SyntheticSource::new(device(), 1000).with_fingers(fingers);
        let mut config = Config::default();
        config.sensor.depth = device();
        config.sensor.color = device();
        config.calibration = source.calibration();
        config.precision_2d = 5;
        config.precision_3d = 0;
        (TouchInput::new(&config).unwrap(), source)
    }

    #[test]
    fn test_missing_frame_leaves_state_untouched() {
        let (input, source) = setup(vec![Finger::touching(20.5, 20.5)]);
        input.update_at(&source, 0).unwrap();
        let before = input.touch_points_2d().unwrap();
        assert_eq!(before.len(), 1);

        source.set_available(false);
        assert_eq!(
            input.update_at(&source, 33),
            Err(TouchError::MissingFrame(FrameKind::Depth))
        );
        assert_eq!(input.touch_points_2d().unwrap(), before);
    }

    #[test]
    fn test_disabled_modes_do_not_track() {
        let (input, source) = setup(vec![Finger::touching(20.5, 20.5)]);
        input.set_precision(0, 0);
        input.update_at(&source, 0).unwrap();
        assert!(input.touch_points_2d().unwrap().is_empty());
        assert!(input.touch_points_3d().unwrap().is_empty());
        // Depth data is still refreshed for exports
        assert!(!input.depth_data().unwrap().is_empty());
    }

    #[test]
    fn test_touch_colors() {
        let (input, source) = setup(vec![Finger::touching(20.5, 20.5)]);
        input.update_at(&source, 0).unwrap();
        input
            .update_touch_colors_2d(&source.color_frame().unwrap())
            .unwrap();
        let points = input.touch_points_2d().unwrap();
        assert_eq!(points[0].color, Some(0xFFDC_2828));
    }

    #[test]
    fn test_raw_detection_does_not_track() {
        let (input, source) = setup(vec![Finger::touching(20.5, 20.5)]);
        input.set_precision(0, 0);
        input.update_at(&source, 0).unwrap();
        assert_eq!(input.find_2d_touch_raw(3).unwrap().len(), 1);
        assert_eq!(input.find_3d_touch_raw(3).unwrap().len(), 1);
        assert!(input.touch_points_2d().unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "precision above 0")]
    fn test_raw_detection_rejects_zero_precision() {
        let (input, _) = setup(Vec::new());
        let _ = input.find_2d_touch_raw(0);
    }

    #[test]
    fn test_lock_guard_reads_both_lists() {
        let (input, source) = setup(vec![Finger::hovering(40.5, 30.5, 80.0)]);
        input.set_precision(0, 2);
        input.update_at(&source, 0).unwrap();
        let guard = input.lock().unwrap();
        assert!(guard.points_2d().is_empty());
        assert_eq!(guard.points_3d().len(), 1);
        assert_eq!(guard.iter().count(), 1);
    }

    #[test]
    fn test_poisoned_guards_are_named() {
        let (input, source) = setup(vec![Finger::touching(20.5, 20.5)]);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _points = input.touch_points.lock().unwrap();
            panic!("tracking panicked");
        }));

        assert_eq!(
            input.touch_points_2d(),
            Err(TouchError::Interrupted("touch points"))
        );
        assert_eq!(
            input.update_at(&source, 0),
            Err(TouchError::Interrupted("touch points"))
        );
        // The depth guard is unaffected
        assert!(input.depth_data().is_ok());
    }

    #[test]
    fn test_rejects_invalid_calibration() {
        let (input, _) = setup(Vec::new());
        let mut calibration = PlanarTouchCalibration::default_2d();
        calibration.search_depth = 0;
        assert!(matches!(
            input.set_touch_calibration(DetectionMode::Surface, calibration),
            Err(TouchError::Config(_))
        ));
    }
}
