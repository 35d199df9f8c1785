// SPDX-License-Identifier: GPL-3.0-only

//! Touch candidates, tracked points and projected touches

use crate::geometry::Vec3;
use std::fmt;

/// Identity of a tracked point, never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TouchId(pub u64);

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A detection in the current frame, before it has an identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchCandidate {
    /// Normalized projector x/y, height above the surface as z
    pub position: Vec3,
    /// Position in sensor space (mm)
    pub sensor_position: Vec3,
    /// Depth frame offset of the representative sample
    pub source_offset: usize,
    /// Number of samples in the region
    pub size: usize,
    pub is_3d: bool,
}

/// A detection with an identity that persists across frames
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPoint {
    pub id: TouchId,
    /// Normalized projector x/y, height above the surface as z
    pub position: Vec3,
    /// `position` at the previous successful match
    pub previous_position: Vec3,
    pub sensor_position: Vec3,
    pub previous_sensor_position: Vec3,
    pub source_offset: usize,
    pub is_3d: bool,
    /// Unmatched in the last cycle; removed on the next one
    pub marked_for_removal: bool,
    /// Opaque 0xAARRGGBB, set on request
    pub color: Option<u32>,
    pub created_at_ms: u64,
    pub last_seen_ms: u64,
    /// Number of frames the point was matched, creation included
    pub matched_frames: u32,
}

impl TrackedPoint {
    /// New point; the previous position starts equal to the current one
    pub fn from_candidate(id: TouchId, candidate: &TouchCandidate, timestamp_ms: u64) -> Self {
        Self {
            id,
            position: candidate.position,
            previous_position: candidate.position,
            sensor_position: candidate.sensor_position,
            previous_sensor_position: candidate.sensor_position,
            source_offset: candidate.source_offset,
            is_3d: candidate.is_3d,
            marked_for_removal: false,
            color: None,
            created_at_ms: timestamp_ms,
            last_seen_ms: timestamp_ms,
            matched_frames: 1,
        }
    }

    /// Move to a matched candidate, keeping the old position as previous
    pub fn update_from(&mut self, candidate: &TouchCandidate, timestamp_ms: u64) {
        self.previous_position = self.position;
        self.previous_sensor_position = self.sensor_position;
        self.position = candidate.position;
        self.sensor_position = candidate.sensor_position;
        self.source_offset = candidate.source_offset;
        self.marked_for_removal = false;
        self.last_seen_ms = timestamp_ms;
        self.matched_frames = self.matched_frames.saturating_add(1);
    }

    /// Sensor-space distance to a candidate (mm)
    pub fn distance_to(&self, candidate: &TouchCandidate) -> f32 {
        (self.sensor_position - candidate.sensor_position).norm()
    }

    /// In its last frame before removal
    pub fn is_ghost(&self) -> bool {
        self.marked_for_removal
    }

    /// Displacement since the previous match, in sensor space
    pub fn speed(&self) -> Vec3 {
        self.sensor_position - self.previous_sensor_position
    }
}

/// A tracked point expressed in a screen's coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Touch {
    pub id: TouchId,
    /// Screen coordinates (mm, origin top-left), height above the surface as z
    pub position: Vec3,
    /// Previous position, equal to `position` when it could not be projected
    pub previous_position: Vec3,
    pub is_ghost: bool,
    pub is_3d: bool,
    /// Snapshot of the tracked point this touch came from
    pub point: TrackedPoint,
}

impl Touch {
    /// Screen-space displacement since the previous frame
    pub fn speed(&self) -> Vec3 {
        self.position - self.previous_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f32) -> TouchCandidate {
        TouchCandidate {
            position: Vec3::new(x / 100.0, 0.5, 5.0),
            sensor_position: Vec3::new(x, 0.0, 995.0),
            source_offset: 7,
            size: 20,
            is_3d: false,
        }
    }

    #[test]
    fn test_new_point_has_no_motion() {
        let point = TrackedPoint::from_candidate(TouchId(1), &candidate(10.0), 100);
        assert_eq!(point.previous_position, point.position);
        assert_eq!(point.speed(), Vec3::zeros());
        assert!(!point.is_ghost());
    }

    #[test]
    fn test_update_keeps_previous_position() {
        let mut point = TrackedPoint::from_candidate(TouchId(1), &candidate(10.0), 100);
        point.marked_for_removal = true;
        point.update_from(&candidate(15.0), 133);

        assert_eq!(point.previous_sensor_position.x, 10.0);
        assert_eq!(point.sensor_position.x, 15.0);
        assert_eq!(point.speed(), Vec3::new(5.0, 0.0, 0.0));
        assert!(!point.is_ghost());
        assert_eq!(point.last_seen_ms, 133);
        assert_eq!(point.created_at_ms, 100);
        assert_eq!(point.matched_frames, 2);
    }

    #[test]
    fn test_touch_id_display() {
        assert_eq!(TouchId(12).to_string(), "#12");
    }
}
