// SPDX-License-Identifier: GPL-3.0-only

//! Frame-to-frame association of touch candidates
//!
//! Matching is greedy nearest-neighbour: every (point, candidate) pair within
//! the match distance is considered, shortest first, and a pair is accepted
//! when neither side is taken yet. This is not an optimal assignment; the
//! total displacement is not guaranteed to be minimal. Equal distances are
//! broken by the lower identity, then by the earlier candidate.
//!
//! Lifecycle of a point:
//! 1. created from an unclaimed candidate,
//! 2. updated in place while candidates keep matching,
//! 3. marked for removal (a ghost) on the first unmatched cycle,
//! 4. deleted at the start of the following cycle, whatever the candidates.

use super::point::{TouchCandidate, TouchId, TrackedPoint};
use std::cmp::Ordering;
use tracing::trace;

/// Allocates identities and merges candidates into tracked lists
#[derive(Debug)]
pub struct PointTracker {
    next_id: u64,
}

impl Default for PointTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointTracker {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    fn allocate_id(&mut self) -> TouchId {
        let id = TouchId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Merge this frame's `candidates` into `existing`
    ///
    /// `match_distance` is in sensor-space millimeters.
    pub fn track_points(
        &mut self,
        existing: &mut Vec<TrackedPoint>,
        candidates: &[TouchCandidate],
        timestamp_ms: u64,
        match_distance: f32,
    ) {
        // Ghosts had their one frame of grace
        let before = existing.len();
        existing.retain(|p| !p.marked_for_removal);
        let removed = before - existing.len();

        let mut pairs: Vec<(f32, TouchId, usize, usize)> = Vec::new();
        for (point_idx, point) in existing.iter().enumerate() {
            for (cand_idx, candidate) in candidates.iter().enumerate() {
                let distance = point.distance_to(candidate);
                if distance <= match_distance {
                    pairs.push((distance, point.id, cand_idx, point_idx));
                }
            }
        }
        pairs.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        });

        let mut point_matched = vec![false; existing.len()];
        let mut candidate_claimed = vec![false; candidates.len()];
        for (_, _, cand_idx, point_idx) in pairs {
            if point_matched[point_idx] || candidate_claimed[cand_idx] {
                continue;
            }
            point_matched[point_idx] = true;
            candidate_claimed[cand_idx] = true;
            existing[point_idx].update_from(&candidates[cand_idx], timestamp_ms);
        }

        let mut ghosts = 0;
        for (point, matched) in existing.iter_mut().zip(&point_matched) {
            if !matched {
                point.marked_for_removal = true;
                ghosts += 1;
            }
        }

        let mut created = 0;
        for (candidate, claimed) in candidates.iter().zip(&candidate_claimed) {
            if !claimed {
                let id = self.allocate_id();
                existing.push(TrackedPoint::from_candidate(id, candidate, timestamp_ms));
                created += 1;
            }
        }

        trace!(
            removed,
            ghosts,
            created,
            tracked = existing.len(),
            "Tracked points updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    fn candidate(x: f32, y: f32) -> TouchCandidate {
        TouchCandidate {
            position: Vec3::new(x / 1000.0, y / 1000.0, 5.0),
            sensor_position: Vec3::new(x, y, 995.0),
            source_offset: 0,
            size: 10,
            is_3d: false,
        }
    }

    #[test]
    fn test_identity_stable_under_small_motion() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0)], 0, 30.0);
        let id = points[0].id;

        for frame in 1..50 {
            let x = frame as f32 * 20.0;
            tracker.track_points(&mut points, &[candidate(x, 0.0)], frame * 33, 30.0);
            assert_eq!(points.len(), 1);
            assert_eq!(points[0].id, id);
            assert!(!points[0].is_ghost());
            assert_eq!(points[0].previous_sensor_position.x, x - 20.0);
        }
    }

    #[test]
    fn test_ghost_appears_exactly_once() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0)], 0, 30.0);

        tracker.track_points(&mut points, &[], 33, 30.0);
        assert_eq!(points.len(), 1);
        assert!(points[0].is_ghost());

        tracker.track_points(&mut points, &[], 66, 30.0);
        assert!(points.is_empty());
    }

    #[test]
    fn test_ghost_is_removed_even_if_candidate_returns() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0)], 0, 30.0);
        let first = points[0].id;

        tracker.track_points(&mut points, &[], 33, 30.0);
        tracker.track_points(&mut points, &[candidate(0.0, 0.0)], 66, 30.0);

        assert_eq!(points.len(), 1);
        assert_ne!(points[0].id, first);
    }

    #[test]
    fn test_far_candidate_spawns_new_point() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0)], 0, 30.0);
        tracker.track_points(&mut points, &[candidate(100.0, 0.0)], 33, 30.0);

        assert_eq!(points.len(), 2);
        assert!(points[0].is_ghost());
        assert!(!points[1].is_ghost());
        assert_ne!(points[0].id, points[1].id);
    }

    #[test]
    fn test_globally_nearest_pair_wins() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0), candidate(20.0, 0.0)], 0, 30.0);
        let (a, b) = (points[0].id, points[1].id);

        // Single candidate 5mm from b and 15mm from a
        tracker.track_points(&mut points, &[candidate(15.0, 0.0)], 33, 30.0);

        let pb = points.iter().find(|p| p.id == b).unwrap();
        let pa = points.iter().find(|p| p.id == a).unwrap();
        assert!(!pb.is_ghost());
        assert_eq!(pb.sensor_position.x, 15.0);
        assert!(pa.is_ghost());
    }

    #[test]
    fn test_equal_distance_prefers_lower_identity() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        tracker.track_points(&mut points, &[candidate(0.0, 0.0), candidate(20.0, 0.0)], 0, 30.0);
        // List order must not matter
        points.reverse();

        tracker.track_points(&mut points, &[candidate(10.0, 0.0)], 33, 30.0);

        let winner = points.iter().find(|p| !p.is_ghost()).unwrap();
        assert_eq!(winner.id, TouchId(1));
    }

    #[test]
    fn test_identities_never_reused() {
        let mut tracker = PointTracker::new();
        let mut points = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for frame in 0..10u64 {
            // Alternate far apart so nothing ever matches
            let x = if frame % 2 == 0 { 0.0 } else { 500.0 };
            tracker.track_points(&mut points, &[candidate(x, 0.0)], frame, 30.0);
            for p in points.iter().filter(|p| !p.is_ghost()) {
                seen.insert(p.id);
            }
        }
        assert_eq!(seen.len(), 10);
    }
}
