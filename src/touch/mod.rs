// SPDX-License-Identifier: GPL-3.0-only

//! Touch detection, tracking and the input facade

pub mod detection;
pub mod input;
pub mod point;
pub mod tracker;

pub use detection::{DetectionMode, TouchDetection};
pub use input::{TouchInput, TouchPoints, TouchPointsGuard};
pub use point::{Touch, TouchCandidate, TouchId, TrackedPoint};
pub use tracker::PointTracker;
