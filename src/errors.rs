// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the touch pipeline

use std::fmt;

/// Result type alias using TouchError
pub type TouchResult<T> = Result<T, TouchError>;

/// Which half of a capture was unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Depth,
    Color,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameKind::Depth => write!(f, "depth"),
            FrameKind::Color => write!(f, "color"),
        }
    }
}

/// Main error type for detection, tracking and projection
#[derive(Debug, Clone, PartialEq)]
pub enum TouchError {
    /// Ray misses the screen plane, or the hit falls outside the screen
    NoIntersection,
    /// The frame source had no depth or color buffer this cycle
    MissingFrame(FrameKind),
    /// A guard was poisoned by a panicking holder
    Interrupted(&'static str),
    /// Invalid configuration values
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Configuration could not be (de)serialized
    Parse(String),
}

impl fmt::Display for TouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TouchError::NoIntersection => write!(f, "No intersection with the screen"),
            TouchError::MissingFrame(kind) => write!(f, "No {} frame available", kind),
            TouchError::Interrupted(lock) => write!(f, "Acquisition of {} interrupted", lock),
            TouchError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TouchError::Storage(msg) => write!(f, "Storage error: {}", msg),
            TouchError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for TouchError {}

impl From<std::io::Error> for TouchError {
    fn from(err: std::io::Error) -> Self {
        TouchError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for TouchError {
    fn from(err: serde_json::Error) -> Self {
        TouchError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            TouchError::MissingFrame(FrameKind::Depth).to_string(),
            "No depth frame available"
        );
        assert_eq!(
            TouchError::Interrupted("depth data").to_string(),
            "Acquisition of depth data interrupted"
        );
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: TouchError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, TouchError::Storage(_)));
    }
}
