// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! A single JSON document bundles sensor intrinsics, surface calibration,
//! detection thresholds and runtime toggles. Missing fields fall back to
//! their defaults so older files keep loading.

use crate::calibration::{PlaneAndProjectionCalibration, PlanarTouchCalibration};
use crate::constants::{APP_NAME, FRAME_INTERVAL_MS, MAX_HEIGHT_3D_MM, kinect};
use crate::errors::{TouchError, TouchResult};
use crate::geometry::ProjectiveDevice;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Depth and color sensor model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Depth camera intrinsics; also fixes the depth frame size
    pub depth: ProjectiveDevice,
    /// Color camera intrinsics; also fixes the color frame size
    pub color: ProjectiveDevice,
    /// Rigid transform from depth camera space to color camera space
    pub depth_to_color: Matrix4<f32>,
    /// Samples closer than this are discarded (mm)
    pub min_depth_mm: u16,
    /// Samples further than this are discarded (mm)
    pub max_depth_mm: u16,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            depth: ProjectiveDevice::default(),
            color: ProjectiveDevice::default(),
            depth_to_color: Matrix4::identity(),
            min_depth_mm: kinect::DEPTH_MIN_MM,
            max_depth_mm: kinect::DEPTH_MAX_MM,
        }
    }
}

/// Producer thread settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Time between two updates of the touch pipeline
    pub frame_interval_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: FRAME_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorSettings,
    pub calibration: PlaneAndProjectionCalibration,
    /// Thresholds for touches on the surface
    pub touch_2d: PlanarTouchCalibration,
    /// Thresholds for touches above the surface
    pub touch_3d: PlanarTouchCalibration,
    /// Highest point above the surface considered for 3D detection (mm)
    pub max_height_3d: f32,
    /// Maximum 2D candidates per frame, 0 disables 2D detection
    pub precision_2d: usize,
    /// Maximum 3D candidates per frame, 0 disables 3D detection
    pub precision_3d: usize,
    /// Project sensor points through the screen transform instead of ray casting
    pub use_raw_depth: bool,
    /// Keep projected points outside the screen bounds
    pub compute_outsiders: bool,
    pub capture: CaptureSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorSettings::default(),
            calibration: PlaneAndProjectionCalibration::default(),
            touch_2d: PlanarTouchCalibration::default_2d(),
            touch_3d: PlanarTouchCalibration::default_3d(),
            max_height_3d: MAX_HEIGHT_3D_MM,
            precision_2d: 5,
            precision_3d: 0,
            use_raw_depth: false,
            compute_outsiders: false, // Out-of-surface touches are noise
            capture: CaptureSettings::default(),
        }
    }
}

impl Config {
    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.json"))
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> TouchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("No configuration directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid configuration, using defaults");
                Self::default()
            }
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> TouchResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    pub fn validate(&self) -> TouchResult<()> {
        if !self.sensor.depth.is_valid() {
            return Err(TouchError::Config("invalid depth camera intrinsics".to_string()));
        }
        if !self.sensor.color.is_valid() {
            return Err(TouchError::Config("invalid color camera intrinsics".to_string()));
        }
        if self.sensor.min_depth_mm >= self.sensor.max_depth_mm {
            return Err(TouchError::Config(format!(
                "depth range {}..{} is empty",
                self.sensor.min_depth_mm, self.sensor.max_depth_mm
            )));
        }
        if !(self.max_height_3d.is_finite() && self.max_height_3d > 0.0) {
            return Err(TouchError::Config(format!(
                "max_height_3d must be positive, got {}",
                self.max_height_3d
            )));
        }
        if self.capture.frame_interval_ms == 0 {
            return Err(TouchError::Config("frame_interval_ms must be at least 1".to_string()));
        }
        self.calibration.validate().map_err(TouchError::Config)?;
        self.touch_2d
            .validate()
            .map_err(|e| TouchError::Config(format!("touch_2d: {}", e)))?;
        self.touch_3d
            .validate()
            .map_err(|e| TouchError::Config(format!("touch_3d: {}", e)))?;
        Ok(())
    }
}
