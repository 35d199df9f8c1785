// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use procam_touch::Config;
use procam_touch::constants::{TRACK_NEAR_DIST_2D, TRACK_NEAR_DIST_3D};
use procam_touch::errors::TouchError;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("procam-touch-test-{}", std::process::id()))
        .join(name)
}

#[test]
fn test_config_default() {
    let config = Config::default();

    // Only surface touches are tracked out of the box
    assert!(config.precision_2d > 0);
    assert_eq!(config.precision_3d, 0);
    assert!(!config.use_raw_depth);
    assert!(!config.compute_outsiders);
}

#[test]
fn test_config_tracking_distances() {
    let config = Config::default();
    assert_eq!(config.touch_2d.tracking_max_distance, TRACK_NEAR_DIST_2D);
    assert_eq!(config.touch_3d.tracking_max_distance, TRACK_NEAR_DIST_3D);
}

#[test]
fn test_config_save_and_load() {
    let path = temp_path("saved.json");
    let mut config = Config::default();
    config.precision_3d = 4;
    config.use_raw_depth = true;

    config.save(&path).expect("save config");
    let loaded = Config::load(&path).expect("load config");
    assert_eq!(loaded, config);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_load_missing_file() {
    let result = Config::load(&temp_path("does-not-exist.json"));
    assert!(matches!(result, Err(TouchError::Storage(_))));
}

#[test]
fn test_config_load_garbage() {
    let path = temp_path("garbage.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load(&path), Err(TouchError::Parse(_))));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_config_rejects_invalid_values() {
    let mut config = Config::default();
    config.max_height_3d = -1.0;
    assert!(matches!(config.validate(), Err(TouchError::Config(_))));

    let path = temp_path("invalid.json");
    assert!(config.save(&path).is_err());
    assert!(!path.exists());
}
