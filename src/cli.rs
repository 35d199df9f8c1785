// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `simulate`: drive the touch pipeline from a synthetic depth camera
//! - `config`: inspect or create the configuration file

use procam_touch::backends::{Finger, FrameSource, SyntheticSource};
use procam_touch::config::Config;
use procam_touch::touch::{Touch, TouchInput};
use std::f32::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Depth of the simulated surface (mm)
const SURFACE_DEPTH_MM: u16 = 1000;
/// Height of hovering fingers (mm)
const HOVER_HEIGHT_MM: f32 = 120.0;

pub struct SimulateOptions {
    pub frames: u64,
    pub fingers: usize,
    pub precision_2d: Option<usize>,
    pub precision_3d: Option<usize>,
    pub raw_depth: bool,
    pub outsiders: bool,
}

/// Run the capture loop on a synthetic source and print touches
pub fn simulate(options: SimulateOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default();

    // The synthetic scene is rendered for the configured depth camera with a
    // color camera sharing its optics
    let source = Arc::new(SyntheticSource::new(config.sensor.depth, SURFACE_DEPTH_MM));
    config.sensor.color = config.sensor.depth;
    config.sensor.depth_to_color = nalgebra::Matrix4::identity();
    config.calibration = source.calibration();
    if let Some(precision) = options.precision_2d {
        config.precision_2d = precision;
    }
    if let Some(precision) = options.precision_3d {
        config.precision_3d = precision;
    }
    config.use_raw_depth = options.raw_depth;
    config.compute_outsiders = options.outsiders;

    let screen = source.surface_screen()?;
    let display = source.display();
    let input = Arc::new(TouchInput::new(&config)?);

    println!(
        "Simulating {} frame(s) with {} finger(s) on a {:.0}x{:.0} mm screen",
        options.frames,
        options.fingers,
        screen.width(),
        screen.height()
    );
    println!(
        "Precision: 2D={} 3D={}",
        input.precision_2d(),
        input.precision_3d()
    );
    println!("Press Ctrl+C to stop early");
    println!();

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let interval = Duration::from_millis(config.capture.frame_interval_ms);
    source.set_fingers(animate_fingers(&source, options.fingers, 0));
    let mut capture = input.spawn_capture(source.clone() as Arc<dyn FrameSource>, interval);

    let mut last_frame = 0;
    while source.frames_served() < options.frames {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        std::thread::sleep(interval);

        let frame = source.frames_served();
        if frame == last_frame {
            continue;
        }
        last_frame = frame;
        source.set_fingers(animate_fingers(&source, options.fingers, frame));

        let touches = input.project_touch_to_screen(&screen, &display)?;
        print_touches(frame, &touches);
    }

    capture.stop();
    println!();
    println!("Processed {} frame(s)", source.frames_served());

    Ok(())
}

/// Fingers spread along the width, swaying vertically over time
fn animate_fingers(source: &SyntheticSource, count: usize, frame: u64) -> Vec<Finger> {
    let width = source.device().width as f32;
    let height = source.device().height as f32;
    let amplitude = height / 4.0;

    (0..count)
        .map(|i| {
            let x = width * (i + 1) as f32 / (count + 1) as f32;
            let phase = TAU * (frame as f32 / 90.0 + i as f32 / count.max(1) as f32);
            let y = height / 2.0 + amplitude * phase.sin();
            if i % 2 == 0 {
                Finger::touching(x, y)
            } else {
                Finger::hovering(x, y, HOVER_HEIGHT_MM)
            }
        })
        .collect()
}

fn print_touches(frame: u64, touches: &[Touch]) {
    if touches.is_empty() {
        println!("frame {:>5}: no touches", frame);
        return;
    }

    for touch in touches {
        let speed = touch.speed();
        println!(
            "frame {:>5}: {:>5} {}{} at ({:7.1}, {:7.1}) height {:6.1} speed ({:5.1}, {:5.1})",
            frame,
            touch.id.to_string(),
            if touch.is_3d { "3D" } else { "2D" },
            if touch.is_ghost { " ghost" } else { "" },
            touch.position.x,
            touch.position.y,
            touch.position.z,
            speed.x,
            speed.y
        );
    }
}

/// Print the effective configuration as JSON
pub fn show_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default configuration to the default path
pub fn init_config(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Config::default_path().ok_or("No configuration directory available")?;

    if path.exists() && !force {
        println!("Configuration already exists: {}", path.display());
        println!("Use --force to overwrite it");
        return Ok(());
    }

    Config::default().save(&path)?;
    println!("Configuration written: {}", path.display());
    Ok(())
}

/// Print where the configuration file lives
pub fn print_config_path() -> Result<(), Box<dyn std::error::Error>> {
    match Config::default_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("No configuration directory available"),
    }
    Ok(())
}
