// SPDX-License-Identifier: GPL-3.0-only

//! Shared frame types for frame sources

use std::sync::Arc;

/// Depth buffer in millimeters, row-major, 0 where the sensor has no reading
#[derive(Clone)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u16]>,
}

impl DepthFrame {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u16]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    /// Whether the buffer holds exactly width x height samples
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }
}

impl std::fmt::Debug for DepthFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DepthFrame({}x{}, {} samples)",
            self.width,
            self.height,
            self.data.len()
        )
    }
}

/// RGB8 color buffer, row-major, 3 bytes per pixel
#[derive(Clone)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl ColorFrame {
    pub fn new(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 3
    }

    pub fn rgb(&self, offset: usize) -> Option<[u8; 3]> {
        let start = offset.checked_mul(3)?;
        let px = self.data.get(start..start + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Opaque ARGB color of the pixel at `offset`
    pub fn packed_argb(&self, offset: usize) -> Option<u32> {
        self.rgb(offset).map(pack_argb)
    }
}

impl std::fmt::Debug for ColorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ColorFrame({}x{}, {} bytes)", self.width, self.height, self.data.len())
    }
}

/// Pack an RGB triple as opaque 0xAARRGGBB
pub fn pack_argb([r, g, b]: [u8; 3]) -> u32 {
    0xFF00_0000 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}
