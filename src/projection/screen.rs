// SPDX-License-Identifier: GPL-3.0-only

//! Physical target surface

use crate::errors::{TouchError, TouchResult};
use crate::geometry::{Plane, Vec3, transform_point};
use nalgebra::Matrix4;

/// A rectangular surface content is registered to
///
/// The local frame has x along the width, y along the height and z along the
/// plane normal, in millimeters. `location` maps local coordinates to sensor
/// space; the inverse is cached so projections never invert a matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    plane: Plane,
    width: f32,
    height: f32,
    location: Matrix4<f32>,
    world_to_local: Matrix4<f32>,
}

impl Screen {
    pub fn new(location: Matrix4<f32>, width: f32, height: f32) -> TouchResult<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(TouchError::Config(format!(
                "screen size must be positive, got {}x{}",
                width, height
            )));
        }

        let world_to_local = location
            .try_inverse()
            .ok_or_else(|| TouchError::Config("screen location is not invertible".to_string()))?;

        let origin = transform_point(&location, &Vec3::zeros());
        let normal = location.fixed_view::<3, 1>(0, 2).into_owned();
        let plane = Plane::new(origin, normal);
        if !plane.is_valid() {
            return Err(TouchError::Config("screen has no usable normal".to_string()));
        }

        Ok(Self {
            plane,
            width,
            height,
            location,
            world_to_local,
        })
    }

    /// Build a screen from its local origin and in-plane axes
    ///
    /// `x_axis` and `y_axis` are normalized; the normal is their cross product.
    pub fn from_axes(
        origin: Vec3,
        x_axis: Vec3,
        y_axis: Vec3,
        width: f32,
        height: f32,
    ) -> TouchResult<Self> {
        let x = x_axis
            .try_normalize(f32::EPSILON)
            .ok_or_else(|| TouchError::Config("screen x axis is zero".to_string()))?;
        let y = y_axis
            .try_normalize(f32::EPSILON)
            .ok_or_else(|| TouchError::Config("screen y axis is zero".to_string()))?;
        let z = x.cross(&y);

        #[rustfmt::skip]
        let location = Matrix4::new(
            x.x, y.x, z.x, origin.x,
            x.y, y.y, z.y, origin.y,
            x.z, y.z, z.z, origin.z,
            0.0, 0.0, 0.0, 1.0,
        );
        Self::new(location, width, height)
    }

    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Local-to-sensor transform
    pub fn location(&self) -> &Matrix4<f32> {
        &self.location
    }

    /// Sensor-to-local transform
    pub fn world_to_local(&self) -> &Matrix4<f32> {
        &self.world_to_local
    }

    /// Local coordinates of `point` divided by the screen size
    pub fn world_to_normalized(&self, point: &Vec3) -> (f32, f32) {
        let local = transform_point(&self.world_to_local, point);
        (local.x / self.width, local.y / self.height)
    }

    /// Whether (`x`, `y`) lies inside `[0, width] x [0, height]`
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }
}
