//! Camera pose as interpolable state
//!
//! This is NOT a scene-graph transform. It is the STATE of the viewer's
//! camera, which the renderer reads and applies.

use serde::{Deserialize, Serialize};

/// Values that can be blended for a given progress `t` in [0, 1]
pub trait Interpolate: Clone {
    fn interpolate(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(&self, other: &f32, t: f32) -> f32 {
        self + (other - self) * t
    }
}

/// 3D position in scene units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position3D {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Position3D, t: f32) -> Position3D {
        Position3D {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Distance to another position
    pub fn distance(&self, other: &Position3D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Interpolate for Position3D {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

/// Camera orientation (unit quaternion)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation3D {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Rotation3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation3D {
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn from_euler(yaw: f32, pitch: f32, roll: f32) -> Self {
        let cy = (yaw * 0.5).cos();
        let sy = (yaw * 0.5).sin();
        let cp = (pitch * 0.5).cos();
        let sp = (pitch * 0.5).sin();
        let cr = (roll * 0.5).cos();
        let sr = (roll * 0.5).sin();

        Self {
            w: cr * cp * cy + sr * sp * sy,
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
        }
    }

    /// Orientation looking from `eye` toward `target` (yaw/pitch only, no roll)
    pub fn looking_at(eye: &Position3D, target: &Position3D) -> Self {
        let dx = target.x - eye.x;
        let dy = target.y - eye.y;
        let dz = target.z - eye.z;
        let horizontal = (dx * dx + dz * dz).sqrt();
        if horizontal < 0.0001 && dy.abs() < 0.0001 {
            return Self::identity();
        }
        let yaw = dx.atan2(-dz);
        let pitch = dy.atan2(horizontal);
        Self::from_euler(yaw, pitch, 0.0)
    }

    /// Dot product with another rotation
    pub fn dot(&self, other: &Rotation3D) -> f32 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Spherical linear interpolation
    pub fn slerp(&self, other: &Rotation3D, t: f32) -> Rotation3D {
        let mut dot = self.dot(other);

        // Take the short way round
        let other = if dot < 0.0 {
            dot = -dot;
            Rotation3D {
                w: -other.w,
                x: -other.x,
                y: -other.y,
                z: -other.z,
            }
        } else {
            *other
        };

        if dot > 0.9995 {
            // Linear interpolation for very close quaternions
            let result = Rotation3D {
                w: self.w + (other.w - self.w) * t,
                x: self.x + (other.x - self.x) * t,
                y: self.y + (other.y - self.y) * t,
                z: self.z + (other.z - self.z) * t,
            };
            return result.normalize();
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta = theta.sin();
        let sin_theta_0 = theta_0.sin();

        let s0 = theta.cos() - dot * sin_theta / sin_theta_0;
        let s1 = sin_theta / sin_theta_0;

        Rotation3D {
            w: self.w * s0 + other.w * s1,
            x: self.x * s0 + other.x * s1,
            y: self.y * s0 + other.y * s1,
            z: self.z * s0 + other.z * s1,
        }
    }

    pub fn normalize(&self) -> Rotation3D {
        let len = self.dot(self).sqrt();
        if len < 0.0001 {
            return Rotation3D::identity();
        }
        Rotation3D {
            w: self.w / len,
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
        }
    }
}

impl Interpolate for Rotation3D {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.slerp(other, t)
    }
}

/// Camera pose: where the viewer stands, where it looks, how far it zooms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Position3D,
    pub orientation: Rotation3D,
    /// Zoom factor (1.0 = default field of view)
    pub zoom: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        CameraPose {
            position: Position3D::new(0.0, 0.0, 10.0),
            orientation: Rotation3D::identity(),
            zoom: 1.0,
        }
    }
}

impl CameraPose {
    pub fn new(position: Position3D, orientation: Rotation3D, zoom: f32) -> Self {
        CameraPose {
            position,
            orientation,
            zoom: zoom.max(MIN_ZOOM),
        }
    }

    /// Pose at `eye` looking at `target`
    pub fn looking_at(eye: Position3D, target: Position3D, zoom: f32) -> Self {
        CameraPose::new(eye, Rotation3D::looking_at(&eye, &target), zoom)
    }

    pub fn lerp(&self, other: &CameraPose, t: f32) -> CameraPose {
        let t = t.clamp(0.0, 1.0);
        CameraPose {
            position: self.position.lerp(&other.position, t),
            orientation: self.orientation.slerp(&other.orientation, t),
            zoom: self.zoom.interpolate(&other.zoom, t).max(MIN_ZOOM),
        }
    }

    /// Whether two poses are visually indistinguishable
    pub fn approx_eq(&self, other: &CameraPose, epsilon: f32) -> bool {
        self.position.distance(&other.position) <= epsilon
            && (1.0 - self.orientation.dot(&other.orientation).abs()) <= epsilon
            && (self.zoom - other.zoom).abs() <= epsilon
    }
}

impl Interpolate for CameraPose {
    fn interpolate(&self, other: &Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

const MIN_ZOOM: f32 = 0.01;
