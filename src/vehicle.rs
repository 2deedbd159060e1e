// Vehicle feedback, physical parameters and the motor-mixing seam
// Copyright © 2026 The cascade_control authors
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use nalgebra::{Matrix3, UnitQuaternion, Vector3, Vector4};

use crate::config::ConfigError;

/// Physical vehicle parameters consumed by the controller.
///
/// Validated once at construction; the controller trusts these values for
/// the rest of its life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleParams {
    mass: f64,
    gravity: f64,
    min_thrust: f64,
    max_thrust: f64,
    hover_motor_level: f64,
    use_integral: bool,
}

impl VehicleParams {
    /// Creates a validated parameter set.
    ///
    /// # Arguments
    /// - `mass`: vehicle mass, kg (positive).
    /// - `gravity`: gravity magnitude, m/s² (positive).
    /// - `min_thrust`, `max_thrust`: single-direction collective thrust
    ///   limits, N (`0 <= min < max`).
    /// - `hover_motor_level`: actuator level (e.g. motor speed) that holds
    ///   hover, used to seed the motor command before the first tick.
    /// - `use_integral`: enables the velocity-loop integral action.
    pub fn new(
        mass: f64,
        gravity: f64,
        min_thrust: f64,
        max_thrust: f64,
        hover_motor_level: f64,
        use_integral: bool,
    ) -> Result<Self, ConfigError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::InvalidMass);
        }
        if !(gravity.is_finite() && gravity > 0.0) {
            return Err(ConfigError::InvalidGravity);
        }
        if !(min_thrust.is_finite() && max_thrust.is_finite())
            || min_thrust < 0.0
            || min_thrust >= max_thrust
        {
            return Err(ConfigError::InvalidThrustLimits);
        }
        if !(hover_motor_level.is_finite() && hover_motor_level >= 0.0) {
            return Err(ConfigError::InvalidHoverLevel);
        }
        Ok(Self {
            mass,
            gravity,
            min_thrust,
            max_thrust,
            hover_motor_level,
            use_integral,
        })
    }

    /// Vehicle mass, kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Gravity magnitude, m/s².
    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Minimum collective thrust, N.
    pub fn min_thrust(&self) -> f64 {
        self.min_thrust
    }

    /// Maximum collective thrust, N.
    pub fn max_thrust(&self) -> f64 {
        self.max_thrust
    }

    /// Hover-equilibrium actuator level.
    pub fn hover_motor_level(&self) -> f64 {
        self.hover_motor_level
    }

    /// Whether the velocity-loop integrators are active.
    pub fn use_integral(&self) -> bool {
        self.use_integral
    }
}

/// Vehicle state feedback supplied by the dynamics collaborator each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// World-frame position, m.
    pub pos: Vector3<f64>,
    /// World-frame velocity, m/s.
    pub vel: Vector3<f64>,
    /// World-frame velocity derivative (measured acceleration), m/s².
    pub vel_dot: Vector3<f64>,
    /// Body-to-world orientation.
    pub quat: UnitQuaternion<f64>,
    /// Body rates, rad/s.
    pub body_rate: Vector3<f64>,
    /// Body-rate derivative, rad/s².
    pub body_rate_dot: Vector3<f64>,
}

impl VehicleState {
    /// A vehicle at rest at `pos`, level, with zero rates.
    pub fn at_rest(pos: Vector3<f64>) -> Self {
        Self {
            pos,
            vel: Vector3::zeros(),
            vel_dot: Vector3::zeros(),
            quat: UnitQuaternion::identity(),
            body_rate: Vector3::zeros(),
            body_rate_dot: Vector3::zeros(),
        }
    }

    /// Direction-cosine matrix of the current orientation (body axes as
    /// columns, expressed in the world frame).
    pub fn dcm(&self) -> Matrix3<f64> {
        *self.quat.to_rotation_matrix().matrix()
    }
}

/// Motor-mixing seam: maps a collective thrust magnitude and a body-torque
/// demand to per-actuator commands.
///
/// The controller calls the mixer at the end of every tick and stores the
/// result without interpreting it. A reference implementation for a
/// cross-configuration quadrotor is available behind the `simulation`
/// feature.
pub trait Mixer {
    /// Computes actuator commands from the collective thrust magnitude (N)
    /// and the body-torque demand.
    fn mix(&self, thrust: f64, torque: &Vector3<f64>) -> Vector4<f64>;
}
