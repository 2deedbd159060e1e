// Trajectory commands, control modes and the potential-field interface
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

use nalgebra::{SVector, Vector3};

/// Number of slots in the desired-state vector exchanged with the planner.
pub const DESIRED_STATE_SLOTS: usize = 19;

/// Raw desired-state vector: position, velocity, acceleration, thrust,
/// Euler angles, body rates (3 slots each), then the yaw-rate feed-forward.
pub type DesiredStateVector = SVector<f64, DESIRED_STATE_SLOTS>;

/// Which cascade stages run on a tick. The tail of the cascade
/// (thrust-to-attitude, attitude, rate, mixing) always runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Track a velocity setpoint on all three axes.
    Velocity,
    /// Track horizontal velocity while holding a Z position.
    VelocityAltitudeHold,
    /// Track a full position setpoint.
    Position,
}

/// How the yaw setpoint is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YawMode {
    /// No yaw control: yaw authority is zeroed at controller construction.
    None,
    /// Yaw follows the waypoint/Euler setpoint supplied by the planner.
    Waypoint,
    /// Yaw follows the heading of the commanded velocity, with feed-forward
    /// generated by the controller's heading differentiator.
    Follow,
    /// Hold zero yaw.
    Zero,
}

/// Typed view of the 19-slot desired state, for callers that assemble
/// commands field by field rather than packing raw vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesiredState {
    /// Position setpoint, m.
    pub pos: Vector3<f64>,
    /// Velocity setpoint / feed-forward, m/s.
    pub vel: Vector3<f64>,
    /// Acceleration feed-forward, m/s².
    pub acc: Vector3<f64>,
    /// Thrust setpoint, N (used by modes that bypass the velocity loops).
    pub thrust: Vector3<f64>,
    /// Euler-angle setpoint, rad; only the yaw component is consumed.
    pub euler: Vector3<f64>,
    /// Body-rate setpoint, rad/s (passed through for logging).
    pub body_rate: Vector3<f64>,
    /// Yaw-rate feed-forward, rad/s.
    pub yaw_rate_ff: f64,
}

impl Default for DesiredState {
    fn default() -> Self {
        Self {
            pos: Vector3::zeros(),
            vel: Vector3::zeros(),
            acc: Vector3::zeros(),
            thrust: Vector3::zeros(),
            euler: Vector3::zeros(),
            body_rate: Vector3::zeros(),
            yaw_rate_ff: 0.0,
        }
    }
}

impl DesiredState {
    /// Packs the typed fields into the wire layout.
    pub fn to_vector(&self) -> DesiredStateVector {
        let mut slots = DesiredStateVector::zeros();
        slots.fixed_rows_mut::<3>(0).copy_from(&self.pos);
        slots.fixed_rows_mut::<3>(3).copy_from(&self.vel);
        slots.fixed_rows_mut::<3>(6).copy_from(&self.acc);
        slots.fixed_rows_mut::<3>(9).copy_from(&self.thrust);
        slots.fixed_rows_mut::<3>(12).copy_from(&self.euler);
        slots.fixed_rows_mut::<3>(15).copy_from(&self.body_rate);
        slots[18] = self.yaw_rate_ff;
        slots
    }
}

/// One tick's worth of planner output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryCommand {
    /// Raw desired-state vector (see [`DesiredStateVector`] for the layout).
    pub desired: DesiredStateVector,
    /// Stage selection for this tick.
    pub mode: ControlMode,
    /// Yaw-setpoint source.
    pub yaw_mode: YawMode,
    /// Suppresses the yaw-follow generator even in [`YawMode::Follow`]
    /// (e.g. while holding position at the final waypoint).
    pub suppress_yaw_follow: bool,
}

impl TrajectoryCommand {
    /// Builds a command from a typed desired state.
    pub fn new(mode: ControlMode, yaw_mode: YawMode, desired: &DesiredState) -> Self {
        Self {
            desired: desired.to_vector(),
            mode,
            yaw_mode,
            suppress_yaw_follow: false,
        }
    }
}

/// Repulsive-force output of the external obstacle-avoidance module,
/// together with its three independent coupling gains.
///
/// All gains at zero reproduce, bit for bit, a controller with no
/// potential-field coupling; no other switch exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepulsiveField {
    /// Repulsive force, world frame, N.
    pub force: Vector3<f64>,
    /// Gain coupling the force into the velocity setpoint, (m/s)/N.
    pub vel_gain: f64,
    /// Gain coupling the force into the commanded thrust vector.
    pub thrust_gain: f64,
    /// Gain injecting the force into the velocity-loop thrust equations
    /// ahead of saturation, so it participates in anti-windup accounting.
    pub sat_force_gain: f64,
}

impl RepulsiveField {
    /// A field with no force and no coupling.
    pub fn disabled() -> Self {
        Self {
            force: Vector3::zeros(),
            vel_gain: 0.0,
            thrust_gain: 0.0,
            sat_force_gain: 0.0,
        }
    }
}
