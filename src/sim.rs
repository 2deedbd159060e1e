// Quadrotor plant, mixer and integrator for closed-loop simulation
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

//! Closed-loop simulation support: a rigid-body quadrotor plant in the NED
//! frame, a matching thrust/torque-to-motor-speed mixer, and a fixed-step
//! RK4 integrator. Gated behind the `simulation` feature; the controller
//! itself never depends on anything here.

use nalgebra::{Matrix3, Matrix4, Quaternion, SVector, UnitQuaternion, Vector3, Vector4};

use crate::vehicle::{Mixer, VehicleState};

/// Number of slots in the plant state vector: position (3), orientation
/// quaternion w-x-y-z (4), velocity (3), body rates (3).
pub const PLANT_STATE_SLOTS: usize = 13;

/// Plant state vector, see [`PLANT_STATE_SLOTS`] for the layout.
pub type PlantState = SVector<f64, PLANT_STATE_SLOTS>;

/// One fixed-size RK4 step of `x' = f(x)`.
pub fn rk4_step<const N: usize>(
    f: impl Fn(&SVector<f64, N>) -> SVector<f64, N>,
    x: &SVector<f64, N>,
    dt: f64,
) -> SVector<f64, N> {
    let k1 = f(x);
    let k2 = f(&(x + 0.5 * dt * k1));
    let k3 = f(&(x + 0.5 * dt * k2));
    let k4 = f(&(x + dt * k3));
    x + (dt / 6.0) * (k1 + 2.0 * k2 + 2.0 * k3 + k4)
}

/// Rigid-body quadrotor in the NED world frame with an X rotor layout.
///
/// Rotor thrusts are quadratic in motor speed; the same allocation matrix
/// drives both the forward dynamics here and the inverse in [`QuadMixer`],
/// so mixing and plant response stay consistent by construction.
#[derive(Debug, Clone)]
pub struct QuadrotorModel {
    mass: f64,
    gravity: f64,
    inertia: Vector3<f64>,
    k_thrust: f64,
    k_torque: f64,
    arm_x: f64,
    arm_y: f64,
    motor_min: f64,
    motor_max: f64,
}

impl QuadrotorModel {
    /// A 1.2 kg X-frame quadrotor with 0.16 m arms, matching the vehicle
    /// behind the default controller gains.
    pub fn default_airframe() -> Self {
        Self {
            mass: 1.2,
            gravity: 9.81,
            inertia: Vector3::new(0.0123, 0.0123, 0.0224),
            k_thrust: 1.076e-5,
            k_torque: 1.632e-7,
            arm_x: 0.16,
            arm_y: 0.16,
            motor_min: 75.0,
            motor_max: 925.0,
        }
    }

    /// Vehicle mass, kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Motor speed, rad/s, at which total thrust equals weight.
    pub fn hover_motor_speed(&self) -> f64 {
        (self.mass * self.gravity / (4.0 * self.k_thrust)).sqrt()
    }

    /// Motor speed range, rad/s.
    pub fn motor_limits(&self) -> (f64, f64) {
        (self.motor_min, self.motor_max)
    }

    /// Allocation matrix mapping squared motor speeds to total thrust and
    /// body torques.
    pub fn allocation_matrix(&self) -> Matrix4<f64> {
        let kt = self.k_thrust;
        let kq = self.k_torque;
        let dx = self.arm_x;
        let dy = self.arm_y;
        #[rustfmt::skip]
        let alloc = Matrix4::new(
            kt,       kt,       kt,       kt,
            kt * dy, -kt * dy, -kt * dy,  kt * dy,
           -kt * dx, -kt * dx,  kt * dx,  kt * dx,
            kq,      -kq,       kq,      -kq,
        );
        alloc
    }

    /// A plant state at rest at `pos`, level, with all motors stopped.
    pub fn at_rest(pos: Vector3<f64>) -> PlantState {
        let mut x = PlantState::zeros();
        x[0] = pos.x;
        x[1] = pos.y;
        x[2] = pos.z;
        x[3] = 1.0; // identity quaternion
        x
    }

    /// Time derivative of the plant state under the given motor speeds.
    pub fn derivative(&self, x: &PlantState, motor_speeds: &Vector4<f64>) -> PlantState {
        let quat = Quaternion::new(x[3], x[4], x[5], x[6]);
        let vel = Vector3::new(x[7], x[8], x[9]);
        let omega = Vector3::new(x[10], x[11], x[12]);

        let speeds_sq = motor_speeds.map(|w| w * w);
        let wrench = self.allocation_matrix() * speeds_sq;
        let thrust = wrench[0];
        let torque = Vector3::new(wrench[1], wrench[2], wrench[3]);

        // Thrust acts along -body-Z in NED; gravity along +world-Z.
        let rot = UnitQuaternion::from_quaternion(quat).to_rotation_matrix();
        let accel = Vector3::new(0.0, 0.0, self.gravity)
            + rot.matrix() * Vector3::new(0.0, 0.0, -thrust) / self.mass;

        let omega_quat = Quaternion::from_parts(0.0, omega);
        let quat_dot = 0.5 * (quat * omega_quat);

        let inertia_omega = self.inertia.component_mul(&omega);
        let omega_dot = (torque - omega.cross(&inertia_omega)).component_div(&self.inertia);

        let mut x_dot = PlantState::zeros();
        x_dot.fixed_rows_mut::<3>(0).copy_from(&vel);
        x_dot[3] = quat_dot.coords.w;
        x_dot[4] = quat_dot.coords.x;
        x_dot[5] = quat_dot.coords.y;
        x_dot[6] = quat_dot.coords.z;
        x_dot.fixed_rows_mut::<3>(7).copy_from(&accel);
        x_dot.fixed_rows_mut::<3>(10).copy_from(&omega_dot);
        x_dot
    }

    /// Advances the plant one RK4 step under constant motor speeds and
    /// renormalizes the orientation quaternion.
    pub fn step(&self, x: &PlantState, motor_speeds: &Vector4<f64>, dt: f64) -> PlantState {
        let mut next = rk4_step(|state| self.derivative(state, motor_speeds), x, dt);
        let quat_norm =
            (next[3] * next[3] + next[4] * next[4] + next[5] * next[5] + next[6] * next[6]).sqrt();
        if quat_norm > 0.0 {
            for i in 3..7 {
                next[i] /= quat_norm;
            }
        }
        next
    }

    /// Builds the controller's view of the vehicle from a plant state,
    /// deriving the acceleration terms from the plant dynamics.
    pub fn observe(&self, x: &PlantState, motor_speeds: &Vector4<f64>) -> VehicleState {
        let x_dot = self.derivative(x, motor_speeds);
        VehicleState {
            pos: Vector3::new(x[0], x[1], x[2]),
            vel: Vector3::new(x[7], x[8], x[9]),
            vel_dot: Vector3::new(x_dot[7], x_dot[8], x_dot[9]),
            quat: UnitQuaternion::from_quaternion(Quaternion::new(x[3], x[4], x[5], x[6])),
            body_rate: Vector3::new(x[10], x[11], x[12]),
            body_rate_dot: Vector3::new(x_dot[10], x_dot[11], x_dot[12]),
        }
    }
}

/// Inverse of the plant's allocation matrix: maps a total-thrust magnitude
/// and a torque demand to the four motor speeds, clamped to the motor range.
#[derive(Debug, Clone)]
pub struct QuadMixer {
    alloc_inv: Matrix4<f64>,
    min_speed_sq: f64,
    max_speed_sq: f64,
}

impl QuadMixer {
    /// Builds the mixer for a plant. Returns `None` when the allocation
    /// matrix is singular, which only happens for degenerate geometry.
    pub fn new(model: &QuadrotorModel) -> Option<Self> {
        let (motor_min, motor_max) = model.motor_limits();
        model.allocation_matrix().try_inverse().map(|alloc_inv| Self {
            alloc_inv,
            min_speed_sq: motor_min * motor_min,
            max_speed_sq: motor_max * motor_max,
        })
    }
}

impl Mixer for QuadMixer {
    fn mix(&self, thrust: f64, torque: &Vector3<f64>) -> Vector4<f64> {
        let wrench = Vector4::new(thrust, torque.x, torque.y, torque.z);
        let speeds_sq = self.alloc_inv * wrench;
        speeds_sq.map(|w_sq| w_sq.clamp(self.min_speed_sq, self.max_speed_sq).sqrt())
    }
}
