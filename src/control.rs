// Cascaded position / velocity / attitude / rate controller
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

use core::f64::consts::TAU;

use nalgebra::{Matrix3, Quaternion, SVector, Vector2, Vector3, Vector4};

use crate::config::{ControlConfig, FrameConvention};
use crate::math;
use crate::setpoint::{ControlMode, RepulsiveField, TrajectoryCommand, YawMode};
use crate::vehicle::{Mixer, VehicleParams, VehicleState};

/// Velocity-setpoint magnitude below which the yaw-follow generator holds
/// its last heading, rad-free dead-band against near-hover noise.
const YAW_FOLLOW_DEADBAND: f64 = 0.1;

/// Margin, rad, within which a heading jump across the ±π seam counts as a
/// wraparound rather than a real turn.
const YAW_WRAP_MARGIN: f64 = 0.1;

/// The cascaded flight controller.
///
/// One instance owns all controller state for one vehicle: gains resolved
/// from a [`ControlConfig`], the per-tick setpoint pipeline, and the two
/// pieces of genuinely persistent state — the velocity-error integrators and
/// the yaw-follow heading. Call [`CascadeController::update`] once per fixed
/// control period `ts`; ticks must not run concurrently on the same
/// instance because the stages communicate through its fields in a fixed
/// order.
#[derive(Debug, Clone)]
pub struct CascadeController {
    // Gains and limits resolved from config at construction.
    pos_p_gain: Vector3<f64>,
    vel_p_gain: Vector3<f64>,
    vel_d_gain: Vector3<f64>,
    vel_i_gain: Vector3<f64>,
    att_p_gain: Vector3<f64>,
    rate_p_gain: Vector3<f64>,
    rate_d_gain: Vector3<f64>,
    vel_max: Vector3<f64>,
    vel_max_all: f64,
    saturate_vel_separately: bool,
    tilt_max: f64,
    rate_max: Vector3<f64>,
    yaw_weight: f64,

    // Frame-dependent signs and limits, collapsed once at construction.
    grav_ff: f64,
    thrust_z_min: f64,
    thrust_z_max: f64,
    body_z_sign: f64,

    // Vehicle constants read every tick.
    mass: f64,
    max_thrust: f64,
    use_integral: bool,

    // Persistent across ticks.
    thrust_integral: Vector3<f64>,
    current_heading: f64,

    // Overwritten every tick before being read downstream.
    pos_sp: Vector3<f64>,
    vel_sp: Vector3<f64>,
    acc_sp: Vector3<f64>,
    thrust_sp: Vector3<f64>,
    thrust_rep_sp: Vector3<f64>,
    eul_sp: Vector3<f64>,
    body_rate_sp: Vector3<f64>,
    yaw_ff: f64,
    qd_full: Quaternion<f64>,
    qd_red: Quaternion<f64>,
    qd: Quaternion<f64>,
    qe: Quaternion<f64>,
    rate_sp: Vector3<f64>,
    torque_demand: Vector3<f64>,
    motor_cmd: Vector4<f64>,
    computed_desired: SVector<f64, 16>,
}

impl CascadeController {
    /// Builds a controller for one vehicle.
    ///
    /// The yaw-authority weight is derived here, once, from the attitude
    /// gains: `clip(yaw_gain / avg(roll_gain, pitch_gain), 0, 1)`, with the
    /// yaw slot of the attitude gain vector then sharing the roll/pitch
    /// average. [`YawMode::None`] zeroes yaw authority before the
    /// derivation. All NED/ENU differences are folded into stored signs and
    /// remapped thrust limits so tick code never branches on the frame.
    pub fn new(config: &ControlConfig, params: &VehicleParams, yaw_mode: YawMode) -> Self {
        let mut att_p_gain = config.att_p_gain();
        if yaw_mode == YawMode::None {
            att_p_gain.z = 0.0;
        }
        let roll_pitch_gain = 0.5 * (att_p_gain.x + att_p_gain.y);
        let yaw_weight = (att_p_gain.z / roll_pitch_gain).clamp(0.0, 1.0);
        att_p_gain.z = roll_pitch_gain;

        // In NED the D-axis thrust limits are negated and swapped, and the
        // hover feed-forward subtracts gravity instead of adding it.
        let (grav_ff, thrust_z_min, thrust_z_max, body_z_sign) = match config.frame() {
            FrameConvention::Ned => (
                -params.gravity(),
                -params.max_thrust(),
                -params.min_thrust(),
                -1.0,
            ),
            FrameConvention::Enu => (
                params.gravity(),
                params.min_thrust(),
                params.max_thrust(),
                1.0,
            ),
        };

        Self {
            pos_p_gain: config.pos_p_gain(),
            vel_p_gain: config.vel_p_gain(),
            vel_d_gain: config.vel_d_gain(),
            vel_i_gain: config.vel_i_gain(),
            att_p_gain,
            rate_p_gain: config.rate_p_gain(),
            rate_d_gain: config.rate_d_gain(),
            vel_max: config.vel_max(),
            vel_max_all: config.vel_max().min(),
            saturate_vel_separately: config.saturate_vel_separately(),
            tilt_max: config.tilt_max(),
            rate_max: config.rate_max(),
            yaw_weight,
            grav_ff,
            thrust_z_min,
            thrust_z_max,
            body_z_sign,
            mass: params.mass(),
            max_thrust: params.max_thrust(),
            use_integral: params.use_integral(),
            thrust_integral: Vector3::zeros(),
            current_heading: 0.0,
            pos_sp: Vector3::zeros(),
            vel_sp: Vector3::zeros(),
            acc_sp: Vector3::zeros(),
            thrust_sp: Vector3::zeros(),
            thrust_rep_sp: Vector3::zeros(),
            eul_sp: Vector3::zeros(),
            body_rate_sp: Vector3::zeros(),
            yaw_ff: 0.0,
            qd_full: Quaternion::identity(),
            qd_red: Quaternion::identity(),
            qd: Quaternion::identity(),
            qe: Quaternion::identity(),
            rate_sp: Vector3::zeros(),
            torque_demand: Vector3::zeros(),
            motor_cmd: Vector4::repeat(params.hover_motor_level()),
            computed_desired: SVector::zeros(),
        }
    }

    /// Runs one controller tick.
    ///
    /// Loads the commanded desired state, runs the stage list selected by
    /// the control mode, maps the resulting thrust vector to an attitude,
    /// closes the attitude and rate loops, then hands the augmented-thrust
    /// magnitude and torque demand to `mixer`. Returns the actuator command,
    /// which is also retained for [`CascadeController::motor_command`].
    pub fn update<M: Mixer>(
        &mut self,
        command: &TrajectoryCommand,
        vehicle: &VehicleState,
        field: &RepulsiveField,
        ts: f64,
        mixer: &M,
    ) -> Vector4<f64> {
        self.load_setpoints(command);

        match command.mode {
            ControlMode::Velocity => {
                self.saturate_velocity();
                self.z_velocity_control(vehicle, field, ts);
                self.xy_velocity_control(vehicle, field, ts);
            }
            ControlMode::VelocityAltitudeHold => {
                self.z_position_control(vehicle);
                self.saturate_velocity();
                self.z_velocity_control(vehicle, field, ts);
                self.xy_velocity_control(vehicle, field, ts);
            }
            ControlMode::Position => {
                self.z_position_control(vehicle);
                self.xy_position_control(vehicle);
                self.saturate_velocity();
                self.add_repulsion_to_velocity(field);
                self.saturate_velocity();
                self.yaw_follow(command, ts);
                self.z_velocity_control(vehicle, field, ts);
                self.xy_velocity_control(vehicle, field, ts);
            }
        }

        self.thrust_to_attitude(field);
        self.attitude_control(vehicle);
        self.rate_control(vehicle);

        self.motor_cmd = mixer.mix(self.thrust_rep_sp.norm(), &self.torque_demand);
        self.record_desired_state();
        self.motor_cmd
    }

    /// Copies the commanded desired state into the typed setpoint fields.
    /// Slots are copied by value so downstream mutation never aliases the
    /// planner's buffer.
    fn load_setpoints(&mut self, command: &TrajectoryCommand) {
        let slots = &command.desired;
        self.pos_sp = slots.fixed_rows::<3>(0).into_owned();
        self.vel_sp = slots.fixed_rows::<3>(3).into_owned();
        self.acc_sp = slots.fixed_rows::<3>(6).into_owned();
        self.thrust_sp = slots.fixed_rows::<3>(9).into_owned();
        self.eul_sp = slots.fixed_rows::<3>(12).into_owned();
        self.body_rate_sp = slots.fixed_rows::<3>(15).into_owned();
        self.yaw_ff = slots[18];
    }

    /// Z position loop: strictly additive P correction on top of whatever
    /// velocity feed-forward the planner supplied.
    fn z_position_control(&mut self, vehicle: &VehicleState) {
        let pos_z_error = self.pos_sp.z - vehicle.pos.z;
        self.vel_sp.z += self.pos_p_gain.z * pos_z_error;
    }

    /// XY position loop, same additive contract as the Z loop.
    fn xy_position_control(&mut self, vehicle: &VehicleState) {
        let pos_xy_error = self.pos_sp.xy() - vehicle.pos.xy();
        let correction = self.pos_p_gain.xy().component_mul(&pos_xy_error);
        self.vel_sp.x += correction.x;
        self.vel_sp.y += correction.y;
    }

    /// Saturates the velocity setpoint: either each axis independently, or
    /// (default) by scaling the whole vector down to the smallest axis
    /// limit, which preserves the commanded heading.
    fn saturate_velocity(&mut self) {
        if self.saturate_vel_separately {
            self.vel_sp = math::clamp_abs(&self.vel_sp, &self.vel_max);
        } else {
            let total = self.vel_sp.norm();
            if total > self.vel_max_all {
                self.vel_sp *= self.vel_max_all / total;
            }
        }
    }

    /// Adds the repulsive force to the velocity setpoint as a "velocity".
    fn add_repulsion_to_velocity(&mut self, field: &RepulsiveField) {
        self.vel_sp += field.vel_gain * field.force;
    }

    /// Derives the yaw setpoint and yaw-rate feed-forward from the heading
    /// of the velocity setpoint.
    ///
    /// The persistent heading is unwrapped by ±2π when the new yaw lands on
    /// the other side of the ±π seam, so the single-step differentiator does
    /// not emit a spurious rate spike.
    fn yaw_follow(&mut self, command: &TrajectoryCommand, ts: f64) {
        if command.yaw_mode != YawMode::Follow || command.suppress_yaw_follow {
            return;
        }
        if self.vel_sp.norm() <= YAW_FOLLOW_DEADBAND {
            return;
        }
        let new_yaw = self.vel_sp.y.atan2(self.vel_sp.x);
        self.eul_sp.z = new_yaw;

        if new_yaw.signum() != self.current_heading.signum()
            && (new_yaw - self.current_heading).abs() >= TAU - YAW_WRAP_MARGIN
        {
            self.current_heading += new_yaw.signum() * TAU;
        }

        self.yaw_ff = (new_yaw - self.current_heading) / ts;
        self.current_heading = new_yaw;
    }

    /// Z (D-direction) velocity loop: PID with hover feed-forward and
    /// conditional-clamping anti-windup.
    ///
    /// The integrator only accumulates while the unclamped thrust is not
    /// already saturated in the direction the velocity error keeps pushing,
    /// and its magnitude is clamped to the vehicle's maximum thrust.
    fn z_velocity_control(&mut self, vehicle: &VehicleState, field: &RepulsiveField, ts: f64) {
        let vel_z_error = self.vel_sp.z - vehicle.vel.z;
        let thrust_z = self.vel_p_gain.z * vel_z_error - self.vel_d_gain.z * vehicle.vel_dot.z
            + self.mass * (self.acc_sp.z + self.grav_ff)
            + self.thrust_integral.z
            + field.sat_force_gain * field.force.z;

        let stop_integral = (thrust_z >= self.thrust_z_max && vel_z_error >= 0.0)
            || (thrust_z <= self.thrust_z_min && vel_z_error <= 0.0);

        if !stop_integral && self.use_integral {
            self.thrust_integral.z += self.vel_i_gain.z * vel_z_error * ts;
            self.thrust_integral.z =
                self.thrust_integral.z.abs().min(self.max_thrust) * self.thrust_integral.z.signum();
        }

        self.thrust_sp.z = thrust_z.clamp(self.thrust_z_min, self.thrust_z_max);
    }

    /// XY (NE-direction) velocity loop: PID with acceleration feed-forward,
    /// a tilt/excess-thrust allocation limit, and tracking anti-windup.
    ///
    /// During saturation the integrator is fed a back-calculated error so it
    /// tracks what the achievable output would have produced
    /// (Anti-Reset Windup for PID controllers, L. Rundqwist, 1990).
    fn xy_velocity_control(&mut self, vehicle: &VehicleState, field: &RepulsiveField, ts: f64) {
        let vel_xy_error = self.vel_sp.xy() - vehicle.vel.xy();
        let thrust_desired = self.vel_p_gain.xy().component_mul(&vel_xy_error)
            - self.vel_d_gain.xy().component_mul(&vehicle.vel_dot.xy())
            + self.mass * self.acc_sp.xy()
            + self.thrust_integral.xy()
            + field.sat_force_gain * field.force.xy();

        // Horizontal thrust is bounded by the tilt limit and by the thrust
        // budget left over after the D-direction allocation.
        let thrust_max_tilt = self.thrust_sp.z.abs() * self.tilt_max.tan();
        let thrust_max_excess =
            (self.max_thrust * self.max_thrust - self.thrust_sp.z * self.thrust_sp.z)
                .max(0.0)
                .sqrt();
        let thrust_max_xy = thrust_max_excess.min(thrust_max_tilt);

        let mut thrust_xy = thrust_desired;
        if thrust_desired.norm_squared() > thrust_max_xy * thrust_max_xy {
            thrust_xy = thrust_desired * (thrust_max_xy / thrust_desired.norm());
        }
        self.thrust_sp.x = thrust_xy.x;
        self.thrust_sp.y = thrust_xy.y;

        let arw_gain = Vector2::new(2.0 / self.vel_p_gain.x, 2.0 / self.vel_p_gain.y);
        let vel_error_lim = vel_xy_error - (thrust_desired - thrust_xy).component_mul(&arw_gain);
        if self.use_integral {
            self.thrust_integral.x += self.vel_i_gain.x * vel_error_lim.x * ts;
            self.thrust_integral.y += self.vel_i_gain.y * vel_error_lim.y * ts;
        }
    }

    /// Maps the repulsion-augmented thrust vector and the yaw setpoint to a
    /// full desired orientation quaternion.
    fn thrust_to_attitude(&mut self, field: &RepulsiveField) {
        self.thrust_rep_sp = self.thrust_sp + field.thrust_gain * field.force;

        let yaw_sp = self.eul_sp.z;
        let body_z = self.desired_body_z();

        // Desired yaw direction in the horizontal plane, rotated by pi/2:
        // a stand-in body-Y axis used to seed the triad.
        let y_c = Vector3::new(-yaw_sp.sin(), yaw_sp.cos(), 0.0);
        let body_x = math::normalize_or(&y_c.cross(&body_z), Vector3::x());
        let body_y = body_z.cross(&body_x);

        let rot_sp = Matrix3::from_columns(&[body_x, body_y, body_z]);
        self.qd_full = math::quat_from_rotation(&rot_sp);
    }

    /// Desired body-down axis: the thrust direction, sign-flipped per the
    /// frame convention, with a level fallback when the thrust vanishes.
    fn desired_body_z(&self) -> Vector3<f64> {
        self.body_z_sign * math::normalize_or(&self.thrust_rep_sp, Vector3::z())
    }

    /// Quaternion attitude loop.
    ///
    /// Builds the reduced desired orientation (thrust direction only), mixes
    /// in the yaw-bearing full orientation proportionally to the yaw weight,
    /// and converts the resulting error quaternion to a body-rate setpoint
    /// on the shortest path. The yaw-rate feed-forward is clamped, rotated
    /// into the body frame and added before the final per-axis rate limits.
    fn attitude_control(&mut self, vehicle: &VehicleState) {
        let e_z = vehicle.dcm().column(2).into_owned();
        let e_z_d = self.desired_body_z();

        // Shortest-arc rotation between the current and desired thrust axes.
        let qe_red = math::normalize_quat_or_identity(Quaternion::from_parts(
            e_z.dot(&e_z_d) + (e_z.norm_squared() * e_z_d.norm_squared()).sqrt(),
            e_z.cross(&e_z_d),
        ));
        self.qd_red = qe_red * vehicle.quat.into_inner();

        // Yaw-only difference between reduced and full desired orientations.
        // Canonicalize the sign and clamp the inverse-trig arguments against
        // floating-point overshoot.
        let q_mix = math::canonicalize(math::quat_inverse(&self.qd_red) * self.qd_full);
        let mix_w = q_mix.coords.w.clamp(-1.0, 1.0);
        let mix_z = q_mix.coords.z.clamp(-1.0, 1.0);
        self.qd = self.qd_red
            * Quaternion::new(
                (self.yaw_weight * mix_w.acos()).cos(),
                0.0,
                0.0,
                (self.yaw_weight * mix_z.asin()).sin(),
            );

        self.qe = math::quat_inverse(&vehicle.quat.into_inner()) * self.qd;

        // sign(qe.w) commands the shortest-path rotation regardless of the
        // quaternion double cover.
        self.rate_sp = (2.0 * self.qe.coords.w.signum() * self.qe.imag())
            .component_mul(&self.att_p_gain);

        self.yaw_ff = self.yaw_ff.clamp(-self.rate_max.z, self.rate_max.z);
        let world_z_in_body = vehicle
            .quat
            .inverse()
            .to_rotation_matrix()
            .matrix()
            .column(2)
            .into_owned();
        self.rate_sp += world_z_in_body * self.yaw_ff;

        self.rate_sp = math::clamp_abs(&self.rate_sp, &self.rate_max);
    }

    /// Body-rate loop: stateless PD law producing the raw torque demand.
    fn rate_control(&mut self, vehicle: &VehicleState) {
        let rate_error = self.rate_sp - vehicle.body_rate;
        self.torque_demand = self.rate_p_gain.component_mul(&rate_error)
            - self.rate_d_gain.component_mul(&vehicle.body_rate_dot);
    }

    /// Flattens the tick's derived setpoints into the 16-slot record
    /// consumed by external logging.
    fn record_desired_state(&mut self) {
        self.computed_desired
            .fixed_rows_mut::<3>(0)
            .copy_from(&self.pos_sp);
        self.computed_desired
            .fixed_rows_mut::<3>(3)
            .copy_from(&self.vel_sp);
        self.computed_desired
            .fixed_rows_mut::<3>(6)
            .copy_from(&self.thrust_sp);
        self.computed_desired[9] = self.qd.coords.w;
        self.computed_desired[10] = self.qd.coords.x;
        self.computed_desired[11] = self.qd.coords.y;
        self.computed_desired[12] = self.qd.coords.z;
        self.computed_desired
            .fixed_rows_mut::<3>(13)
            .copy_from(&self.rate_sp);
    }

    /// Velocity setpoint after saturation and potential-field injection.
    pub fn velocity_setpoint(&self) -> Vector3<f64> {
        self.vel_sp
    }

    /// Thrust-vector setpoint produced by the velocity loops, N.
    pub fn thrust_setpoint(&self) -> Vector3<f64> {
        self.thrust_sp
    }

    /// Thrust setpoint augmented with the repulsive force, N. Its magnitude
    /// is what the mixer receives.
    pub fn augmented_thrust_setpoint(&self) -> Vector3<f64> {
        self.thrust_rep_sp
    }

    /// Body-rate setpoint produced by the attitude loop, rad/s.
    pub fn rate_setpoint(&self) -> Vector3<f64> {
        self.rate_sp
    }

    /// Raw torque demand handed to the mixer.
    pub fn torque_demand(&self) -> Vector3<f64> {
        self.torque_demand
    }

    /// Actuator command returned by the mixer on the last tick. Before the
    /// first tick this is seeded with the hover actuator level.
    pub fn motor_command(&self) -> Vector4<f64> {
        self.motor_cmd
    }

    /// Full desired orientation (thrust direction and commanded yaw).
    pub fn desired_orientation_full(&self) -> Quaternion<f64> {
        self.qd_full
    }

    /// Reduced desired orientation (thrust direction only, yaw-free).
    pub fn desired_orientation_reduced(&self) -> Quaternion<f64> {
        self.qd_red
    }

    /// Final desired orientation after yaw-weighted mixing.
    pub fn desired_orientation(&self) -> Quaternion<f64> {
        self.qd
    }

    /// Orientation error quaternion between the vehicle and the final
    /// desired orientation.
    pub fn orientation_error(&self) -> Quaternion<f64> {
        self.qe
    }

    /// Velocity-error integral per axis, N.
    pub fn thrust_integral(&self) -> Vector3<f64> {
        self.thrust_integral
    }

    /// Resets the velocity-error integrators.
    pub fn reset_integral(&mut self) {
        self.thrust_integral = Vector3::zeros();
    }

    /// Persistent yaw-follow heading, rad.
    pub fn heading(&self) -> f64 {
        self.current_heading
    }

    /// Yaw-rate feed-forward used on the last tick, rad/s, after clamping to
    /// the yaw rate limit.
    pub fn yaw_feed_forward(&self) -> f64 {
        self.yaw_ff
    }

    /// Yaw-authority weight derived at construction, in `[0, 1]`.
    pub fn yaw_weight(&self) -> f64 {
        self.yaw_weight
    }

    /// Body-rate setpoint passed through from the planner, for logging.
    pub fn planner_body_rate_setpoint(&self) -> Vector3<f64> {
        self.body_rate_sp
    }

    /// The 16-slot computed-desired-state record: position, velocity,
    /// thrust, final orientation quaternion (w, x, y, z), body-rate
    /// setpoint.
    pub fn computed_desired_state(&self) -> SVector<f64, 16> {
        self.computed_desired
    }
}
