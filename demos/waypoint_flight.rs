//! Closed-loop waypoint flight of the cascaded controller against the
//! simulated quadrotor plant.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example waypoint_flight --features simulation > flight.csv
//! ```
//!
//! The program flies a square of waypoints at 5 m altitude (NED, so
//! z = -5) and writes one CSV row per control tick: time, position,
//! velocity setpoint, thrust setpoint and motor speeds.
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

use cascade_control::config::ControlConfigBuilder;
use cascade_control::control::CascadeController;
use cascade_control::setpoint::{
    ControlMode, DesiredState, RepulsiveField, TrajectoryCommand, YawMode,
};
use cascade_control::sim::{QuadMixer, QuadrotorModel};
use cascade_control::vehicle::VehicleParams;

use nalgebra::{Vector3, Vector4};

const TS: f64 = 0.005;
const SECONDS_PER_LEG: f64 = 5.0;

fn main() {
    let model = QuadrotorModel::default_airframe();
    let mixer = QuadMixer::new(&model).expect("nonsingular allocation matrix");

    let k_thrust = model.mass() * 9.81 / (4.0 * model.hover_motor_speed().powi(2));
    let (w_min, w_max) = model.motor_limits();
    let params = VehicleParams::new(
        model.mass(),
        9.81,
        4.0 * k_thrust * w_min * w_min,
        4.0 * k_thrust * w_max * w_max,
        model.hover_motor_speed(),
        true,
    )
    .expect("valid vehicle params");

    let config = ControlConfigBuilder::default().build().expect("valid config");
    let mut ctrl = CascadeController::new(&config, &params, YawMode::Follow);

    let waypoints = [
        Vector3::new(0.0, 0.0, -5.0),
        Vector3::new(5.0, 0.0, -5.0),
        Vector3::new(5.0, 5.0, -5.0),
        Vector3::new(0.0, 5.0, -5.0),
        Vector3::new(0.0, 0.0, -5.0),
    ];

    let mut x = QuadrotorModel::at_rest(Vector3::zeros());
    let mut motors = Vector4::repeat(model.hover_motor_speed());
    let field = RepulsiveField::disabled();

    println!(
        "t,x,y,z,vel_sp_x,vel_sp_y,vel_sp_z,thrust_x,thrust_y,thrust_z,w1,w2,w3,w4"
    );

    let steps_per_leg = (SECONDS_PER_LEG / TS).round() as usize;
    let mut t = 0.0;
    for (leg, waypoint) in waypoints.iter().enumerate() {
        let desired = DesiredState {
            pos: *waypoint,
            ..DesiredState::default()
        };
        let mut cmd = TrajectoryCommand::new(ControlMode::Position, YawMode::Follow, &desired);
        // hold heading while settling on the final waypoint
        cmd.suppress_yaw_follow = leg + 1 == waypoints.len();

        for _ in 0..steps_per_leg {
            let vehicle = model.observe(&x, &motors);
            motors = ctrl.update(&cmd, &vehicle, &field, TS, &mixer);
            x = model.step(&x, &motors, TS);
            t += TS;

            let vel_sp = ctrl.velocity_setpoint();
            let thrust_sp = ctrl.thrust_setpoint();
            println!(
                "{t:.3},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.2},{:.2},{:.2},{:.2}",
                x[0], x[1], x[2],
                vel_sp.x, vel_sp.y, vel_sp.z,
                thrust_sp.x, thrust_sp.y, thrust_sp.z,
                motors[0], motors[1], motors[2], motors[3],
            );
        }
    }

    let final_pos = Vector3::new(x[0], x[1], x[2]);
    let error = (final_pos - waypoints[waypoints.len() - 1]).norm();
    eprintln!("final position {final_pos:?}, error {error:.3} m");
}
