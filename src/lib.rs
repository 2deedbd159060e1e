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

#![warn(missing_docs)]

//! # Cascaded Multirotor Flight Controller
//!
//! This library provides a cascaded position / velocity / attitude / rate
//! controller for multirotor vehicles, with an injection point for a
//! potential-field obstacle-avoidance module.
//!
//! ## Features
//!
//! - A fixed-period cascade in the PX4 style:
//!   - P position loops feeding PID velocity loops with two anti-windup
//!     strategies (conditional clamping on the vertical axis, tracking
//!     anti-windup on the horizontal axes).
//!   - Thrust-vector-to-attitude mapping and a quaternion attitude loop with
//!     reduced/full orientation mixing weighted by yaw authority.
//!   - A stateless PD body-rate loop feeding an external mixer.
//! - Fully validated, immutable configuration built once per vehicle.
//! - NED and ENU world frames, collapsed into signs and limits at
//!   construction so the tick path never branches on the convention.
//! - Repulsive-force injection at three points of the cascade, each with an
//!   independent gain; all gains at zero reproduce the uncoupled controller
//!   bit for bit.
//!
//! ## Usage
//!
//! Build a [`config::ControlConfig`] and [`vehicle::VehicleParams`], then
//! drive a [`control::CascadeController`] at a fixed period:
//!
//! ```rust
//! use cascade_control::config::ControlConfigBuilder;
//! use cascade_control::control::CascadeController;
//! use cascade_control::setpoint::{
//!     ControlMode, DesiredState, RepulsiveField, TrajectoryCommand, YawMode,
//! };
//! use cascade_control::vehicle::{Mixer, VehicleParams, VehicleState};
//! use nalgebra::{Vector3, Vector4};
//!
//! struct PassthroughMixer;
//!
//! impl Mixer for PassthroughMixer {
//!     fn mix(&self, thrust: f64, torque: &Vector3<f64>) -> Vector4<f64> {
//!         Vector4::new(thrust, torque.x, torque.y, torque.z)
//!     }
//! }
//!
//! let config = ControlConfigBuilder::default()
//!     .vel_max(Vector3::new(5.0, 5.0, 5.0))
//!     .build()
//!     .expect("invalid controller config");
//! let params = VehicleParams::new(1.2, 9.81, 0.4, 36.72, 522.98, true)
//!     .expect("invalid vehicle params");
//!
//! let mut controller = CascadeController::new(&config, &params, YawMode::Follow);
//!
//! let desired = DesiredState {
//!     pos: Vector3::new(0.0, 0.0, -5.0),
//!     ..DesiredState::default()
//! };
//! let command = TrajectoryCommand::new(ControlMode::Position, YawMode::Follow, &desired);
//! let vehicle = VehicleState::at_rest(Vector3::zeros());
//!
//! let motor_cmd = controller.update(
//!     &command,
//!     &vehicle,
//!     &RepulsiveField::disabled(),
//!     0.005,
//!     &PassthroughMixer,
//! );
//! assert!(motor_cmd[0] > 0.0);
//! ```
//!
//! ## Simulation support
//!
//! The `simulation` feature gates [`sim`], a small rigid-body quadrotor
//! plant, an RK4 integrator and a thrust/torque-to-motor-speed mixer, enough
//! to fly the controller closed-loop in tests and examples.

pub mod config;
pub mod control;
pub mod math;
pub mod setpoint;
pub mod vehicle;

#[cfg(feature = "simulation")]
pub mod sim;

pub use config::{ControlConfig, ControlConfigBuilder, FrameConvention};
pub use control::CascadeController;
pub use setpoint::{ControlMode, DesiredState, RepulsiveField, TrajectoryCommand, YawMode};
pub use vehicle::{Mixer, VehicleParams, VehicleState};
