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


#[cfg(feature = "simulation")]
mod test_closed_loop {
    use super::fixtures::test_cascade::*;

    use cascade_control::control::CascadeController;
    use cascade_control::setpoint::{ControlMode, DesiredState, TrajectoryCommand, YawMode};
    use cascade_control::sim::{QuadMixer, QuadrotorModel};
    use cascade_control::vehicle::VehicleParams;

    use nalgebra::{Vector3, Vector4};

    fn make_plant() -> (QuadrotorModel, QuadMixer, VehicleParams) {
        let model = QuadrotorModel::default_airframe();
        let mixer = QuadMixer::new(&model).expect("nonsingular allocation matrix");
        let (w_min, w_max) = model.motor_limits();
        let thrust_per_speed_sq = model.mass() * 9.81
            / (4.0 * model.hover_motor_speed() * model.hover_motor_speed());
        let params = VehicleParams::new(
            model.mass(),
            9.81,
            4.0 * thrust_per_speed_sq * w_min * w_min,
            4.0 * thrust_per_speed_sq * w_max * w_max,
            model.hover_motor_speed(),
            true,
        )
        .expect("valid vehicle params");
        (model, mixer, params)
    }

    /// Flies the plant toward a fixed position setpoint and returns the
    /// final plant state.
    fn fly_to(
        target: Vector3<f64>,
        start: Vector3<f64>,
        seconds: f64,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let (model, mixer, params) = make_plant();
        let mut ctrl = CascadeController::new(&make_config(), &params, YawMode::Zero);

        let mut x = QuadrotorModel::at_rest(start);
        let mut motors = Vector4::repeat(model.hover_motor_speed());
        let desired = DesiredState {
            pos: target,
            ..DesiredState::default()
        };
        let cmd = TrajectoryCommand::new(ControlMode::Position, YawMode::Zero, &desired);

        let steps = (seconds / TS).round() as usize;
        for _ in 0..steps {
            let vehicle = model.observe(&x, &motors);
            motors = ctrl.update(&cmd, &vehicle, &no_field(), TS, &mixer);
            x = model.step(&x, &motors, TS);
        }
        (
            Vector3::new(x[0], x[1], x[2]),
            Vector3::new(x[7], x[8], x[9]),
        )
    }

    #[test]
    fn holds_altitude_from_hover() {
        let target = Vector3::new(0.0, 0.0, -5.0);
        let (pos, vel) = fly_to(target, target, 2.0);

        assert!((pos - target).norm() < 0.05, "drifted to {pos}");
        assert!(vel.norm() < 0.05, "residual velocity {vel}");
    }

    #[test]
    fn climbs_to_an_altitude_step() {
        let start = Vector3::new(0.0, 0.0, -2.0);
        let target = Vector3::new(0.0, 0.0, -6.0);
        let (pos, _) = fly_to(target, start, 6.0);

        assert!(
            (pos.z - target.z).abs() < 0.2,
            "altitude error {} after step",
            (pos.z - target.z).abs()
        );
    }

    #[test]
    fn reaches_a_lateral_waypoint() {
        let start = Vector3::new(0.0, 0.0, -5.0);
        let target = Vector3::new(4.0, -3.0, -5.0);
        let (pos, _) = fly_to(target, start, 10.0);

        assert!(
            (pos - target).norm() < 0.5,
            "position error {} after translation",
            (pos - target).norm()
        );
    }
}
