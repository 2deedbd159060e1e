// Configuration for the cascaded flight controller
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

use core::str::FromStr;

use nalgebra::Vector3;
use thiserror::Error;

/// Errors raised when validating controller configuration or vehicle
/// parameters at construction time.
///
/// Configuration is validated exactly once; a controller built from a valid
/// configuration never raises errors during a tick (degenerate numerics are
/// clamped instead, see the crate-level docs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A position P gain is negative or not finite.
    #[error("position P gains must be non-negative and finite")]
    InvalidPositionGain,

    /// A velocity P gain is non-positive or not finite. Strictly positive
    /// gains are required because the tracking anti-windup divides by them.
    #[error("velocity P gains must be positive and finite")]
    InvalidVelocityGain,

    /// A velocity I or D gain is negative or not finite.
    #[error("velocity I/D gains must be non-negative and finite")]
    InvalidVelocityFilterGain,

    /// A roll/pitch attitude gain is non-positive, or the yaw attitude gain
    /// is negative, or any of them is not finite. Roll/pitch gains must be
    /// strictly positive because the yaw-authority weight divides by their
    /// average.
    #[error("attitude P gains must be positive (roll/pitch) or non-negative (yaw) and finite")]
    InvalidAttitudeGain,

    /// A body-rate P or D gain is negative or not finite.
    #[error("rate P/D gains must be non-negative and finite")]
    InvalidRateGain,

    /// A velocity limit is non-positive or not finite.
    #[error("velocity limits must be positive and finite")]
    InvalidVelocityLimit,

    /// The tilt limit does not lie strictly between 0 and 90 degrees.
    #[error("tilt limit must lie in (0, pi/2) radians")]
    InvalidTiltLimit,

    /// A body-rate limit is non-positive or not finite.
    #[error("body-rate limits must be positive and finite")]
    InvalidRateLimit,

    /// An orientation-frame string was neither `NED` nor `ENU`.
    #[error("unknown orientation frame convention")]
    UnknownFrameConvention,

    /// The vehicle mass is non-positive or not finite.
    #[error("vehicle mass must be positive and finite")]
    InvalidMass,

    /// The gravity magnitude is non-positive or not finite.
    #[error("gravity magnitude must be positive and finite")]
    InvalidGravity,

    /// The thrust limits do not satisfy `0 <= min < max`, or are not finite.
    #[error("thrust limits must satisfy 0 <= min < max and be finite")]
    InvalidThrustLimits,

    /// The hover actuator level is negative or not finite.
    #[error("hover actuator level must be non-negative and finite")]
    InvalidHoverLevel,
}

/// World-frame orientation convention, fixed for the lifetime of the process.
///
/// Every frame-dependent sign and limit in the cascade is resolved once at
/// controller construction from this value; tick code never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameConvention {
    /// North-East-Down: the world Z axis points down, hover thrust is
    /// negative along Z and the body-down axis is the thrust direction.
    #[default]
    Ned,
    /// East-North-Up: the world Z axis points up and hover thrust is
    /// positive along Z.
    Enu,
}

impl FromStr for FrameConvention {
    type Err = ConfigError;

    /// Parses `"NED"` or `"ENU"`. Anything else is a fatal configuration
    /// error that must be surfaced before any controller is constructed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NED" => Ok(FrameConvention::Ned),
            "ENU" => Ok(FrameConvention::Enu),
            _ => Err(ConfigError::UnknownFrameConvention),
        }
    }
}

/// Immutable, validated gain and limit set for the cascaded controller.
///
/// Build one with [`ControlConfigBuilder`]; the default configuration
/// carries a gain set tuned for a ~1.2 kg quadrotor. Once built, a config
/// cannot be mutated: retuning means building a new config and a new
/// controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlConfig {
    pos_p_gain: Vector3<f64>,
    vel_p_gain: Vector3<f64>,
    vel_d_gain: Vector3<f64>,
    vel_i_gain: Vector3<f64>,
    att_p_gain: Vector3<f64>,
    rate_p_gain: Vector3<f64>,
    rate_d_gain: Vector3<f64>,
    vel_max: Vector3<f64>,
    saturate_vel_separately: bool,
    tilt_max: f64,
    rate_max: Vector3<f64>,
    frame: FrameConvention,
}

impl Default for ControlConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

// Compile-time copy of the default gain set so `Default` stays infallible.
const DEFAULT_CONFIG: ControlConfig = ControlConfig {
    pos_p_gain: Vector3::new(2.0, 2.0, 1.0),
    vel_p_gain: Vector3::new(5.0, 5.0, 4.0),
    vel_d_gain: Vector3::new(0.5, 0.5, 0.5),
    vel_i_gain: Vector3::new(5.0, 5.0, 5.0),
    att_p_gain: Vector3::new(8.0, 8.0, 1.5),
    rate_p_gain: Vector3::new(1.5, 1.5, 1.0),
    rate_d_gain: Vector3::new(0.04, 0.04, 0.1),
    vel_max: Vector3::new(5.0, 5.0, 5.0),
    saturate_vel_separately: false,
    tilt_max: 50.0 * core::f64::consts::PI / 180.0,
    rate_max: Vector3::new(
        200.0 * core::f64::consts::PI / 180.0,
        200.0 * core::f64::consts::PI / 180.0,
        150.0 * core::f64::consts::PI / 180.0,
    ),
    frame: FrameConvention::Ned,
};

impl ControlConfig {
    /// Proportional position gains per world axis.
    pub fn pos_p_gain(&self) -> Vector3<f64> {
        self.pos_p_gain
    }

    /// Proportional velocity gains per world axis.
    pub fn vel_p_gain(&self) -> Vector3<f64> {
        self.vel_p_gain
    }

    /// Derivative velocity gains per world axis, applied to the measured
    /// acceleration.
    pub fn vel_d_gain(&self) -> Vector3<f64> {
        self.vel_d_gain
    }

    /// Integral velocity gains per world axis.
    pub fn vel_i_gain(&self) -> Vector3<f64> {
        self.vel_i_gain
    }

    /// Proportional attitude gains (roll, pitch, yaw).
    pub fn att_p_gain(&self) -> Vector3<f64> {
        self.att_p_gain
    }

    /// Proportional body-rate gains.
    pub fn rate_p_gain(&self) -> Vector3<f64> {
        self.rate_p_gain
    }

    /// Derivative body-rate gains, applied to the measured rate derivative.
    pub fn rate_d_gain(&self) -> Vector3<f64> {
        self.rate_d_gain
    }

    /// Per-axis velocity setpoint limits, m/s.
    pub fn vel_max(&self) -> Vector3<f64> {
        self.vel_max
    }

    /// Whether to clamp each velocity axis independently instead of scaling
    /// the whole setpoint vector (the default, which preserves heading).
    pub fn saturate_vel_separately(&self) -> bool {
        self.saturate_vel_separately
    }

    /// Maximum tilt from vertical, radians.
    pub fn tilt_max(&self) -> f64 {
        self.tilt_max
    }

    /// Per-axis body-rate setpoint limits, rad/s.
    pub fn rate_max(&self) -> Vector3<f64> {
        self.rate_max
    }

    /// World-frame orientation convention.
    pub fn frame(&self) -> FrameConvention {
        self.frame
    }
}

/// Builder for [`ControlConfig`].
///
/// Every field starts at the default gain set; `build` validates the whole
/// configuration and fails with the first offending [`ConfigError`].
///
/// ```
/// use cascade_control::config::{ControlConfigBuilder, FrameConvention};
///
/// let config = ControlConfigBuilder::default()
///     .tilt_max(35.0_f64.to_radians())
///     .saturate_vel_separately(true)
///     .frame(FrameConvention::Ned)
///     .build()
///     .expect("invalid controller config");
/// assert!(config.saturate_vel_separately());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ControlConfigBuilder {
    config: ControlConfig,
}

impl Default for ControlConfigBuilder {
    fn default() -> Self {
        Self {
            config: DEFAULT_CONFIG,
        }
    }
}

impl ControlConfigBuilder {
    /// Sets the proportional position gains.
    pub fn pos_p_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.pos_p_gain = gain;
        self
    }

    /// Sets the proportional velocity gains.
    pub fn vel_p_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.vel_p_gain = gain;
        self
    }

    /// Sets the derivative velocity gains.
    pub fn vel_d_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.vel_d_gain = gain;
        self
    }

    /// Sets the integral velocity gains.
    pub fn vel_i_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.vel_i_gain = gain;
        self
    }

    /// Sets the proportional attitude gains (roll, pitch, yaw).
    pub fn att_p_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.att_p_gain = gain;
        self
    }

    /// Sets the proportional body-rate gains.
    pub fn rate_p_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.rate_p_gain = gain;
        self
    }

    /// Sets the derivative body-rate gains.
    pub fn rate_d_gain(mut self, gain: Vector3<f64>) -> Self {
        self.config.rate_d_gain = gain;
        self
    }

    /// Sets the per-axis velocity limits, m/s.
    pub fn vel_max(mut self, limits: Vector3<f64>) -> Self {
        self.config.vel_max = limits;
        self
    }

    /// Selects per-axis velocity clamping instead of whole-vector scaling.
    pub fn saturate_vel_separately(mut self, separately: bool) -> Self {
        self.config.saturate_vel_separately = separately;
        self
    }

    /// Sets the maximum tilt from vertical, radians.
    pub fn tilt_max(mut self, tilt_max: f64) -> Self {
        self.config.tilt_max = tilt_max;
        self
    }

    /// Sets the per-axis body-rate limits, rad/s.
    pub fn rate_max(mut self, limits: Vector3<f64>) -> Self {
        self.config.rate_max = limits;
        self
    }

    /// Sets the world-frame orientation convention.
    pub fn frame(mut self, frame: FrameConvention) -> Self {
        self.config.frame = frame;
        self
    }

    /// Validates the accumulated configuration.
    pub fn build(self) -> Result<ControlConfig, ConfigError> {
        let c = &self.config;
        if !all_in(&c.pos_p_gain, |g| g >= 0.0) {
            return Err(ConfigError::InvalidPositionGain);
        }
        if !all_in(&c.vel_p_gain, |g| g > 0.0) {
            return Err(ConfigError::InvalidVelocityGain);
        }
        if !all_in(&c.vel_d_gain, |g| g >= 0.0) || !all_in(&c.vel_i_gain, |g| g >= 0.0) {
            return Err(ConfigError::InvalidVelocityFilterGain);
        }
        if !(c.att_p_gain.x.is_finite() && c.att_p_gain.x > 0.0)
            || !(c.att_p_gain.y.is_finite() && c.att_p_gain.y > 0.0)
            || !(c.att_p_gain.z.is_finite() && c.att_p_gain.z >= 0.0)
        {
            return Err(ConfigError::InvalidAttitudeGain);
        }
        if !all_in(&c.rate_p_gain, |g| g >= 0.0) || !all_in(&c.rate_d_gain, |g| g >= 0.0) {
            return Err(ConfigError::InvalidRateGain);
        }
        if !all_in(&c.vel_max, |v| v > 0.0) {
            return Err(ConfigError::InvalidVelocityLimit);
        }
        if !(c.tilt_max.is_finite() && c.tilt_max > 0.0 && c.tilt_max < core::f64::consts::FRAC_PI_2)
        {
            return Err(ConfigError::InvalidTiltLimit);
        }
        if !all_in(&c.rate_max, |r| r > 0.0) {
            return Err(ConfigError::InvalidRateLimit);
        }
        Ok(self.config)
    }
}

fn all_in(v: &Vector3<f64>, pred: impl Fn(f64) -> bool) -> bool {
    v.iter().all(|&x| x.is_finite() && pred(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ControlConfigBuilder::default().build();
        assert!(config.is_ok());
        assert_eq!(config.unwrap(), ControlConfig::default());
    }

    #[test]
    fn rejects_nonpositive_velocity_gain() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = ControlConfigBuilder::default()
                .vel_p_gain(Vector3::new(5.0, bad, 4.0))
                .build();
            assert_eq!(result.map(|_| ()), Err(ConfigError::InvalidVelocityGain));
        }
    }

    #[test]
    fn rejects_out_of_range_tilt() {
        for bad in [0.0, -0.1, core::f64::consts::FRAC_PI_2, f64::NAN] {
            let result = ControlConfigBuilder::default().tilt_max(bad).build();
            assert_eq!(result.map(|_| ()), Err(ConfigError::InvalidTiltLimit));
        }
    }

    #[test]
    fn frame_parsing_fails_closed() {
        assert_eq!("NED".parse(), Ok(FrameConvention::Ned));
        assert_eq!("ENU".parse(), Ok(FrameConvention::Enu));
        assert_eq!(
            "ned".parse::<FrameConvention>(),
            Err(ConfigError::UnknownFrameConvention)
        );
    }

    #[test]
    fn zero_yaw_attitude_gain_is_valid() {
        let result = ControlConfigBuilder::default()
            .att_p_gain(Vector3::new(8.0, 8.0, 0.0))
            .build();
        assert!(result.is_ok());
    }
}
