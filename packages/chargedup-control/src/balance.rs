//! Charge station balancing
//!
//! The balance law is a dead-band followed by a linear ramp that saturates at a
//! maximum power. The output always opposes the tilt, so driving with it rolls
//! the robot back toward level.

use serde::Deserialize;

/// Tuning for the balance law, in degrees and fractional power.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Tilt at and beyond which the output saturates.
    pub max_angle: f64,
    /// Tilt at and below which the output is zero.
    pub min_angle: f64,
    /// Magnitude of the saturated output.
    pub max_power: f64,
}

impl BalanceConfig {
    /// The tuning used on the competition robot.
    pub const DEFAULT: Self = Self {
        max_angle: 15.0,
        min_angle: 2.5,
        max_power: 0.2,
    };
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Stateless tilt to power mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BalanceController {
    config: BalanceConfig,
}

impl BalanceController {
    /// Creates a controller with the given tuning.
    #[must_use]
    pub const fn new(config: BalanceConfig) -> Self {
        Self { config }
    }

    /// The tuning of this controller.
    #[must_use]
    pub const fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Computes the drive power for a tilt reading in degrees.
    ///
    /// Positive tilt produces negative power and vice versa. A reading that is
    /// not a number produces zero.
    #[must_use]
    pub fn output(&self, tilt: f64) -> f64 {
        let BalanceConfig {
            max_angle,
            min_angle,
            max_power,
        } = self.config;

        let magnitude = tilt.abs();
        if magnitude.is_nan() || magnitude <= min_angle {
            return 0.0;
        }

        let power = if magnitude >= max_angle {
            max_power
        } else {
            max_power * (magnitude - min_angle) / (max_angle - min_angle)
        };

        -power.copysign(tilt)
    }
}

/// Computes the drive power for a tilt reading using the default tuning.
#[must_use]
pub fn balance(tilt: f64) -> f64 {
    BalanceController::default().output(tilt)
}
