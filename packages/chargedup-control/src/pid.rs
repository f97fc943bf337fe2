//! PID controllers.
//!
//! PID controllers are first created with [`PidController::new`]
//! and then can be utilized by calling [`PidController::calculate`] once per
//! control step. The controller assumes it is called at a fixed period, so
//! time is never read from a clock.

use std::time::Duration;

use serde::Deserialize;

/// Gains of a [`PidController`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional constant. This is multiplied by the error to get the
    /// proportional component of the output.
    pub kp: f64,
    /// Integral constant. This accounts for the past values of the error.
    pub ki: f64,
    /// Derivative constant. This allows you to change the motor behavior
    /// based on the rate of change of the error (predicting future values).
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

/// A proportional–integral–derivative controller.
///
/// The integrator and the previous error persist across calls until
/// [`reset`](Self::reset) is called.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidController {
    gains: PidGains,
    period: Duration,
    integral_limit: f64,

    integral: f64,
    prev_error: Option<f64>,
}

impl PidController {
    /// Create a new PID controller stepped every `period`.
    #[must_use]
    pub const fn new(gains: PidGains, period: Duration) -> Self {
        Self {
            gains,
            period,
            integral_limit: f64::INFINITY,
            integral: 0.0,
            prev_error: None,
        }
    }

    /// Bounds the accumulated integral to `[-limit, limit]`.
    #[must_use]
    pub const fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit.abs();
        self
    }

    /// The gains of this controller.
    #[must_use]
    pub const fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Computes the output for one step.
    ///
    /// The derivative term is zero on the first call after construction or a
    /// reset.
    pub fn calculate(&mut self, measurement: f64, setpoint: f64) -> f64 {
        let error = setpoint - measurement;
        let dt = self.period.as_secs_f64();

        let mut derivative = 0.0;
        if dt > 0.0 {
            self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
            if let Some(prev) = self.prev_error {
                derivative = (error - prev) / dt;
            }
        }
        self.prev_error = Some(error);

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    /// Clears the integrator and derivative memory.
    pub const fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new(PidGains::default(), PERIOD);
        assert_relative_eq!(pid.calculate(0.0, -5.0), -5.0);
        assert_relative_eq!(pid.calculate(-4.75, -5.0), -0.25);
    }

    #[test]
    fn integral_accumulates_and_resets() {
        let gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        };
        let mut pid = PidController::new(gains, PERIOD);
        pid.calculate(0.0, 1.0);
        assert_relative_eq!(pid.calculate(0.0, 1.0), 0.04);

        pid.reset();
        assert_relative_eq!(pid.calculate(0.0, 1.0), 0.02);
    }

    #[test]
    fn integral_is_bounded() {
        let gains = PidGains {
            kp: 0.0,
            ki: 1.0,
            kd: 0.0,
        };
        let mut pid = PidController::new(gains, PERIOD).with_integral_limit(0.05);
        for _ in 0..100 {
            pid.calculate(0.0, 10.0);
        }
        assert_relative_eq!(pid.calculate(0.0, 10.0), 0.05);
    }

    #[test]
    fn derivative_skips_first_step() {
        let gains = PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 1.0,
        };
        let mut pid = PidController::new(gains, PERIOD);
        assert_eq!(pid.calculate(0.0, 1.0), 0.0);
        // Error shrinks from 1.0 to 0.8 over one 20 ms step.
        assert_relative_eq!(pid.calculate(0.2, 1.0), -10.0, epsilon = 1e-9);
    }
}
