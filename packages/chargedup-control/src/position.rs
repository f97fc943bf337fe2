//! Closed-loop position holds
//!
//! A [`PositionController`] chases a target one step at a time. Each call to
//! [`PositionController::step`] returns a [`PositionCommand`] immediately, so a
//! mode change can abort a hold within one control step.
//!
//! While seeking, the motor coasts under PID power. Once the position is within
//! tolerance the command switches to zero power with the brake engaged. A
//! target that cannot be reached within the timeout is reported once, after
//! which the controller holds.

use std::time::Duration;

use chargedup_devices::motor::{IdleMode, clamp_power};
use log::debug;
use serde::Deserialize;
use snafu::Snafu;

use crate::pid::{PidController, PidGains};

/// Tuning of a [`PositionController`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    /// Largest error, in rotations, considered converged.
    pub tolerance: f64,
    /// Seconds allowed to reach a target before it is reported unreachable.
    pub timeout: f64,
    /// Bound on the magnitude of the commanded power.
    pub max_output: f64,
    /// Feedback gains.
    pub gains: PidGains,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.5,
            timeout: 3.0,
            max_output: 1.0,
            gains: PidGains::default(),
        }
    }
}

/// Progress toward the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionStatus {
    /// No target is set.
    #[default]
    Idle,
    /// Moving toward the target.
    Seeking,
    /// Within tolerance of the target.
    Converged,
    /// The target was not reached in time. The controller holds until retargeted.
    Unreachable,
}

/// What to send to the motor this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCommand {
    /// Fractional power.
    pub power: f64,
    /// Idle mode to apply before the power.
    pub idle_mode: IdleMode,
    /// Status after this step.
    pub status: PositionStatus,
}

impl PositionCommand {
    /// Zero power with the brake engaged.
    #[must_use]
    pub const fn hold(status: PositionStatus) -> Self {
        Self {
            power: 0.0,
            idle_mode: IdleMode::Brake,
            status,
        }
    }
}

/// Runs one PID evaluation toward `target` and clamps the result to a power.
pub fn position_control(current: f64, target: f64, pid: &mut PidController) -> f64 {
    clamp_power(pid.calculate(current, target))
}

/// A resumable position hold.
#[derive(Debug, Clone)]
pub struct PositionController {
    config: PositionConfig,
    pid: PidController,
    tick_budget: u32,

    target: Option<f64>,
    status: PositionStatus,
    ticks: u32,
}

impl PositionController {
    /// Creates a controller stepped every `period`.
    #[must_use]
    pub fn new(config: PositionConfig, period: Duration) -> Self {
        let timeout = Duration::try_from_secs_f64(config.timeout.max(0.0)).unwrap_or(Duration::MAX);
        let tick_budget = match period.as_nanos() {
            0 => u32::MAX,
            period => u32::try_from(timeout.as_nanos().div_ceil(period)).unwrap_or(u32::MAX),
        };

        Self {
            config,
            pid: PidController::new(config.gains, period),
            tick_budget,
            target: None,
            status: PositionStatus::Idle,
            ticks: 0,
        }
    }

    /// The tuning of this controller.
    #[must_use]
    pub const fn config(&self) -> &PositionConfig {
        &self.config
    }

    /// Number of seeking steps allowed before a target is unreachable.
    #[must_use]
    pub const fn tick_budget(&self) -> u32 {
        self.tick_budget
    }

    /// The current target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<f64> {
        self.target
    }

    /// Progress toward the current target.
    #[must_use]
    pub const fn status(&self) -> PositionStatus {
        self.status
    }

    /// Returns `true` if the last step was within tolerance of the target.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.status == PositionStatus::Converged
    }

    /// Chases `target` from the next step on.
    ///
    /// Setting the same target again keeps the current progress. An
    /// unreachable target stays held until [`retry`](Self::retry) is called.
    pub fn set_target(&mut self, target: f64) {
        if self.target == Some(target) {
            return;
        }

        self.target = Some(target);
        self.status = PositionStatus::Seeking;
        self.reset();
    }

    /// Starts a new attempt at a target that was reported unreachable.
    ///
    /// Does nothing in any other state.
    pub fn retry(&mut self) {
        if self.status == PositionStatus::Unreachable {
            self.status = PositionStatus::Seeking;
            self.reset();
        }
    }

    /// Drops the target. Later steps hold until a new target is set.
    pub fn cancel(&mut self) {
        self.target = None;
        self.status = PositionStatus::Idle;
        self.reset();
    }

    /// Clears PID memory and the timeout count, keeping the target.
    pub const fn reset(&mut self) {
        self.pid.reset();
        self.ticks = 0;
    }

    /// Advances the hold by one step.
    ///
    /// # Errors
    ///
    /// - A [`PositionError::SensorUnavailable`] error if `current` is not a
    ///   finite number. The caller should hold.
    /// - A [`PositionError::TargetUnreachable`] error on the step the timeout
    ///   expires. Later steps hold without error.
    pub fn step(&mut self, current: f64) -> Result<PositionCommand, PositionError> {
        let Some(target) = self.target else {
            return Ok(PositionCommand::hold(PositionStatus::Idle));
        };

        if !current.is_finite() {
            return SensorUnavailableSnafu { reading: current }.fail();
        }

        if self.status == PositionStatus::Unreachable {
            return Ok(PositionCommand::hold(PositionStatus::Unreachable));
        }

        if (current - target).abs() <= self.config.tolerance {
            if self.status != PositionStatus::Converged {
                debug!("Reached position target {target} after {} steps", self.ticks);
                self.status = PositionStatus::Converged;
                self.reset();
            }
            return Ok(PositionCommand::hold(PositionStatus::Converged));
        }

        if self.ticks >= self.tick_budget {
            self.status = PositionStatus::Unreachable;
            return TargetUnreachableSnafu {
                target,
                ticks: self.ticks,
            }
            .fail();
        }

        self.ticks += 1;
        self.status = PositionStatus::Seeking;

        let limit = self.config.max_output.abs().min(1.0);
        let power = position_control(current, target, &mut self.pid).clamp(-limit, limit);

        Ok(PositionCommand {
            power,
            idle_mode: IdleMode::Coast,
            status: PositionStatus::Seeking,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Snafu)]
/// Errors that can occur while holding a position.
pub enum PositionError {
    /// The position reading is not usable.
    #[snafu(display("position sensor unavailable (read {reading})"))]
    SensorUnavailable {
        /// The raw reading.
        reading: f64,
    },

    /// The target was not reached before the timeout.
    #[snafu(display("position target {target} unreachable after {ticks} steps"))]
    TargetUnreachable {
        /// The target that was being chased.
        target: f64,
        /// Seeking steps spent on the target.
        ticks: u32,
    },
}
