//! Motor controllers
//!
//! Motors are commanded in fractional power from -1.0 (full reverse) to 1.0
//! (full forward). What a motor does when commanded zero power is decided by its
//! [`IdleMode`].

use bitflags::bitflags;
use snafu::Snafu;

use crate::BusError;

/// Determines how a motor should act when commanded zero power.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum IdleMode {
    /// Motor spins freely.
    #[default]
    Coast,

    /// Motor shorts its windings to resist motion.
    Brake,
}

bitflags! {
    /// The sticky fault flags reported by a motor controller.
    #[derive(Debug, Clone, Copy, Eq, PartialEq)]
    pub struct MotorFaults: u16 {
        /// Input voltage dropped below the controller's operating threshold.
        const BROWNOUT = 1 << 0;

        /// The controller is over current.
        const OVER_CURRENT = 1 << 1;

        /// The motor's temperature is above its limit.
        const OVER_TEMPERATURE = 1 << 2;

        /// The H-bridge has encountered a fault.
        const DRIVER_FAULT = 1 << 3;
    }
}

/// A motor controller commanded in fractional power.
pub trait Motor {
    /// Commands a power in `[-1.0, 1.0]`. Values outside that range are clamped.
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the command could not be delivered.
    fn set(&mut self, power: f64) -> Result<(), MotorError>;

    /// Returns the last commanded power.
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the controller could not be read.
    fn get(&self) -> Result<f64, MotorError>;

    /// Sets what the motor does while commanded zero power.
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the command could not be delivered.
    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), MotorError>;

    /// Returns the configured idle mode.
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the controller could not be read.
    fn idle_mode(&self) -> Result<IdleMode, MotorError>;

    /// Commands zero power.
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the command could not be delivered.
    fn stop(&mut self) -> Result<(), MotorError> {
        self.set(0.0)
    }
}

/// Clamps a power command to `[-1.0, 1.0]`. NaN becomes zero.
#[must_use]
pub fn clamp_power(power: f64) -> f64 {
    if power.is_nan() {
        0.0
    } else {
        power.clamp(-1.0, 1.0)
    }
}

/// Several motors driven together as one, such as the front and rear motors of
/// one drivetrain side.
pub struct MotorGroup {
    motors: Vec<Box<dyn Motor>>,
    inverted: bool,
}

impl core::fmt::Debug for MotorGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotorGroup")
            .field("motors", &self.motors.len())
            .field("inverted", &self.inverted)
            .finish()
    }
}

impl MotorGroup {
    /// Creates a group from the given motors.
    #[must_use]
    pub fn new(motors: Vec<Box<dyn Motor>>) -> Self {
        Self {
            motors,
            inverted: false,
        }
    }

    /// Inverts every command sent to the group.
    pub const fn set_inverted(&mut self, inverted: bool) {
        self.inverted = inverted;
    }

    /// Returns `true` if commands to this group are inverted.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Number of motors in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.motors.len()
    }

    /// Returns `true` if the group has no motors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    /// Commands every motor in the group.
    ///
    /// Every motor is commanded even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`MotorError`] encountered.
    pub fn set(&mut self, power: f64) -> Result<(), MotorError> {
        let power = clamp_power(power);
        let power = if self.inverted { -power } else { power };

        let mut result = Ok(());
        for motor in &mut self.motors {
            let outcome = motor.set(power);
            if result.is_ok() {
                result = outcome;
            }
        }
        result
    }

    /// Returns the power of the group as seen by the caller (before inversion).
    ///
    /// # Errors
    ///
    /// Returns a [`MotorError`] if the first motor could not be read. An empty
    /// group reads as zero.
    pub fn get(&self) -> Result<f64, MotorError> {
        let Some(first) = self.motors.first() else {
            return Ok(0.0);
        };
        let power = first.get()?;
        Ok(if self.inverted { -power } else { power })
    }

    /// Sets the idle mode of every motor in the group.
    ///
    /// # Errors
    ///
    /// Returns the first [`MotorError`] encountered.
    pub fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), MotorError> {
        let mut result = Ok(());
        for motor in &mut self.motors {
            let outcome = motor.set_idle_mode(mode);
            if result.is_ok() {
                result = outcome;
            }
        }
        result
    }

    /// Commands zero power to every motor.
    ///
    /// # Errors
    ///
    /// Returns the first [`MotorError`] encountered.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.set(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
/// Errors that can occur when using a motor.
pub enum MotorError {
    /// The controller has latched faults and refuses commands.
    #[snafu(display("motor controller faulted: {faults:?}"))]
    Faulted {
        /// The active fault flags.
        faults: MotorFaults,
    },

    /// Generic bus related error.
    #[snafu(display("{source}"), context(false))]
    Bus {
        /// The source of the error.
        source: BusError,
    },
}
