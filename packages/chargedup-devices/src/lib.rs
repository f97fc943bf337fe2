//! Hardware abstractions for the robot's motor controllers, sensors and joysticks.
//!
//! # Overview
//!
//! Devices are modeled as traits so that the robot program receives its hardware
//! as injected handles instead of reaching for global singletons:
//!
//! - [`motor::Motor`] for a motor controller commanded in fractional power, grouped
//!   into sides with [`motor::MotorGroup`].
//! - [`encoder::Encoder`] for an incremental position sensor in motor rotations.
//! - [`gyro::Gyro`] for the inertial sensor's roll axis.
//! - [`controller::Joystick`] for driver station joysticks.
//!
//! The [`sim`] module provides in-memory implementations of every trait. Each
//! simulated device hands out cloneable handles so a test can keep one handle
//! while the robot owns the other.

pub mod controller;
pub mod encoder;
pub mod gyro;
pub mod motor;
pub mod sim;

use snafu::Snafu;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
/// Generic errors that can take place when talking to a device on the CAN bus.
pub enum BusError {
    /// No device answered at the configured CAN id.
    #[snafu(display("no device answered at CAN id {id}"))]
    Disconnected {
        /// The CAN id that was addressed.
        id: u8,
    },

    /// The device answered, but its last status frame is too old to trust.
    #[snafu(display("status frame from CAN id {id} is stale"))]
    Stale {
        /// The CAN id that was addressed.
        id: u8,
    },
}
