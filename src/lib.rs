//! Drive, arm and autobalance control program for the 2023 Charged Up robot.
//!
//! The program is a [`TimedRobot`](chargedup_core::competition::TimedRobot)
//! implementation, [`robot::Robot`], that is handed its devices as a
//! [`robot::Hardware`] bundle. On the desktop those devices come from
//! [`sim::Simulation`], which also models the charge station and the arm so
//! that a whole match can be run without a robot.
//!
//! - [`config`]: the robot map and tunable configuration.
//! - [`drivetrain`]: two motor groups driven with arcade controls.
//! - [`arm`]: manual jogging, presets and soft limits.
//! - [`auto`]: the autonomous chooser and the autobalance routine.

pub mod arm;
pub mod auto;
pub mod config;
pub mod drivetrain;
pub mod robot;
pub mod sim;
