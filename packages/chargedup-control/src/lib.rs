//! Control laws for the chargedup robot program.
//!
//! Everything in this crate is evaluated once per control step and returns
//! immediately:
//!
//! - [`balance`] maps a tilt reading to a drive power that levels the robot on
//!   the charge station.
//! - [`pid`] holds a proportional-integral-derivative controller with
//!   resettable memory.
//! - [`position`] chases a target position with that controller, reporting
//!   convergence and timeouts.
//! - [`drive`] mixes stick inputs into left and right drivetrain powers.

pub mod balance;
pub mod drive;
pub mod pid;
pub mod position;
