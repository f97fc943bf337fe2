//! Runtime support for the chargedup robot program.
//!
//! This crate holds everything that is not specific to a particular mechanism:
//!
//! - [`competition`]: the control word reported by the driver station, the
//!   [`RobotMode`](competition::RobotMode) derived from it, and the
//!   [`ModeDispatcher`](competition::ModeDispatcher) that turns a stream of control
//!   words into calls on a [`TimedRobot`](competition::TimedRobot).
//! - [`time`]: program uptime and a fixed-rate [`PeriodicTimer`](time::PeriodicTimer).
//! - [`logger`]: a [`log`] backend printing to the console and an optional file.
//! - [`telemetry`]: a best-effort key/value table for dashboard output.
//!
//! Everything here is single-threaded. A control step never blocks for longer
//! than one period.

pub mod competition;
pub mod logger;
pub mod telemetry;
pub mod time;
