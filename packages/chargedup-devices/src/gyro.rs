//! Inertial sensor
//!
//! Only the roll axis is exposed: it is the axis that tilts when the robot drives
//! onto the charge station.

use snafu::{Snafu, ensure};

use crate::BusError;

/// Largest tilt magnitude, in degrees, a roll reading may report.
pub const MAX_TILT: f64 = 90.0;

/// A single-axis view of an inertial sensor.
pub trait Gyro {
    /// Returns the roll angle in degrees, within `[-MAX_TILT, MAX_TILT]`.
    ///
    /// # Errors
    ///
    /// Returns a [`GyroError`] if no trustworthy reading is available.
    fn roll(&self) -> Result<f64, GyroError>;

    /// Starts calibration. Readings are unavailable until it finishes.
    ///
    /// # Errors
    ///
    /// Returns a [`GyroError`] if calibration could not be started.
    fn calibrate(&mut self) -> Result<(), GyroError>;

    /// Returns `true` while the sensor is calibrating.
    ///
    /// # Errors
    ///
    /// Returns a [`GyroError`] if the sensor could not be read.
    fn is_calibrating(&self) -> Result<bool, GyroError>;
}

/// Checks that a raw tilt reading is usable.
///
/// # Errors
///
/// Returns [`GyroError::OutOfRange`] for NaN, infinite, or out of range values.
pub fn validate_tilt(degrees: f64) -> Result<f64, GyroError> {
    ensure!(
        degrees.is_finite() && degrees.abs() <= MAX_TILT,
        OutOfRangeSnafu { degrees }
    );
    Ok(degrees)
}

#[derive(Debug, Clone, Copy, PartialEq, Snafu)]
/// Errors that can occur when using the inertial sensor.
pub enum GyroError {
    /// The sensor is still calibrating.
    #[snafu(display("gyro is still calibrating"))]
    StillCalibrating,

    /// The sensor reported a tilt outside of `[-MAX_TILT, MAX_TILT]`.
    #[snafu(display("tilt reading of {degrees} degrees is out of range"))]
    OutOfRange {
        /// The raw reading.
        degrees: f64,
    },

    /// Generic bus related error.
    #[snafu(display("{source}"), context(false))]
    Bus {
        /// The source of the error.
        source: BusError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilt_validation() {
        assert_eq!(validate_tilt(90.0), Ok(90.0));
        assert_eq!(validate_tilt(-14.2), Ok(-14.2));
        assert_eq!(
            validate_tilt(91.0),
            Err(GyroError::OutOfRange { degrees: 91.0 })
        );
        assert!(validate_tilt(f64::NAN).is_err());
        assert!(validate_tilt(f64::NEG_INFINITY).is_err());
    }
}
