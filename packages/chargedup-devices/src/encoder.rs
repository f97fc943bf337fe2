//! Incremental encoders
//!
//! Positions are reported in motor rotations relative to an arbitrary zero that
//! is set with [`Encoder::set_position`].

use snafu::{Snafu, ensure};

use crate::BusError;

/// An incremental position sensor.
pub trait Encoder {
    /// Returns the current position in rotations.
    ///
    /// # Errors
    ///
    /// Returns an [`EncoderError`] if no trustworthy reading is available.
    fn position(&self) -> Result<f64, EncoderError>;

    /// Redefines the current position as `position`.
    ///
    /// # Errors
    ///
    /// Returns an [`EncoderError`] if the sensor could not be written.
    fn set_position(&mut self, position: f64) -> Result<(), EncoderError>;
}

/// Checks that a raw reading is usable.
///
/// # Errors
///
/// Returns [`EncoderError::InvalidReading`] for NaN or infinite values.
pub fn validate_position(position: f64) -> Result<f64, EncoderError> {
    ensure!(position.is_finite(), InvalidReadingSnafu { position });
    Ok(position)
}

#[derive(Debug, Clone, Copy, PartialEq, Snafu)]
/// Errors that can occur when using an encoder.
pub enum EncoderError {
    /// The sensor returned a value that is not a position.
    #[snafu(display("invalid encoder reading: {position}"))]
    InvalidReading {
        /// The raw reading.
        position: f64,
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
    fn rejects_non_finite_readings() {
        assert_eq!(validate_position(-12.5), Ok(-12.5));
        assert!(matches!(
            validate_position(f64::INFINITY),
            Err(EncoderError::InvalidReading { .. })
        ));
        assert!(validate_position(f64::NAN).is_err());
    }
}
