//! Differential drivetrain control.
//!
//! Two [`MotorGroup`]s, one per side, driven through a [`DriveMixer`]. The left
//! side is mounted mirrored, so it is inverted at initialization.

use chargedup_control::drive::{DriveMixer, WheelPowers};
use chargedup_devices::motor::{MotorError, MotorGroup};
use log::debug;

/// A differential drivetrain.
#[derive(Debug)]
pub struct Drivetrain {
    left: MotorGroup,
    right: MotorGroup,
    mixer: DriveMixer,
}

impl Drivetrain {
    /// Creates a drivetrain from its two sides.
    #[must_use]
    pub const fn new(left: MotorGroup, right: MotorGroup, mixer: DriveMixer) -> Self {
        Self { left, right, mixer }
    }

    /// Inverts the left side so that positive power drives both sides forward.
    pub fn init(&mut self) {
        self.left.set_inverted(true);
        debug!(
            "Drivetrain ready with {} left and {} right motors",
            self.left.len(),
            self.right.len()
        );
    }

    /// The mixer turning stick input into side powers.
    #[must_use]
    pub const fn mixer(&self) -> &DriveMixer {
        &self.mixer
    }

    /// Drives with arcade controls. See [`DriveMixer::mix`].
    ///
    /// Both sides are commanded even if one of them fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`MotorError`] encountered.
    pub fn drive(
        &mut self,
        forward: f64,
        turn: f64,
        speed_scale: f64,
        scale_is_slider: bool,
    ) -> Result<WheelPowers, MotorError> {
        let powers = self.mixer.mix(forward, turn, speed_scale, scale_is_slider);
        let left = self.left.set(powers.left);
        let right = self.right.set(powers.right);
        left.and(right)?;
        Ok(powers)
    }

    /// Stops both sides.
    ///
    /// # Errors
    ///
    /// Returns the first [`MotorError`] encountered.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        let left = self.left.stop();
        let right = self.right.stop();
        left.and(right)
    }
}

#[cfg(test)]
mod tests {
    use chargedup_devices::sim::SimMotor;

    use super::*;

    fn drivetrain() -> (Drivetrain, [SimMotor; 4]) {
        let motors = [SimMotor::new(1), SimMotor::new(3), SimMotor::new(2), SimMotor::new(4)];
        let left = MotorGroup::new(vec![Box::new(motors[0].clone()), Box::new(motors[1].clone())]);
        let right = MotorGroup::new(vec![Box::new(motors[2].clone()), Box::new(motors[3].clone())]);
        let mut drivetrain = Drivetrain::new(left, right, DriveMixer::default());
        drivetrain.init();
        (drivetrain, motors)
    }

    #[test]
    fn left_side_is_inverted() {
        let (mut drivetrain, motors) = drivetrain();
        let powers = drivetrain.drive(1.0, 0.0, 1.0, false).unwrap();

        assert_eq!(powers, WheelPowers { left: 1.0, right: 1.0 });
        assert_eq!(motors.each_ref().map(SimMotor::power), [-1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn failed_side_does_not_block_the_other() {
        let (mut drivetrain, motors) = drivetrain();
        motors[0].disconnect();

        assert!(drivetrain.drive(0.0, 1.0, 1.0, false).is_err());
        assert_eq!(motors[2].power(), -1.0);

        drivetrain.stop().unwrap_err();
        assert_eq!(motors[2].power(), 0.0);
    }
}
