//! The arm: manual jogging, preset positions and software soft limits.

use std::time::Duration;

use chargedup_control::position::{PositionController, PositionError, PositionStatus};
use chargedup_devices::{
    controller::JoystickState,
    encoder::{Encoder, EncoderError},
    motor::{IdleMode, Motor, MotorError},
};
use log::info;
use snafu::Snafu;

use crate::config::ArmConfig;

/// What the arm did during the last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    /// Driven by the arm joystick.
    Manual,
    /// Chasing or holding a preset position.
    Preset(PositionStatus),
}

/// The arm subsystem.
pub struct Arm {
    motor: Box<dyn Motor>,
    encoder: Box<dyn Encoder>,
    config: ArmConfig,
    position: PositionController,
    idle_mode: Option<IdleMode>,
}

impl core::fmt::Debug for Arm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arm")
            .field("position", &self.position)
            .field("idle_mode", &self.idle_mode)
            .finish_non_exhaustive()
    }
}

impl Arm {
    /// Creates the arm from its motor and encoder, stepped every `period`.
    #[must_use]
    pub fn new(motor: Box<dyn Motor>, encoder: Box<dyn Encoder>, config: ArmConfig, period: Duration) -> Self {
        Self {
            motor,
            encoder,
            position: PositionController::new(config.position, period),
            config,
            idle_mode: None,
        }
    }

    /// Logs the soft limits and engages the brake.
    ///
    /// # Errors
    ///
    /// Returns an [`ArmError`] if the motor could not be configured.
    pub fn init(&mut self) -> Result<(), ArmError> {
        info!(
            "Arm soft limits set to [{}, {}] rotations",
            self.config.reverse_limit, self.config.forward_limit
        );
        self.apply(0.0, IdleMode::Brake)?;
        Ok(())
    }

    /// The arm position in rotations.
    ///
    /// # Errors
    ///
    /// Returns an [`EncoderError`] if the encoder could not be read.
    pub fn position(&self) -> Result<f64, EncoderError> {
        self.encoder.position()
    }

    /// Defines the current arm position as zero.
    ///
    /// # Errors
    ///
    /// Returns an [`EncoderError`] if the encoder could not be written.
    pub fn zero(&mut self) -> Result<(), EncoderError> {
        self.encoder.set_position(0.0)
    }

    /// The preset being chased, if any.
    #[must_use]
    pub const fn preset_target(&self) -> Option<f64> {
        self.position.target()
    }

    /// Progress toward the preset.
    #[must_use]
    pub const fn preset_status(&self) -> PositionStatus {
        self.position.status()
    }

    /// Drops the preset and clears the position controller's memory.
    pub fn cancel(&mut self) {
        self.position.cancel();
    }

    /// Stops the arm.
    ///
    /// # Errors
    ///
    /// Returns an [`ArmError`] if the motor could not be commanded.
    pub fn stop(&mut self) -> Result<(), ArmError> {
        self.motor.stop()?;
        Ok(())
    }

    /// Maps a stick deflection to a manual jog power.
    #[must_use]
    pub fn manual_power(&self, input: f64) -> f64 {
        if input > self.config.manual_deadband {
            self.config.manual_power
        } else if input < -self.config.manual_deadband {
            -self.config.manual_power
        } else {
            0.0
        }
    }

    /// Zeroes power that would push the arm past a soft limit.
    #[must_use]
    pub fn limit(&self, power: f64, position: f64) -> f64 {
        let past_forward = power > 0.0 && position >= self.config.forward_limit;
        let past_reverse = power < 0.0 && position <= self.config.reverse_limit;
        if past_forward || past_reverse { 0.0 } else { power }
    }

    /// Runs one step of the arm from the arm joystick.
    ///
    /// Stick deflection beyond the override threshold wins over everything and
    /// cancels a preset. Otherwise a held preset button selects its target, and
    /// a previously selected preset keeps being chased after the button is
    /// released. An unreachable preset is only retried when its button is
    /// pressed again.
    ///
    /// # Errors
    ///
    /// Returns an [`ArmError`] if a device failed or the preset could not be
    /// reached. The arm holds in both cases.
    pub fn update(&mut self, joystick: &JoystickState) -> Result<ArmMode, ArmError> {
        let input = joystick.y();

        if input.abs() > self.config.override_threshold {
            if self.position.target().is_some() {
                info!("Manual arm input, cancelling preset");
                self.position.cancel();
            }
            return self.manual(input);
        }

        let pressed = self.config.presets.iter().find_map(|preset| {
            let button = joystick.button(preset.button);
            button.is_pressed().then_some((preset.target, button.is_now_pressed()))
        });
        if let Some((target, new_press)) = pressed {
            let target = target.clamp(self.config.reverse_limit, self.config.forward_limit);
            if self.position.target() != Some(target) {
                info!("Moving arm to preset {target}");
                self.position.set_target(target);
            } else if new_press && self.position.status() == PositionStatus::Unreachable {
                info!("Retrying arm preset {target}");
                self.position.retry();
            }
        }

        if self.position.target().is_some() {
            self.chase()
        } else {
            self.manual(0.0)
        }
    }

    fn manual(&mut self, input: f64) -> Result<ArmMode, ArmError> {
        let position = match self.encoder.position() {
            Ok(position) => position,
            Err(err) => {
                self.hold()?;
                return Err(err.into());
            }
        };

        let power = self.limit(self.manual_power(input), position);
        self.apply(power, IdleMode::Brake)?;
        Ok(ArmMode::Manual)
    }

    fn chase(&mut self) -> Result<ArmMode, ArmError> {
        let position = match self.encoder.position() {
            Ok(position) => position,
            Err(err) => {
                self.hold()?;
                return Err(err.into());
            }
        };

        let command = match self.position.step(position) {
            Ok(command) => command,
            Err(err) => {
                self.hold()?;
                return Err(err.into());
            }
        };

        let power = self.limit(command.power, position);
        self.apply(power, command.idle_mode)?;
        Ok(ArmMode::Preset(command.status))
    }

    /// Commands zero power with the brake engaged.
    ///
    /// # Errors
    ///
    /// Returns an [`ArmError`] if the motor could not be commanded.
    pub fn hold(&mut self) -> Result<(), ArmError> {
        self.apply(0.0, IdleMode::Brake)?;
        Ok(())
    }

    /// Writes the idle mode only when it changes, always before the power.
    fn apply(&mut self, power: f64, idle_mode: IdleMode) -> Result<(), MotorError> {
        if self.idle_mode != Some(idle_mode) {
            self.motor.set_idle_mode(idle_mode)?;
            self.idle_mode = Some(idle_mode);
        }
        self.motor.set(power)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Snafu)]
/// Errors that can occur while running the arm.
pub enum ArmError {
    /// The arm motor failed.
    #[snafu(display("arm motor: {source}"), context(false))]
    Motor {
        /// The source of the error.
        source: MotorError,
    },

    /// The arm encoder failed.
    #[snafu(display("arm encoder: {source}"), context(false))]
    Encoder {
        /// The source of the error.
        source: EncoderError,
    },

    /// The preset hold failed.
    #[snafu(display("arm preset: {source}"), context(false))]
    Position {
        /// The source of the error.
        source: PositionError,
    },
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use chargedup_devices::{
        BusError,
        controller::Joystick,
        sim::{MotorCommand, SimDriverStation, SimEncoder, SimMotor},
    };

    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    struct Rig {
        arm: Arm,
        motor: SimMotor,
        encoder: SimEncoder,
        station: SimDriverStation,
        joystick: Joystick,
    }

    impl Rig {
        fn new() -> Self {
            let motor = SimMotor::new(9);
            let encoder = SimEncoder::new(9);
            let station = SimDriverStation::new();
            let joystick = Joystick::new(1, Rc::new(station.clone()));
            let arm = Arm::new(
                Box::new(motor.clone()),
                Box::new(encoder.clone()),
                ArmConfig::default(),
                PERIOD,
            );
            Self {
                arm,
                motor,
                encoder,
                station,
                joystick,
            }
        }

        fn update(&mut self) -> Result<ArmMode, ArmError> {
            let state = self.joystick.state().unwrap();
            self.arm.update(&state)
        }
    }

    #[test]
    fn manual_jog_is_fixed_power_in_brake() {
        let mut rig = Rig::new();
        assert_eq!(rig.arm.manual_power(0.5), 0.1);
        assert_eq!(rig.arm.manual_power(-0.02), -0.1);
        assert_eq!(rig.arm.manual_power(0.005), 0.0);

        rig.station.set_axis(1, 1, -0.8);
        assert_eq!(rig.update().unwrap(), ArmMode::Manual);
        assert_eq!(
            rig.motor.commands(),
            [MotorCommand::IdleMode(IdleMode::Brake), MotorCommand::Power(-0.1)]
        );
    }

    #[test]
    fn soft_limits_stop_outward_motion() {
        let mut rig = Rig::new();
        rig.encoder.set_raw(-36.0);
        rig.station.set_axis(1, 1, -1.0);
        rig.update().unwrap();
        assert_eq!(rig.motor.power(), 0.0);

        rig.station.set_axis(1, 1, 1.0);
        rig.update().unwrap();
        assert_eq!(rig.motor.power(), 0.1);

        rig.encoder.set_raw(1.0);
        rig.update().unwrap();
        assert_eq!(rig.motor.power(), 0.0);
    }

    #[test]
    fn preset_is_chased_after_release_until_converged() {
        let mut rig = Rig::new();
        rig.station.press(1, 8);
        assert_eq!(rig.update().unwrap(), ArmMode::Preset(PositionStatus::Seeking));
        assert_eq!(rig.arm.preset_target(), Some(-5.0));
        assert_eq!(
            rig.motor.commands(),
            [MotorCommand::IdleMode(IdleMode::Coast), MotorCommand::Power(-1.0)]
        );

        rig.station.release(1, 8);
        rig.encoder.set_raw(-3.0);
        assert_eq!(rig.update().unwrap(), ArmMode::Preset(PositionStatus::Seeking));

        rig.encoder.set_raw(-4.8);
        rig.motor.clear_commands();
        assert_eq!(rig.update().unwrap(), ArmMode::Preset(PositionStatus::Converged));
        assert_eq!(
            rig.motor.commands(),
            [MotorCommand::IdleMode(IdleMode::Brake), MotorCommand::Power(0.0)]
        );

        // Holding does not rewrite the idle mode.
        rig.motor.clear_commands();
        rig.update().unwrap();
        assert_eq!(rig.motor.commands(), [MotorCommand::Power(0.0)]);
    }

    #[test]
    fn manual_input_cancels_preset_in_the_same_step() {
        let mut rig = Rig::new();
        rig.station.press(1, 12);
        rig.update().unwrap();
        assert_eq!(rig.arm.preset_target(), Some(-30.0));

        rig.station.set_axis(1, 1, 0.5);
        assert_eq!(rig.update().unwrap(), ArmMode::Manual);
        assert_eq!(rig.arm.preset_target(), None);
        assert_eq!(rig.motor.power(), 0.1);
        assert_eq!(rig.motor.current_idle_mode(), IdleMode::Brake);
    }

    #[test]
    fn lowest_numbered_preset_wins() {
        let mut rig = Rig::new();
        rig.station.press(1, 12);
        rig.station.press(1, 10);
        rig.update().unwrap();
        assert_eq!(rig.arm.preset_target(), Some(-20.0));
    }

    #[test]
    fn encoder_failure_holds() {
        let mut rig = Rig::new();
        rig.station.press(1, 10);
        rig.update().unwrap();

        rig.encoder.set_connected(false);
        assert_eq!(
            rig.update(),
            Err(ArmError::Encoder {
                source: EncoderError::Bus {
                    source: BusError::Disconnected { id: 9 }
                }
            })
        );
        assert_eq!(rig.motor.power(), 0.0);
        assert_eq!(rig.motor.current_idle_mode(), IdleMode::Brake);
    }

    #[test]
    fn unreachable_preset_is_reported_then_held() {
        let mut rig = Rig::new();
        rig.station.press(1, 10);
        for _ in 0..150 {
            rig.update().unwrap();
        }
        assert!(matches!(
            rig.update(),
            Err(ArmError::Position {
                source: PositionError::TargetUnreachable { .. }
            })
        ));
        rig.station.release(1, 10);
        assert_eq!(rig.update().unwrap(), ArmMode::Preset(PositionStatus::Unreachable));
        assert_eq!(rig.motor.power(), 0.0);
    }

    #[test]
    fn held_button_does_not_restart_an_unreachable_preset() {
        let mut rig = Rig::new();
        rig.station.press(1, 10);

        let mut failures = 0;
        let mut seeking = 0;
        for _ in 0..400 {
            match rig.update() {
                Err(ArmError::Position {
                    source: PositionError::TargetUnreachable { .. },
                }) => failures += 1,
                Ok(ArmMode::Preset(PositionStatus::Seeking)) => seeking += 1,
                Ok(ArmMode::Preset(PositionStatus::Unreachable)) => {}
                other => panic!("unexpected update {other:?}"),
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(seeking, 150);
        assert_eq!(rig.motor.power(), 0.0);
        assert_eq!(rig.motor.current_idle_mode(), IdleMode::Brake);

        // A fresh press starts a new attempt.
        rig.station.release(1, 10);
        rig.update().unwrap();
        rig.station.press(1, 10);
        assert_eq!(rig.update().unwrap(), ArmMode::Preset(PositionStatus::Seeking));
        assert_eq!(rig.motor.power(), -1.0);
        assert_eq!(rig.motor.current_idle_mode(), IdleMode::Coast);
    }

    #[test]
    fn hold_brakes_a_chasing_arm() {
        let mut rig = Rig::new();
        rig.station.press(1, 12);
        rig.update().unwrap();
        assert_eq!(rig.motor.current_idle_mode(), IdleMode::Coast);

        rig.arm.cancel();
        rig.motor.clear_commands();
        rig.arm.hold().unwrap();
        assert_eq!(
            rig.motor.commands(),
            [MotorCommand::IdleMode(IdleMode::Brake), MotorCommand::Power(0.0)]
        );
    }
}
