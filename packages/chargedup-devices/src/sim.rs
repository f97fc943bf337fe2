//! In-memory devices for simulation and tests.
//!
//! Every simulated device is a cheap handle around shared state. Clone a handle,
//! give one copy to the robot, and keep the other to inspect commands or to
//! inject readings and faults.

use std::{cell::RefCell, rc::Rc};

use crate::{
    BusError,
    controller::{JoystickError, JoystickReport, JoystickSource, MAX_AXES, MAX_BUTTONS, MAX_JOYSTICKS},
    encoder::{Encoder, EncoderError, validate_position},
    gyro::{Gyro, GyroError, validate_tilt},
    motor::{IdleMode, Motor, MotorError, MotorFaults, clamp_power},
};

/// A command received by a [`SimMotor`], in the order it arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    /// A power command, after clamping.
    Power(f64),
    /// An idle mode change.
    IdleMode(IdleMode),
}

#[derive(Debug, Default)]
struct SimMotorState {
    power: f64,
    idle_mode: IdleMode,
    faults: Option<MotorFaults>,
    disconnected: bool,
    commands: Vec<MotorCommand>,
}

/// A simulated motor controller.
#[derive(Debug, Clone)]
pub struct SimMotor {
    id: u8,
    state: Rc<RefCell<SimMotorState>>,
}

impl SimMotor {
    /// Creates a motor at the given CAN id.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            state: Rc::default(),
        }
    }

    /// The CAN id of this motor.
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// The last power accepted by the motor.
    #[must_use]
    pub fn power(&self) -> f64 {
        self.state.borrow().power
    }

    /// The idle mode currently configured.
    #[must_use]
    pub fn current_idle_mode(&self) -> IdleMode {
        self.state.borrow().idle_mode
    }

    /// Every accepted command since creation or the last [`clear_commands`](Self::clear_commands).
    #[must_use]
    pub fn commands(&self) -> Vec<MotorCommand> {
        self.state.borrow().commands.clone()
    }

    /// Forgets the recorded commands.
    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Makes the motor stop answering on the bus.
    pub fn disconnect(&self) {
        self.state.borrow_mut().disconnected = true;
    }

    /// Latches faults. Commands are refused until [`clear_faults`](Self::clear_faults).
    pub fn inject_faults(&self, faults: MotorFaults) {
        self.state.borrow_mut().faults = Some(faults);
    }

    /// Clears latched faults.
    pub fn clear_faults(&self) {
        self.state.borrow_mut().faults = None;
    }

    fn check(&self) -> Result<(), MotorError> {
        let state = self.state.borrow();
        if state.disconnected {
            return Err(BusError::Disconnected { id: self.id }.into());
        }
        if let Some(faults) = state.faults {
            return Err(MotorError::Faulted { faults });
        }
        Ok(())
    }
}

impl Motor for SimMotor {
    fn set(&mut self, power: f64) -> Result<(), MotorError> {
        self.check()?;
        let power = clamp_power(power);
        let mut state = self.state.borrow_mut();
        state.power = power;
        state.commands.push(MotorCommand::Power(power));
        Ok(())
    }

    fn get(&self) -> Result<f64, MotorError> {
        self.check()?;
        Ok(self.power())
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<(), MotorError> {
        self.check()?;
        let mut state = self.state.borrow_mut();
        state.idle_mode = mode;
        state.commands.push(MotorCommand::IdleMode(mode));
        Ok(())
    }

    fn idle_mode(&self) -> Result<IdleMode, MotorError> {
        self.check()?;
        Ok(self.current_idle_mode())
    }
}

#[derive(Debug, Default)]
struct SimEncoderState {
    position: f64,
    disconnected: bool,
}

/// A simulated incremental encoder.
#[derive(Debug, Clone)]
pub struct SimEncoder {
    id: u8,
    state: Rc<RefCell<SimEncoderState>>,
}

impl SimEncoder {
    /// Creates an encoder reporting through the controller at `id`.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            state: Rc::default(),
        }
    }

    /// Moves the simulated shaft by `rotations`.
    pub fn advance(&self, rotations: f64) {
        self.state.borrow_mut().position += rotations;
    }

    /// Forces the raw reading, bypassing validation. Useful for injecting NaN.
    pub fn set_raw(&self, position: f64) {
        self.state.borrow_mut().position = position;
    }

    /// The raw reading.
    #[must_use]
    pub fn raw(&self) -> f64 {
        self.state.borrow().position
    }

    /// Makes the encoder stop answering, or answer again.
    pub fn set_connected(&self, connected: bool) {
        self.state.borrow_mut().disconnected = !connected;
    }
}

impl Encoder for SimEncoder {
    fn position(&self) -> Result<f64, EncoderError> {
        let state = self.state.borrow();
        if state.disconnected {
            return Err(BusError::Disconnected { id: self.id }.into());
        }
        validate_position(state.position)
    }

    fn set_position(&mut self, position: f64) -> Result<(), EncoderError> {
        let mut state = self.state.borrow_mut();
        if state.disconnected {
            return Err(BusError::Disconnected { id: self.id }.into());
        }
        state.position = position;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SimGyroState {
    roll: f64,
    calibration_reads: u32,
    stale: bool,
}

/// A simulated inertial sensor.
///
/// Calibration lasts a fixed number of reads instead of a fixed time so that
/// tests stay deterministic.
#[derive(Debug, Clone)]
pub struct SimGyro {
    id: u8,
    calibration_length: u32,
    state: Rc<RefCell<SimGyroState>>,
}

impl SimGyro {
    /// Creates a gyro whose calibration lasts `calibration_length` reads.
    #[must_use]
    pub fn new(id: u8, calibration_length: u32) -> Self {
        Self {
            id,
            calibration_length,
            state: Rc::default(),
        }
    }

    /// Sets the simulated roll, in degrees.
    pub fn set_roll(&self, degrees: f64) {
        self.state.borrow_mut().roll = degrees;
    }

    /// The simulated roll, in degrees.
    #[must_use]
    pub fn true_roll(&self) -> f64 {
        self.state.borrow().roll
    }

    /// Marks readings as stale (or fresh again).
    pub fn set_stale(&self, stale: bool) {
        self.state.borrow_mut().stale = stale;
    }
}

impl Gyro for SimGyro {
    fn roll(&self) -> Result<f64, GyroError> {
        let mut state = self.state.borrow_mut();
        if state.stale {
            return Err(BusError::Stale { id: self.id }.into());
        }
        if state.calibration_reads > 0 {
            state.calibration_reads -= 1;
            return Err(GyroError::StillCalibrating);
        }
        validate_tilt(state.roll)
    }

    fn calibrate(&mut self) -> Result<(), GyroError> {
        self.state.borrow_mut().calibration_reads = self.calibration_length;
        Ok(())
    }

    fn is_calibrating(&self) -> Result<bool, GyroError> {
        Ok(self.state.borrow().calibration_reads > 0)
    }
}

/// A simulated driver station serving joystick reports.
#[derive(Debug, Clone)]
pub struct SimDriverStation {
    reports: Rc<RefCell<[Option<JoystickReport>; MAX_JOYSTICKS as usize]>>,
}

impl Default for SimDriverStation {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriverStation {
    /// Creates a driver station with a centered joystick on every port.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Rc::new(RefCell::new([Some(JoystickReport::default()); MAX_JOYSTICKS as usize])),
        }
    }

    fn with_report(&self, port: u8, f: impl FnOnce(&mut JoystickReport)) {
        if let Some(Some(report)) = self.reports.borrow_mut().get_mut(usize::from(port)) {
            f(report);
        }
    }

    /// Sets one axis of the joystick on `port`.
    pub fn set_axis(&self, port: u8, axis: usize, value: f64) {
        if axis < MAX_AXES {
            self.with_report(port, |report| report.axes[axis] = value);
        }
    }

    /// Presses a button (numbered from 1) on the joystick on `port`.
    pub fn press(&self, port: u8, button: usize) {
        if (1..=MAX_BUTTONS).contains(&button) {
            self.with_report(port, |report| report.buttons |= 1 << (button - 1));
        }
    }

    /// Releases a button (numbered from 1) on the joystick on `port`.
    pub fn release(&self, port: u8, button: usize) {
        if (1..=MAX_BUTTONS).contains(&button) {
            self.with_report(port, |report| report.buttons &= !(1 << (button - 1)));
        }
    }

    /// Centers every axis and releases every button on `port`.
    pub fn reset(&self, port: u8) {
        self.with_report(port, |report| *report = JoystickReport::default());
    }

    /// Unplugs the joystick on `port`.
    pub fn unplug(&self, port: u8) {
        if let Some(slot) = self.reports.borrow_mut().get_mut(usize::from(port)) {
            *slot = None;
        }
    }
}

impl JoystickSource for SimDriverStation {
    fn report(&self, port: u8) -> Result<JoystickReport, JoystickError> {
        self.reports
            .borrow()
            .get(usize::from(port))
            .copied()
            .flatten()
            .ok_or(JoystickError::Unplugged { port })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn motor_records_commands_in_order() {
        let handle = SimMotor::new(9);
        let mut motor: Box<dyn Motor> = Box::new(handle.clone());

        motor.set_idle_mode(IdleMode::Brake).unwrap();
        motor.set(-0.3).unwrap();
        motor.stop().unwrap();

        assert_eq!(
            handle.commands(),
            [
                MotorCommand::IdleMode(IdleMode::Brake),
                MotorCommand::Power(-0.3),
                MotorCommand::Power(0.0),
            ]
        );
        assert_eq!(motor.idle_mode().unwrap(), IdleMode::Brake);
    }

    #[test]
    fn faulted_motor_refuses_commands() {
        let handle = SimMotor::new(9);
        let mut motor = handle.clone();
        handle.inject_faults(MotorFaults::OVER_CURRENT);

        assert_eq!(
            motor.set(0.5),
            Err(MotorError::Faulted { faults: MotorFaults::OVER_CURRENT })
        );
        handle.clear_faults();
        motor.set(0.5).unwrap();
        assert_eq!(handle.power(), 0.5);
    }

    #[test]
    fn encoder_zeroing_and_motion() {
        let handle = SimEncoder::new(9);
        let mut encoder = handle.clone();

        handle.advance(-3.25);
        assert_relative_eq!(encoder.position().unwrap(), -3.25);

        encoder.set_position(0.0).unwrap();
        handle.advance(0.5);
        assert_relative_eq!(encoder.position().unwrap(), 0.5);

        handle.set_raw(f64::NAN);
        assert!(encoder.position().is_err());

        handle.set_connected(false);
        assert_eq!(
            encoder.position().unwrap_err(),
            EncoderError::Bus { source: BusError::Disconnected { id: 9 } }
        );
    }

    #[test]
    fn gyro_calibrates_then_reads() {
        let handle = SimGyro::new(0, 2);
        let mut gyro = handle.clone();
        handle.set_roll(12.0);

        gyro.calibrate().unwrap();
        assert!(gyro.is_calibrating().unwrap());
        assert_eq!(gyro.roll(), Err(GyroError::StillCalibrating));
        assert_eq!(gyro.roll(), Err(GyroError::StillCalibrating));
        assert_eq!(gyro.roll(), Ok(12.0));

        handle.set_stale(true);
        assert_eq!(
            gyro.roll(),
            Err(GyroError::Bus { source: BusError::Stale { id: 0 } })
        );
    }
}
