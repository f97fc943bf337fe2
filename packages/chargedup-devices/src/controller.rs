//! Driver station joysticks
//!
//! The driver station forwards one [`JoystickReport`] per connected joystick.
//! A [`Joystick`] turns those reports into a [`JoystickState`], remembering the
//! previous button states so that presses and releases can be detected.

use std::{cell::Cell, rc::Rc, time::Duration};

use snafu::Snafu;

/// Number of joystick ports on the driver station.
pub const MAX_JOYSTICKS: u8 = 6;

/// Number of axes reported per joystick.
pub const MAX_AXES: usize = 6;

/// Number of buttons reported per joystick. Buttons are numbered from 1.
pub const MAX_BUTTONS: usize = 16;

/// The raw axes and buttons of one joystick, as sent by the driver station.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct JoystickReport {
    /// Axis values in `[-1.0, 1.0]`.
    pub axes: [f64; MAX_AXES],
    /// Button bits. Bit `n - 1` holds button `n`.
    pub buttons: u16,
}

/// Something that can provide joystick reports, usually the driver station.
pub trait JoystickSource {
    /// Returns the latest report for the joystick on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`JoystickError::Unplugged`] if nothing is connected to `port`.
    fn report(&self, port: u8) -> Result<JoystickReport, JoystickError>;
}

/// Represents the state of a button on the joystick.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    prev_is_pressed: bool,
    is_pressed: bool,
}

impl ButtonState {
    /// Returns `true` if this button is currently being pressed.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.is_pressed
    }

    /// Returns `true` if this button is currently released (not being pressed).
    #[must_use]
    pub const fn is_released(&self) -> bool {
        !self.is_pressed
    }

    /// Returns `true` if the button state was released in the previous call to [`Joystick::state`], but is now pressed.
    #[must_use]
    pub const fn is_now_pressed(&self) -> bool {
        !self.prev_is_pressed && self.is_pressed
    }

    /// Returns `true` if the button state was pressed in the previous call to [`Joystick::state`], but is now released.
    #[must_use]
    pub const fn is_now_released(&self) -> bool {
        self.prev_is_pressed && !self.is_pressed
    }
}

/// Holds a snapshot of the state of a joystick.
/// Returned by [`Joystick::state`].
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct JoystickState {
    axes: [f64; MAX_AXES],
    buttons: [ButtonState; MAX_BUTTONS],
}

impl JoystickState {
    /// Side to side deflection, from -1 (left) to 1 (right).
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.axes[0]
    }

    /// Forward and back deflection, from -1 (forward) to 1 (back).
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.axes[1]
    }

    /// Twist, from -1 to 1.
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.axes[2]
    }

    /// Returns the value of any axis, or 0.0 for an axis that does not exist.
    #[must_use]
    pub fn raw_axis(&self, axis: usize) -> f64 {
        self.axes.get(axis).copied().unwrap_or_default()
    }

    /// Returns the state of a button, numbered from 1. Buttons that do not exist
    /// read as released.
    #[must_use]
    pub fn button(&self, button: usize) -> ButtonState {
        button
            .checked_sub(1)
            .and_then(|index| self.buttons.get(index))
            .copied()
            .unwrap_or_default()
    }
}

/// A joystick plugged into one port of the driver station.
pub struct Joystick {
    port: u8,
    source: Rc<dyn JoystickSource>,
    prev_buttons: Cell<u16>,
}

impl core::fmt::Debug for Joystick {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Joystick")
            .field("port", &self.port)
            .field("prev_buttons", &self.prev_buttons.get())
            .finish_non_exhaustive()
    }
}

impl Joystick {
    /// The rate at which the driver station sends new reports.
    pub const UPDATE_INTERVAL: Duration = Duration::from_millis(20);

    /// Creates a joystick reading `port` of `source`.
    #[must_use]
    pub fn new(port: u8, source: Rc<dyn JoystickSource>) -> Self {
        Self {
            port,
            source,
            prev_buttons: Cell::new(0),
        }
    }

    /// The driver station port of this joystick.
    #[must_use]
    pub const fn port(&self) -> u8 {
        self.port
    }

    /// Returns the current state of all axes and buttons.
    ///
    /// Edge detection ([`ButtonState::is_now_pressed`]) compares against the
    /// previous call, so call this once per control step.
    ///
    /// # Errors
    ///
    /// - A [`JoystickError::InvalidPort`] error if the port does not exist.
    /// - A [`JoystickError::Unplugged`] error if nothing is connected.
    pub fn state(&self) -> Result<JoystickState, JoystickError> {
        if self.port >= MAX_JOYSTICKS {
            return InvalidPortSnafu { port: self.port }.fail();
        }

        let report = self.source.report(self.port)?;
        let prev = self.prev_buttons.replace(report.buttons);

        let mut state = JoystickState::default();
        for (axis, raw) in state.axes.iter_mut().zip(report.axes) {
            *axis = if raw.is_nan() { 0.0 } else { raw.clamp(-1.0, 1.0) };
        }
        for (index, button) in state.buttons.iter_mut().enumerate() {
            *button = ButtonState {
                prev_is_pressed: prev & (1 << index) != 0,
                is_pressed: report.buttons & (1 << index) != 0,
            };
        }

        Ok(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Snafu)]
/// Errors that can occur when reading a joystick.
pub enum JoystickError {
    /// Nothing is plugged into the port.
    #[snafu(display("no joystick connected on port {port}"))]
    Unplugged {
        /// The driver station port.
        port: u8,
    },

    /// The port number is larger than the driver station supports.
    #[snafu(display("joystick port {port} does not exist"))]
    InvalidPort {
        /// The driver station port.
        port: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimDriverStation;

    #[test]
    fn button_edges() {
        let station = SimDriverStation::new();
        let joystick = Joystick::new(1, Rc::new(station.clone()));

        station.press(1, 8);
        let state = joystick.state().unwrap();
        assert!(state.button(8).is_pressed());
        assert!(state.button(8).is_now_pressed());

        let state = joystick.state().unwrap();
        assert!(state.button(8).is_pressed());
        assert!(!state.button(8).is_now_pressed());

        station.release(1, 8);
        let state = joystick.state().unwrap();
        assert!(state.button(8).is_released());
        assert!(state.button(8).is_now_released());
    }

    #[test]
    fn out_of_range_inputs_read_as_neutral() {
        let station = SimDriverStation::new();
        let joystick = Joystick::new(0, Rc::new(station.clone()));
        station.set_axis(0, 1, f64::NAN);
        station.set_axis(0, 3, 4.0);

        let state = joystick.state().unwrap();
        assert_eq!(state.y(), 0.0);
        assert_eq!(state.raw_axis(3), 1.0);
        assert_eq!(state.raw_axis(MAX_AXES), 0.0);
        assert!(state.button(0).is_released());
        assert!(state.button(MAX_BUTTONS + 1).is_released());
    }

    #[test]
    fn unplugged_and_invalid_ports() {
        let station = SimDriverStation::new();
        station.unplug(2);

        let unplugged = Joystick::new(2, Rc::new(station.clone()));
        assert_eq!(
            unplugged.state().unwrap_err(),
            JoystickError::Unplugged { port: 2 }
        );

        let invalid = Joystick::new(MAX_JOYSTICKS, Rc::new(station));
        assert_eq!(
            invalid.state().unwrap_err(),
            JoystickError::InvalidPort { port: MAX_JOYSTICKS }
        );
    }
}
