//! Arcade drive mixing
//!
//! Converts a forward command and a turn command into left and right side
//! powers. The speed scale either comes straight from code or from the flight
//! stick's throttle slider, which reads -1 when pushed fully forward and 1 when
//! pulled fully back.

use chargedup_devices::motor::clamp_power;

/// Power commands for the two sides of a differential drivetrain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPowers {
    /// Left side power.
    pub left: f64,
    /// Right side power.
    pub right: f64,
}

/// Arcade drive mixer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveMixer {
    max_power: f64,
}

impl Default for DriveMixer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_POWER)
    }
}

impl DriveMixer {
    /// The speed scale reached with the slider pushed fully forward.
    pub const DEFAULT_MAX_POWER: f64 = 0.5;

    /// Creates a mixer whose slider tops out at `max_power`.
    #[must_use]
    pub const fn new(max_power: f64) -> Self {
        Self { max_power }
    }

    /// The speed scale reached with the slider pushed fully forward.
    #[must_use]
    pub const fn max_power(&self) -> f64 {
        self.max_power
    }

    /// Maps a raw slider reading in `[-1, 1]` to a speed scale in `[0, max_power]`.
    #[must_use]
    pub fn slider_scale(&self, raw: f64) -> f64 {
        self.max_power * (raw - 1.0).abs() / 2.0
    }

    /// Mixes forward and turn commands, both scaled by `speed_scale`.
    ///
    /// When `scale_is_slider` is set, `speed_scale` is a raw slider reading and
    /// goes through [`slider_scale`](Self::slider_scale) first.
    #[must_use]
    pub fn mix(&self, forward: f64, turn: f64, speed_scale: f64, scale_is_slider: bool) -> WheelPowers {
        let scale = if scale_is_slider {
            self.slider_scale(speed_scale)
        } else {
            speed_scale
        };

        let forward = forward * scale;
        let turn = turn * scale;

        WheelPowers {
            left: clamp_power(forward + turn),
            right: clamp_power(forward - turn),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn straight_full_power() {
        let mixer = DriveMixer::default();
        assert_eq!(mixer.mix(1.0, 0.0, 1.0, false), WheelPowers { left: 1.0, right: 1.0 });
    }

    #[test]
    fn slider_range() {
        let mixer = DriveMixer::default();
        assert_eq!(mixer.slider_scale(1.0), 0.0);
        assert_relative_eq!(mixer.slider_scale(0.0), 0.25);
        assert_relative_eq!(mixer.slider_scale(-1.0), 0.5);

        assert_eq!(mixer.mix(1.0, 1.0, 1.0, true), WheelPowers::default());
    }

    #[test]
    fn turning_splits_sides() {
        let mixer = DriveMixer::default();
        let powers = mixer.mix(0.5, 0.25, -1.0, true);
        assert_relative_eq!(powers.left, 0.375);
        assert_relative_eq!(powers.right, 0.125);

        let powers = mixer.mix(0.0, 1.0, 1.0, false);
        assert_eq!(powers, WheelPowers { left: 1.0, right: -1.0 });
    }

    #[test]
    fn outputs_are_clamped() {
        let mixer = DriveMixer::default();
        for forward in [-1.0, -0.5, 0.0, 0.5, 1.0] {
            for turn in [-1.0, -0.3, 0.0, 0.3, 1.0] {
                for scale in [0.0, 0.5, 1.0] {
                    let powers = mixer.mix(forward, turn, scale, false);
                    assert!((-1.0..=1.0).contains(&powers.left));
                    assert!((-1.0..=1.0).contains(&powers.right));
                }
            }
        }
        assert_eq!(mixer.mix(1.0, 1.0, 1.0, false), WheelPowers { left: 1.0, right: 0.0 });
    }
}
