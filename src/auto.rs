//! Autonomous routines and the dashboard chooser that selects them.

use std::{fmt, str::FromStr};

use chargedup_control::balance::BalanceController;
use log::{debug, info};
use snafu::Snafu;

/// The autonomous routines the robot knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRoutine {
    /// Do nothing.
    #[default]
    Default,
    /// Placeholder for a match-specific routine. Does nothing yet.
    Custom,
    /// Drive onto the charge station and level it.
    Autobalance,
}

impl AutoRoutine {
    /// Every routine, in chooser order.
    pub const ALL: [Self; 3] = [Self::Default, Self::Custom, Self::Autobalance];

    /// The name shown on the dashboard.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::Custom => "My Auto",
            Self::Autobalance => "Autobalance",
        }
    }
}

impl fmt::Display for AutoRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AutoRoutine {
    type Err = ChooserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|routine| routine.name() == s)
            .ok_or_else(|| ChooserError::InvalidMode { name: s.to_owned() })
    }
}

/// Errors that can occur when selecting an autonomous routine.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ChooserError {
    /// The name does not match any registered routine.
    #[snafu(display("unknown autonomous mode {name:?}"))]
    InvalidMode {
        /// The rejected name.
        name: String,
    },
}

/// Lets the drive team pick an autonomous routine before the match.
#[derive(Debug, Clone, Default)]
pub struct AutoChooser {
    default: AutoRoutine,
    options: Vec<AutoRoutine>,
    selected: Option<AutoRoutine>,
}

impl AutoChooser {
    /// Creates an empty chooser whose fallback is [`AutoRoutine::Default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `routine` and makes it the fallback.
    pub fn set_default_option(&mut self, routine: AutoRoutine) {
        self.default = routine;
        self.add_option(routine);
    }

    /// Registers `routine`.
    pub fn add_option(&mut self, routine: AutoRoutine) {
        if !self.options.contains(&routine) {
            self.options.push(routine);
        }
    }

    /// The registered routines, in registration order.
    #[must_use]
    pub fn options(&self) -> &[AutoRoutine] {
        &self.options
    }

    /// Selects a routine by its dashboard name.
    ///
    /// # Errors
    ///
    /// Returns [`ChooserError::InvalidMode`] if no registered routine has that
    /// name. The selection then falls back to the default.
    pub fn select(&mut self, name: &str) -> Result<AutoRoutine, ChooserError> {
        let routine = name
            .parse()
            .ok()
            .filter(|routine| self.options.contains(routine));

        self.selected = routine;
        routine.ok_or_else(|| ChooserError::InvalidMode { name: name.to_owned() })
    }

    /// The selected routine, or the default if nothing valid was selected.
    #[must_use]
    pub fn selected(&self) -> AutoRoutine {
        self.selected.unwrap_or(self.default)
    }
}

/// Levels the robot on the charge station, one step at a time.
///
/// The robot counts as balanced once the balance output has been zero for
/// `settle_ticks` consecutive steps. Tipping out of the dead-band again resumes
/// correction.
#[derive(Debug, Clone)]
pub struct Autobalance {
    controller: BalanceController,
    settle_ticks: u32,
    level_ticks: u32,
    balanced: bool,
}

impl Autobalance {
    /// Creates the routine.
    #[must_use]
    pub const fn new(controller: BalanceController, settle_ticks: u32) -> Self {
        Self {
            controller,
            settle_ticks,
            level_ticks: 0,
            balanced: false,
        }
    }

    /// Forgets any progress, for the start of a new match.
    pub const fn reset(&mut self) {
        self.level_ticks = 0;
        self.balanced = false;
    }

    /// Returns `true` once the robot has stayed level long enough.
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.balanced
    }

    /// Computes this step's drive power from a tilt reading in degrees.
    pub fn step(&mut self, tilt: f64) -> f64 {
        let power = self.controller.output(tilt);

        if power == 0.0 {
            self.level_ticks = self.level_ticks.saturating_add(1);
            if !self.balanced && self.level_ticks >= self.settle_ticks {
                self.balanced = true;
                info!("Robot is balanced after {} level steps", self.level_ticks);
            }
        } else {
            if self.balanced {
                debug!("Tilted to {tilt} degrees, resuming balance");
            }
            self.level_ticks = 0;
            self.balanced = false;
        }

        power
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn chooser() -> AutoChooser {
        let mut chooser = AutoChooser::new();
        chooser.set_default_option(AutoRoutine::Default);
        chooser.add_option(AutoRoutine::Custom);
        chooser.add_option(AutoRoutine::Autobalance);
        chooser
    }

    #[test]
    fn names_round_trip() {
        for routine in AutoRoutine::ALL {
            assert_eq!(routine.name().parse::<AutoRoutine>(), Ok(routine));
        }
        assert_eq!(AutoRoutine::Custom.to_string(), "My Auto");
    }

    #[test]
    fn selects_registered_routines() {
        let mut chooser = chooser();
        assert_eq!(chooser.selected(), AutoRoutine::Default);
        assert_eq!(chooser.select("Autobalance"), Ok(AutoRoutine::Autobalance));
        assert_eq!(chooser.selected(), AutoRoutine::Autobalance);
        assert_eq!(chooser.options().len(), 3);
    }

    #[test]
    fn unknown_selection_falls_back_to_default() {
        let mut chooser = chooser();
        chooser.select("Autobalance").unwrap();

        assert_eq!(
            chooser.select("Score Three"),
            Err(ChooserError::InvalidMode {
                name: String::from("Score Three")
            })
        );
        assert_eq!(chooser.selected(), AutoRoutine::Default);
    }

    #[test]
    fn unregistered_routine_is_invalid() {
        let mut chooser = AutoChooser::new();
        chooser.set_default_option(AutoRoutine::Default);
        assert!(chooser.select("Autobalance").is_err());
        assert_eq!(chooser.selected(), AutoRoutine::Default);
    }

    #[test]
    fn settles_after_consecutive_level_steps() {
        let mut routine = Autobalance::new(BalanceController::default(), 3);

        assert_relative_eq!(routine.step(10.0), -0.12);
        routine.step(1.0);
        routine.step(-1.0);
        assert!(!routine.is_balanced());
        // A tilted step restarts the count.
        routine.step(5.0);
        routine.step(0.0);
        routine.step(0.0);
        assert!(!routine.is_balanced());
        assert_eq!(routine.step(0.0), 0.0);
        assert!(routine.is_balanced());

        assert_relative_eq!(routine.step(-20.0), 0.2);
        assert!(!routine.is_balanced());

        routine.reset();
        assert!(!routine.is_balanced());
    }
}
