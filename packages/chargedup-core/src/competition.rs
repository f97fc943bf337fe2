//! Robot mode dispatch.
//!
//! The driver station reports a [`ControlWord`] every packet. The
//! [`ModeDispatcher`] turns those words into calls on a [`TimedRobot`], one call
//! per control step. Mode changes run the exit hook of the previous mode and the
//! init hook of the new one *before* the periodic hook of the same step, so
//! anything a mode left running is torn down within a single step.

use bitflags::bitflags;
use log::{debug, info};

use crate::time::PeriodicTimer;

bitflags! {
    /// The control bits reported by the driver station.
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct ControlWord: u32 {
        /// Robot outputs are enabled.
        const ENABLED = 1 << 0;

        /// Robot is in autonomous mode.
        const AUTONOMOUS = 1 << 1;

        /// Robot is in test mode.
        const TEST = 1 << 2;

        /// The emergency stop has been pressed. Overrides every other bit.
        const ESTOP = 1 << 3;

        /// Robot is connected to the field management system.
        const FMS_ATTACHED = 1 << 4;

        /// A driver station is connected.
        const DS_ATTACHED = 1 << 5;
    }
}

/// Represents a possible mode that robots can be set in during a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotMode {
    /// Outputs are disabled. Motor controllers ignore commands and coast.
    Disabled,

    /// Autonomous period. Joystick input is not available.
    Autonomous,

    /// Operator control.
    Teleop,

    /// Test mode, used in the pit for mechanism bring-up.
    Test,
}

/// Represents a type of system used to control the robot's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSystem {
    /// Mode is controlled by the field management system.
    FieldControl,

    /// Mode is controlled by a driver station laptop.
    DriverStation,
}

impl ControlWord {
    /// Control word for an enabled autonomous period.
    pub const AUTONOMOUS_ENABLED: Self = Self::ENABLED
        .union(Self::AUTONOMOUS)
        .union(Self::DS_ATTACHED);

    /// Control word for an enabled teleoperated period.
    pub const TELEOP_ENABLED: Self = Self::ENABLED.union(Self::DS_ATTACHED);

    /// Control word for enabled test mode.
    pub const TEST_ENABLED: Self = Self::ENABLED.union(Self::TEST).union(Self::DS_ATTACHED);

    /// Checks if outputs are allowed to move. An e-stop always disables.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.contains(Self::ENABLED) && !self.contains(Self::ESTOP)
    }

    /// Gets the current robot mode from these control bits.
    #[must_use]
    pub const fn mode(&self) -> RobotMode {
        if !self.enabled() {
            RobotMode::Disabled
        } else if self.contains(Self::TEST) {
            RobotMode::Test
        } else if self.contains(Self::AUTONOMOUS) {
            RobotMode::Autonomous
        } else {
            RobotMode::Teleop
        }
    }

    /// Gets the type of system currently controlling the robot, or [`None`] if
    /// nothing is connected.
    #[must_use]
    pub const fn system(&self) -> Option<ControlSystem> {
        if self.contains(Self::FMS_ATTACHED) {
            Some(ControlSystem::FieldControl)
        } else if self.contains(Self::DS_ATTACHED) {
            Some(ControlSystem::DriverStation)
        } else {
            None
        }
    }
}

/// A set of hooks run by the [`ModeDispatcher`].
///
/// Every hook has an empty default, so robots only implement what they use.
/// Hooks are called from a fixed-rate loop and must return promptly.
pub trait TimedRobot {
    /// Runs once, before the first control step.
    fn robot_init(&mut self) {}
    /// Runs every control step regardless of mode, after the mode's periodic hook.
    fn robot_periodic(&mut self) {}

    /// Runs when the robot becomes disabled.
    fn disabled_init(&mut self) {}
    /// Runs every step while disabled.
    fn disabled_periodic(&mut self) {}
    /// Runs when the robot leaves disabled mode.
    fn disabled_exit(&mut self) {}

    /// Runs when autonomous mode starts.
    fn autonomous_init(&mut self) {}
    /// Runs every step during autonomous.
    fn autonomous_periodic(&mut self) {}
    /// Runs when autonomous mode ends.
    fn autonomous_exit(&mut self) {}

    /// Runs when operator control starts.
    fn teleop_init(&mut self) {}
    /// Runs every step during operator control.
    fn teleop_periodic(&mut self) {}
    /// Runs when operator control ends.
    fn teleop_exit(&mut self) {}

    /// Runs when test mode starts.
    fn test_init(&mut self) {}
    /// Runs every step during test mode.
    fn test_periodic(&mut self) {}
    /// Runs when test mode ends.
    fn test_exit(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchPhase {
    Uninitialized,
    InMode(RobotMode),
}

/// Runs a [`TimedRobot`] one control step at a time.
#[derive(Debug)]
pub struct ModeDispatcher<R> {
    robot: R,
    phase: DispatchPhase,
    steps: u64,
}

impl<R: TimedRobot> ModeDispatcher<R> {
    /// Wraps a robot. No hook runs until the first [`step`](Self::step).
    pub const fn new(robot: R) -> Self {
        Self {
            robot,
            phase: DispatchPhase::Uninitialized,
            steps: 0,
        }
    }

    /// Runs a single control step for the given control word.
    pub fn step(&mut self, word: ControlWord) {
        if self.phase == DispatchPhase::Uninitialized {
            info!("Robot program starting");
            self.robot.robot_init();
        }

        let mode = word.mode();
        if self.phase != DispatchPhase::InMode(mode) {
            if let DispatchPhase::InMode(old) = self.phase {
                debug!("Leaving {old:?} mode");
                self.exit(old);
            }
            info!("Entering {mode:?} mode");
            self.init(mode);
            self.phase = DispatchPhase::InMode(mode);
        }

        self.periodic(mode);
        self.robot.robot_periodic();
        self.steps += 1;
    }

    /// Steps the robot on every tick of `timer` until `control` returns [`None`].
    ///
    /// `control` receives the number of steps run so far and returns the control
    /// word for the next one.
    pub fn run<F>(&mut self, timer: &mut PeriodicTimer, mut control: F)
    where
        F: FnMut(u64) -> Option<ControlWord>,
    {
        while let Some(word) = control(self.steps) {
            self.step(word);
            timer.wait();
        }
    }

    /// The mode entered by the last step, or [`None`] before the first step.
    #[must_use]
    pub const fn mode(&self) -> Option<RobotMode> {
        match self.phase {
            DispatchPhase::Uninitialized => None,
            DispatchPhase::InMode(mode) => Some(mode),
        }
    }

    /// Number of steps run so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Shared access to the robot.
    #[must_use]
    pub const fn robot(&self) -> &R {
        &self.robot
    }

    /// Exclusive access to the robot.
    pub const fn robot_mut(&mut self) -> &mut R {
        &mut self.robot
    }

    /// Unwraps the robot.
    pub fn into_inner(self) -> R {
        self.robot
    }

    fn init(&mut self, mode: RobotMode) {
        match mode {
            RobotMode::Disabled => self.robot.disabled_init(),
            RobotMode::Autonomous => self.robot.autonomous_init(),
            RobotMode::Teleop => self.robot.teleop_init(),
            RobotMode::Test => self.robot.test_init(),
        }
    }

    fn periodic(&mut self, mode: RobotMode) {
        match mode {
            RobotMode::Disabled => self.robot.disabled_periodic(),
            RobotMode::Autonomous => self.robot.autonomous_periodic(),
            RobotMode::Teleop => self.robot.teleop_periodic(),
            RobotMode::Test => self.robot.test_periodic(),
        }
    }

    fn exit(&mut self, mode: RobotMode) {
        match mode {
            RobotMode::Disabled => self.robot.disabled_exit(),
            RobotMode::Autonomous => self.robot.autonomous_exit(),
            RobotMode::Teleop => self.robot.teleop_exit(),
            RobotMode::Test => self.robot.test_exit(),
        }
    }
}

/// Extension methods for [`TimedRobot`].
/// Automatically implemented for any type implementing [`TimedRobot`].
pub trait TimedRobotExt: TimedRobot + Sized {
    /// Builds a dispatcher that runs this robot.
    fn dispatcher(self) -> ModeDispatcher<Self> {
        ModeDispatcher::new(self)
    }
}

impl<R: TimedRobot> TimedRobotExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl TimedRobot for Recorder {
        fn robot_init(&mut self) {
            self.calls.push("robot_init");
        }
        fn robot_periodic(&mut self) {
            self.calls.push("robot_periodic");
        }
        fn disabled_init(&mut self) {
            self.calls.push("disabled_init");
        }
        fn disabled_periodic(&mut self) {
            self.calls.push("disabled_periodic");
        }
        fn disabled_exit(&mut self) {
            self.calls.push("disabled_exit");
        }
        fn autonomous_init(&mut self) {
            self.calls.push("autonomous_init");
        }
        fn autonomous_periodic(&mut self) {
            self.calls.push("autonomous_periodic");
        }
        fn autonomous_exit(&mut self) {
            self.calls.push("autonomous_exit");
        }
        fn teleop_periodic(&mut self) {
            self.calls.push("teleop_periodic");
        }
    }

    #[test]
    fn mode_from_control_word() {
        assert_eq!(ControlWord::empty().mode(), RobotMode::Disabled);
        assert_eq!(ControlWord::AUTONOMOUS.mode(), RobotMode::Disabled);
        assert_eq!(ControlWord::AUTONOMOUS_ENABLED.mode(), RobotMode::Autonomous);
        assert_eq!(ControlWord::TELEOP_ENABLED.mode(), RobotMode::Teleop);
        assert_eq!(ControlWord::TEST_ENABLED.mode(), RobotMode::Test);
        assert_eq!(
            (ControlWord::TEST_ENABLED | ControlWord::AUTONOMOUS).mode(),
            RobotMode::Test
        );
        assert_eq!(
            (ControlWord::TELEOP_ENABLED | ControlWord::ESTOP).mode(),
            RobotMode::Disabled
        );
    }

    #[test]
    fn control_system() {
        assert_eq!(ControlWord::empty().system(), None);
        assert_eq!(
            ControlWord::TELEOP_ENABLED.system(),
            Some(ControlSystem::DriverStation)
        );
        assert_eq!(
            (ControlWord::TELEOP_ENABLED | ControlWord::FMS_ATTACHED).system(),
            Some(ControlSystem::FieldControl)
        );
    }

    #[test]
    fn transitions_run_before_periodic() {
        let mut dispatcher = Recorder::default().dispatcher();
        assert_eq!(dispatcher.mode(), None);

        dispatcher.step(ControlWord::empty());
        dispatcher.step(ControlWord::AUTONOMOUS_ENABLED);
        dispatcher.step(ControlWord::AUTONOMOUS_ENABLED);
        dispatcher.step(ControlWord::TELEOP_ENABLED);

        assert_eq!(dispatcher.mode(), Some(RobotMode::Teleop));
        assert_eq!(dispatcher.steps(), 4);
        assert_eq!(
            dispatcher.into_inner().calls,
            [
                "robot_init",
                "disabled_init",
                "disabled_periodic",
                "robot_periodic",
                "disabled_exit",
                "autonomous_init",
                "autonomous_periodic",
                "robot_periodic",
                "autonomous_periodic",
                "robot_periodic",
                "autonomous_exit",
                "teleop_periodic",
                "robot_periodic",
            ]
        );
    }

    #[test]
    fn run_stops_when_control_ends() {
        let mut dispatcher = Recorder::default().dispatcher();
        let mut timer = PeriodicTimer::unpaced(crate::time::DEFAULT_PERIOD);

        dispatcher.run(&mut timer, |step| {
            (step < 3).then_some(ControlWord::TELEOP_ENABLED)
        });

        assert_eq!(dispatcher.steps(), 3);
        assert_eq!(timer.ticks(), 3);
    }
}
