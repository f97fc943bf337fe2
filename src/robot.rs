//! The robot program: wires joysticks and sensors to the drivetrain and arm in
//! every mode.

use std::{collections::BTreeMap, fmt::Display, rc::Rc};

use chargedup_control::{balance::BalanceController, drive::DriveMixer};
use chargedup_core::{
    competition::TimedRobot,
    telemetry::{DoublePublisher, TelemetryTable},
};
use chargedup_devices::{
    controller::{Joystick, JoystickSource, JoystickState},
    encoder::Encoder,
    gyro::{Gyro, GyroError},
    motor::{Motor, MotorGroup},
};
use log::{debug, info, warn};

use crate::{
    arm::{Arm, ArmMode},
    auto::{AutoChooser, AutoRoutine, Autobalance},
    config::{RobotConfig, TestModeConfig, map},
    drivetrain::Drivetrain,
};

/// Every device the robot talks to.
pub struct Hardware {
    /// Left front drive motor.
    pub left_front: Box<dyn Motor>,
    /// Left rear drive motor.
    pub left_rear: Box<dyn Motor>,
    /// Right front drive motor.
    pub right_front: Box<dyn Motor>,
    /// Right rear drive motor.
    pub right_rear: Box<dyn Motor>,
    /// Arm motor.
    pub arm_motor: Box<dyn Motor>,
    /// Encoder on the arm motor.
    pub arm_encoder: Box<dyn Encoder>,
    /// Inertial sensor.
    pub gyro: Box<dyn Gyro>,
    /// Source of joystick reports.
    pub driver_station: Rc<dyn JoystickSource>,
}

impl core::fmt::Debug for Hardware {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hardware").finish_non_exhaustive()
    }
}

/// Remembers which devices are failing so each failure is logged once.
#[derive(Debug, Default)]
struct FaultLog {
    active: BTreeMap<&'static str, String>,
}

impl FaultLog {
    fn check<T, E: Display>(&mut self, device: &'static str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                if self.active.remove(device).is_some() {
                    info!("{device} recovered");
                }
                Some(value)
            }
            Err(err) => {
                let message = err.to_string();
                if self.active.get(device) != Some(&message) {
                    warn!("{device}: {message}");
                    self.active.insert(device, message);
                }
                None
            }
        }
    }
}

/// Reads a joystick, falling back to a centered stick with no buttons.
fn read_joystick(faults: &mut FaultLog, device: &'static str, joystick: &Joystick) -> JoystickState {
    faults.check(device, joystick.state()).unwrap_or_default()
}

/// The competition robot.
pub struct Robot {
    drivetrain: Drivetrain,
    arm: Arm,
    gyro: Box<dyn Gyro>,

    drive_joystick: Joystick,
    arm_joystick: Joystick,
    emulated_gyro: Joystick,

    chooser: AutoChooser,
    requested_auto: String,
    routine: AutoRoutine,
    autobalance: Autobalance,
    balance: BalanceController,
    test_mode: TestModeConfig,

    telemetry: TelemetryTable,
    autobalance_power: DoublePublisher,
    arm_rotations: DoublePublisher,
    gyro_roll: DoublePublisher,

    faults: FaultLog,
}

impl core::fmt::Debug for Robot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Robot")
            .field("drivetrain", &self.drivetrain)
            .field("arm", &self.arm)
            .field("routine", &self.routine)
            .field("autobalance", &self.autobalance)
            .finish_non_exhaustive()
    }
}

impl Robot {
    /// Builds the robot from its devices and configuration.
    #[must_use]
    pub fn new(hardware: Hardware, config: &RobotConfig) -> Self {
        let Hardware {
            left_front,
            left_rear,
            right_front,
            right_rear,
            arm_motor,
            arm_encoder,
            gyro,
            driver_station,
        } = hardware;

        let drivetrain = Drivetrain::new(
            MotorGroup::new(vec![left_front, left_rear]),
            MotorGroup::new(vec![right_front, right_rear]),
            DriveMixer::new(config.drive.max_power),
        );
        let arm = Arm::new(arm_motor, arm_encoder, config.arm.clone(), config.period());
        let balance = BalanceController::new(config.balance);

        let telemetry = TelemetryTable::new(map::TELEMETRY_TABLE);

        let mut chooser = AutoChooser::new();
        chooser.set_default_option(AutoRoutine::Default);
        chooser.add_option(AutoRoutine::Custom);
        chooser.add_option(AutoRoutine::Autobalance);

        Self {
            drivetrain,
            arm,
            gyro,
            drive_joystick: Joystick::new(map::DRIVE_JOYSTICK, Rc::clone(&driver_station)),
            arm_joystick: Joystick::new(map::ARM_JOYSTICK, Rc::clone(&driver_station)),
            emulated_gyro: Joystick::new(map::EMULATED_GYRO_JOYSTICK, driver_station),
            chooser,
            requested_auto: config.autonomous.selected.clone(),
            routine: AutoRoutine::Default,
            autobalance: Autobalance::new(balance, config.autonomous.settle_ticks),
            balance,
            test_mode: config.test_mode,
            autobalance_power: telemetry.double_topic(map::AUTOBALANCE_POWER_KEY),
            arm_rotations: telemetry.double_topic(map::ARM_ROTATIONS_KEY),
            gyro_roll: telemetry.double_topic(map::GYRO_ROLL_KEY),
            telemetry,
            faults: FaultLog::default(),
        }
    }

    /// The dashboard table the robot publishes to.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryTable {
        &self.telemetry
    }

    /// The autonomous chooser.
    #[must_use]
    pub const fn chooser(&self) -> &AutoChooser {
        &self.chooser
    }

    /// Selects the autonomous routine by dashboard name, as the drive team would.
    ///
    /// Unknown names fall back to the default routine with a warning.
    pub fn select_auto(&mut self, name: &str) {
        if let Err(err) = self.chooser.select(name) {
            warn!("{err}, using {}", self.chooser.selected());
        }
    }

    /// The routine latched at the start of autonomous.
    #[must_use]
    pub const fn routine(&self) -> AutoRoutine {
        self.routine
    }

    /// The autobalance routine.
    #[must_use]
    pub const fn autobalance(&self) -> &Autobalance {
        &self.autobalance
    }

    /// The arm subsystem.
    #[must_use]
    pub const fn arm(&self) -> &Arm {
        &self.arm
    }

    fn roll(&mut self) -> Option<f64> {
        match self.gyro.roll() {
            Err(GyroError::StillCalibrating) => None,
            result => self.faults.check("gyro", result),
        }
    }

    fn drive_from_joystick(&mut self) {
        let state = read_joystick(&mut self.faults, "drive joystick", &self.drive_joystick);
        let result = self
            .drivetrain
            .drive(state.y(), state.x(), state.raw_axis(map::SLIDER_AXIS), true);
        self.faults.check("drivetrain", result);
    }

    fn leave_mode(&mut self) {
        self.arm.cancel();
        let hold = self.arm.hold();
        self.faults.check("arm", hold);
    }
}

impl TimedRobot for Robot {
    fn robot_init(&mut self) {
        let calibration = self.gyro.calibrate();
        self.faults.check("gyro", calibration);
        self.drivetrain.init();
        let arm = self.arm.init();
        self.faults.check("arm", arm);

        let requested = std::mem::take(&mut self.requested_auto);
        self.select_auto(&requested);
    }

    fn robot_periodic(&mut self) {
        if let Some(position) = self.faults.check("arm encoder", self.arm.position()) {
            self.arm_rotations.set(position);
        }
        if let Some(roll) = self.roll() {
            self.gyro_roll.set(roll);
        }
    }

    fn disabled_init(&mut self) {
        let drivetrain = self.drivetrain.stop();
        self.faults.check("drivetrain", drivetrain);
        let arm = self.arm.stop();
        self.faults.check("arm", arm);
    }

    fn disabled_exit(&mut self) {
        self.leave_mode();
    }

    fn autonomous_init(&mut self) {
        self.routine = self.chooser.selected();
        info!("Auto selected: {}", self.routine);
        self.autobalance.reset();
    }

    fn autonomous_periodic(&mut self) {
        match self.routine {
            AutoRoutine::Default | AutoRoutine::Custom => {}
            AutoRoutine::Autobalance => {
                let Some(tilt) = self.roll() else {
                    let stop = self.drivetrain.stop();
                    self.faults.check("drivetrain", stop);
                    return;
                };

                let power = self.autobalance.step(tilt);
                self.autobalance_power.set(power);
                let result = self.drivetrain.drive(power, 0.0, 1.0, false);
                self.faults.check("drivetrain", result);
            }
        }
    }

    fn autonomous_exit(&mut self) {
        self.leave_mode();
    }

    fn teleop_periodic(&mut self) {
        self.drive_from_joystick();
    }

    fn teleop_exit(&mut self) {
        self.leave_mode();
    }

    fn test_init(&mut self) {
        let zero = self.arm.zero();
        self.faults.check("arm encoder", zero);
        self.arm.cancel();
    }

    fn test_periodic(&mut self) {
        self.drive_from_joystick();

        let arm_state = read_joystick(&mut self.faults, "arm joystick", &self.arm_joystick);
        let result = self.arm.update(&arm_state);
        if let Some(ArmMode::Preset(status)) = self.faults.check("arm", result) {
            debug!("Arm preset {status:?}");
        }

        let emulated = read_joystick(&mut self.faults, "emulated gyro", &self.emulated_gyro).y();
        let tilt = if emulated.abs() >= self.test_mode.emulated_deadband {
            Some(emulated * self.test_mode.emulated_tilt_scale)
        } else {
            self.roll()
        };
        if let Some(tilt) = tilt {
            self.autobalance_power.set(self.balance.output(tilt));
        }
    }

    fn test_exit(&mut self) {
        self.leave_mode();
    }
}
