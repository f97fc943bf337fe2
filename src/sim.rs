//! Desktop simulation of the robot on the field.
//!
//! A [`Simulation`] owns handles to every simulated device, hands the robot its
//! [`Hardware`], and after each control step integrates two small plant models:
//!
//! - [`ChargeStation`]: the robot driving on a see-saw platform whose tilt
//!   follows the robot's position.
//! - [`ArmPlant`]: an arm whose encoder turns in proportion to motor power.
//!
//! A [`MatchScript`] describes the sequence of modes the field would command.

use std::{rc::Rc, time::Duration};

use chargedup_core::competition::ControlWord;
use chargedup_devices::{
    gyro::MAX_TILT,
    sim::{SimDriverStation, SimEncoder, SimGyro, SimMotor},
};

use crate::{config::map, robot::Hardware};

/// Number of reads during which the gyro reports that it is still calibrating.
const GYRO_CALIBRATION_READS: u32 = 3;

/// A robot on the charge station.
///
/// The station tilts toward an angle proportional to the robot's distance from
/// the pivot, limited to the station's travel and to a maximum tipping rate.
/// The robot's speed lags the commanded power with a first order response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeStation {
    /// Station tilt per meter of robot offset from the pivot.
    pub degrees_per_meter: f64,
    /// Largest tilt the station can reach.
    pub max_tilt: f64,
    /// Fastest the station can tip, in degrees per second.
    pub tilt_rate: f64,
    /// Robot speed at full forward power, in meters per second.
    pub top_speed: f64,
    /// Time constant of the robot's speed response, in seconds.
    pub speed_time_constant: f64,

    /// Robot offset from the pivot, in meters.
    pub position: f64,
    /// Robot speed, in meters per second.
    pub velocity: f64,
    /// Station tilt, in degrees.
    pub tilt: f64,
}

impl Default for ChargeStation {
    fn default() -> Self {
        Self {
            degrees_per_meter: 20.0,
            max_tilt: 15.0,
            tilt_rate: 30.0,
            top_speed: 3.0,
            speed_time_constant: 0.5,
            position: 0.0,
            velocity: 0.0,
            tilt: 0.0,
        }
    }
}

impl ChargeStation {
    /// Places the robot where the station settles at `tilt` degrees.
    #[must_use]
    pub fn tilted(tilt: f64) -> Self {
        let station = Self::default();
        Self {
            position: tilt / station.degrees_per_meter,
            tilt: tilt.clamp(-station.max_tilt, station.max_tilt),
            ..station
        }
    }

    /// Integrates one step of `dt` with the robot driving at `forward_power`.
    pub fn step(&mut self, forward_power: f64, dt: Duration) {
        let dt = dt.as_secs_f64();

        self.velocity += (self.top_speed * forward_power - self.velocity) * dt / self.speed_time_constant;
        self.position += self.velocity * dt;

        let target = (self.degrees_per_meter * self.position).clamp(-self.max_tilt, self.max_tilt);
        let max_change = self.tilt_rate * dt;
        self.tilt += (target - self.tilt).clamp(-max_change, max_change);
    }
}

/// An arm turning in proportion to its motor power.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPlant {
    /// Encoder rotations per second at full power.
    pub rotations_per_second: f64,
}

impl Default for ArmPlant {
    fn default() -> Self {
        Self {
            rotations_per_second: 25.0,
        }
    }
}

/// One stretch of a match in a single mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPhase {
    /// The control word sent for the whole phase.
    pub word: ControlWord,
    /// Duration of the phase in control steps.
    pub steps: u64,
}

/// The sequence of modes a match goes through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchScript {
    phases: Vec<MatchPhase>,
}

impl MatchScript {
    /// Creates an empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Appends a phase lasting `duration` at the given `period`.
    #[must_use]
    pub fn then(mut self, word: ControlWord, duration: Duration, period: Duration) -> Self {
        let steps = match period.as_nanos() {
            0 => 0,
            period => u64::try_from(duration.as_nanos() / period).unwrap_or(u64::MAX),
        };
        self.phases.push(MatchPhase { word, steps });
        self
    }

    /// The phases of the script.
    #[must_use]
    pub fn phases(&self) -> &[MatchPhase] {
        &self.phases
    }

    /// Total number of steps in the script.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.phases.iter().map(|phase| phase.steps).sum()
    }

    /// Returns `true` if the script has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The control word for `step`, or [`None`] once the script is over.
    #[must_use]
    pub fn word_at(&self, step: u64) -> Option<ControlWord> {
        let mut start = 0;
        for phase in &self.phases {
            if step < start + phase.steps {
                return Some(phase.word);
            }
            start += phase.steps;
        }
        None
    }

    /// A standard match: a second disabled, then autonomous, teleop and test.
    #[must_use]
    pub fn standard(period: Duration) -> Self {
        let attached = ControlWord::DS_ATTACHED | ControlWord::FMS_ATTACHED;
        Self::new()
            .then(attached, Duration::from_secs(1), period)
            .then(attached | ControlWord::AUTONOMOUS_ENABLED, Duration::from_secs(15), period)
            .then(attached, Duration::from_secs(1), period)
            .then(attached | ControlWord::TELEOP_ENABLED, Duration::from_secs(5), period)
            .then(ControlWord::DS_ATTACHED | ControlWord::TEST_ENABLED, Duration::from_secs(5), period)
    }
}

/// Simulated devices and the plants they are attached to.
#[derive(Debug)]
pub struct Simulation {
    period: Duration,

    /// Left front drive motor.
    pub left_front: SimMotor,
    /// Left rear drive motor.
    pub left_rear: SimMotor,
    /// Right front drive motor.
    pub right_front: SimMotor,
    /// Right rear drive motor.
    pub right_rear: SimMotor,
    /// Arm motor.
    pub arm_motor: SimMotor,
    /// Arm encoder.
    pub arm_encoder: SimEncoder,
    /// Inertial sensor.
    pub gyro: SimGyro,
    /// Joysticks.
    pub driver_station: SimDriverStation,

    /// The charge station the robot sits on.
    pub station: ChargeStation,
    /// The arm model.
    pub arm: ArmPlant,
}

impl Simulation {
    /// Creates a simulation stepped every `period`, with the robot on the
    /// charge station.
    #[must_use]
    pub fn new(period: Duration, station: ChargeStation) -> Self {
        let gyro = SimGyro::new(0, GYRO_CALIBRATION_READS);
        gyro.set_roll(station.tilt);

        Self {
            period,
            left_front: SimMotor::new(map::LEFT_FRONT_MOTOR),
            left_rear: SimMotor::new(map::LEFT_REAR_MOTOR),
            right_front: SimMotor::new(map::RIGHT_FRONT_MOTOR),
            right_rear: SimMotor::new(map::RIGHT_REAR_MOTOR),
            arm_motor: SimMotor::new(map::ARM_MOTOR),
            arm_encoder: SimEncoder::new(map::ARM_MOTOR),
            gyro,
            driver_station: SimDriverStation::new(),
            station,
            arm: ArmPlant::default(),
        }
    }

    /// Device handles for the robot. The simulation keeps its own copies.
    #[must_use]
    pub fn hardware(&self) -> Hardware {
        Hardware {
            left_front: Box::new(self.left_front.clone()),
            left_rear: Box::new(self.left_rear.clone()),
            right_front: Box::new(self.right_front.clone()),
            right_rear: Box::new(self.right_rear.clone()),
            arm_motor: Box::new(self.arm_motor.clone()),
            arm_encoder: Box::new(self.arm_encoder.clone()),
            gyro: Box::new(self.gyro.clone()),
            driver_station: Rc::new(self.driver_station.clone()),
        }
    }

    /// The robot's forward power, undoing the mirrored left side.
    #[must_use]
    pub fn forward_power(&self) -> f64 {
        let left = -(self.left_front.power() + self.left_rear.power()) / 2.0;
        let right = (self.right_front.power() + self.right_rear.power()) / 2.0;
        (left + right) / 2.0
    }

    /// Integrates the plants over one period using the powers the robot just
    /// commanded, and updates the sensors.
    pub fn advance(&mut self) {
        self.station.step(self.forward_power(), self.period);
        self.gyro.set_roll(self.station.tilt.clamp(-MAX_TILT, MAX_TILT));

        self.arm_encoder
            .advance(self.arm_motor.power() * self.arm.rotations_per_second * self.period.as_secs_f64());
    }
}
