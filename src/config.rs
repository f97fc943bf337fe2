//! Robot map and tunable configuration.
//!
//! The [`map`] module holds the wiring of the robot: CAN ids, driver station
//! ports and button numbers. Everything that may need tuning between matches
//! lives in [`RobotConfig`], which has sensible defaults and can be overridden
//! from a TOML file.
//!
//! ```toml
//! period_ms = 20
//! log_level = "debug"
//!
//! [arm]
//! reverse_limit = -30.0
//!
//! [autonomous]
//! selected = "Autobalance"
//! ```

use std::{
    io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use chargedup_control::{balance::BalanceConfig, drive::DriveMixer, position::PositionConfig};
use log::{LevelFilter, info};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

/// Fixed wiring of the competition robot.
pub mod map {
    /// CAN id of the left front drive motor.
    pub const LEFT_FRONT_MOTOR: u8 = 1;
    /// CAN id of the right front drive motor.
    pub const RIGHT_FRONT_MOTOR: u8 = 2;
    /// CAN id of the left rear drive motor.
    pub const LEFT_REAR_MOTOR: u8 = 3;
    /// CAN id of the right rear drive motor.
    pub const RIGHT_REAR_MOTOR: u8 = 4;
    /// CAN id of the arm motor. The arm encoder reports through it.
    pub const ARM_MOTOR: u8 = 9;

    /// Driver station port of the drive joystick.
    pub const DRIVE_JOYSTICK: u8 = 0;
    /// Driver station port of the arm joystick.
    pub const ARM_JOYSTICK: u8 = 1;
    /// Driver station port of the joystick standing in for the gyroscope.
    pub const EMULATED_GYRO_JOYSTICK: u8 = 2;

    /// Raw axis of the throttle slider on the drive joystick.
    pub const SLIDER_AXIS: usize = 3;

    /// Name of the telemetry table.
    pub const TELEMETRY_TABLE: &str = "datatable";
    /// Telemetry key of the balance output.
    pub const AUTOBALANCE_POWER_KEY: &str = "Autobalance Power";
    /// Telemetry key of the arm position.
    pub const ARM_ROTATIONS_KEY: &str = "Arm Motor Rotations";
    /// Telemetry key of the gyro roll.
    pub const GYRO_ROLL_KEY: &str = "Gyro Roll";
}

/// An arm position bound to a button of the arm joystick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ArmPreset {
    /// Button number, starting at 1.
    pub button: usize,
    /// Target position in motor rotations.
    pub target: f64,
}

/// Arm tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Highest allowed position, in rotations.
    pub forward_limit: f64,
    /// Lowest allowed position, in rotations.
    pub reverse_limit: f64,
    /// Power used while the arm is moved by hand.
    pub manual_power: f64,
    /// Stick deflection below which manual input is ignored.
    pub manual_deadband: f64,
    /// Stick deflection above which manual input takes over from a preset.
    pub override_threshold: f64,
    /// Buttons and their target positions, checked in order.
    pub presets: Vec<ArmPreset>,
    /// Position hold tuning.
    pub position: PositionConfig,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            forward_limit: 1.0,
            reverse_limit: -36.0,
            manual_power: 0.1,
            manual_deadband: 0.01,
            override_threshold: 0.1,
            presets: vec![
                ArmPreset { button: 8, target: -5.0 },
                ArmPreset { button: 10, target: -20.0 },
                ArmPreset { button: 12, target: -30.0 },
            ],
            position: PositionConfig::default(),
        }
    }
}

/// Drivetrain tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Speed scale reached with the slider pushed fully forward.
    pub max_power: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_power: DriveMixer::DEFAULT_MAX_POWER,
        }
    }
}

/// Autonomous tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutonomousConfig {
    /// Name of the routine preselected in the chooser.
    pub selected: String,
    /// Consecutive level steps after which the robot counts as balanced.
    pub settle_ticks: u32,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            selected: String::from("Default"),
            settle_ticks: 25,
        }
    }
}

/// Test mode tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TestModeConfig {
    /// Degrees of emulated tilt per unit of joystick deflection.
    pub emulated_tilt_scale: f64,
    /// Deflection below which the real gyroscope is used instead.
    pub emulated_deadband: f64,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            emulated_tilt_scale: 15.0,
            emulated_deadband: 0.1,
        }
    }
}

/// Everything tunable about the robot program.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Control loop period in milliseconds.
    pub period_ms: u64,
    /// Maximum level of log messages.
    pub log_level: String,
    /// File that log lines are copied to.
    pub log_file: Option<PathBuf>,
    /// Drivetrain tuning.
    pub drive: DriveConfig,
    /// Arm tuning.
    pub arm: ArmConfig,
    /// Balance law tuning.
    pub balance: BalanceConfig,
    /// Autonomous tuning.
    pub autonomous: AutonomousConfig,
    /// Test mode tuning.
    pub test_mode: TestModeConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            period_ms: 20,
            log_level: String::from("info"),
            log_file: None,
            drive: DriveConfig::default(),
            arm: ArmConfig::default(),
            balance: BalanceConfig::default(),
            autonomous: AutonomousConfig::default(),
            test_mode: TestModeConfig::default(),
        }
    }
}

impl FromStr for RobotConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = toml::from_str(s).context(ParseSnafu)?;
        config.validate()?;
        Ok(config)
    }
}

impl RobotConfig {
    /// Loads the configuration at `path`.
    ///
    /// A missing file is not an error: the defaults are used instead.
    ///
    /// # Errors
    ///
    /// - A [`ConfigError::Read`] error if the file exists but cannot be read.
    /// - Any error returned by [`RobotConfig::from_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                info!("Loading configuration from {}", path.display());
                contents.parse()
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(source).context(ReadSnafu { path }),
        }
    }

    /// The control loop period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// The configured log level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLogLevel`] if the level is not recognized.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level.parse::<LevelFilter>().ok().context(InvalidLogLevelSnafu {
            level: self.log_level.as_str(),
        })
    }

    /// Checks values that would make the robot misbehave.
    ///
    /// # Errors
    ///
    /// Returns the first problem found as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(self.period_ms > 0, ZeroPeriodSnafu);
        ensure!(
            self.arm.reverse_limit < self.arm.forward_limit,
            InvertedSoftLimitsSnafu {
                reverse: self.arm.reverse_limit,
                forward: self.arm.forward_limit,
            }
        );
        ensure!(
            self.balance.min_angle < self.balance.max_angle,
            InvalidBalanceSnafu {
                min_angle: self.balance.min_angle,
                max_angle: self.balance.max_angle,
            }
        );
        self.level_filter()?;
        Ok(())
    }
}

#[derive(Debug, Snafu)]
/// Errors that can occur when loading the configuration.
pub enum ConfigError {
    /// The file exists but could not be read.
    #[snafu(display("could not read {}: {source}", path.display()))]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The file is not valid TOML or does not match the expected layout.
    #[snafu(display("malformed configuration: {source}"))]
    Parse {
        /// The underlying parse error.
        source: toml::de::Error,
    },

    /// The log level is not one of `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[snafu(display("unknown log level {level:?}"))]
    InvalidLogLevel {
        /// The rejected level.
        level: String,
    },

    /// The loop period is zero.
    #[snafu(display("loop period must be at least one millisecond"))]
    ZeroPeriod,

    /// The reverse soft limit is not below the forward one.
    #[snafu(display("arm reverse limit {reverse} must be below forward limit {forward}"))]
    InvertedSoftLimits {
        /// The reverse limit.
        reverse: f64,
        /// The forward limit.
        forward: f64,
    },

    /// The balance dead-band is not below the saturation angle.
    #[snafu(display("balance min_angle {min_angle} must be below max_angle {max_angle}"))]
    InvalidBalance {
        /// The dead-band edge.
        min_angle: f64,
        /// The saturation angle.
        max_angle: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_robot() {
        let config = RobotConfig::default();
        config.validate().unwrap();
        assert_eq!(config.period(), Duration::from_millis(20));
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
        assert_eq!(config.arm.presets.len(), 3);
        assert_eq!(config.arm.presets[1], ArmPreset { button: 10, target: -20.0 });
        assert_eq!(config.balance, BalanceConfig::DEFAULT);
        assert_eq!(config.autonomous.settle_ticks, 25);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: RobotConfig = r#"
            log_level = "debug"

            [arm]
            reverse_limit = -30.0

            [arm.position.gains]
            kp = 0.5

            [autonomous]
            selected = "Autobalance"
        "#
        .parse()
        .unwrap();

        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
        assert_eq!(config.arm.reverse_limit, -30.0);
        assert_eq!(config.arm.forward_limit, 1.0);
        assert_eq!(config.arm.position.gains.kp, 0.5);
        assert_eq!(config.arm.position.tolerance, 0.5);
        assert_eq!(config.autonomous.selected, "Autobalance");
        assert_eq!(config.autonomous.settle_ticks, 25);
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(
            "period_ms = \"fast\"".parse::<RobotConfig>(),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            "period_ms = 0".parse::<RobotConfig>(),
            Err(ConfigError::ZeroPeriod)
        ));
        assert!(matches!(
            "[arm]\nforward_limit = -40.0".parse::<RobotConfig>(),
            Err(ConfigError::InvertedSoftLimits { .. })
        ));
        assert!(matches!(
            "log_level = \"loud\"".parse::<RobotConfig>(),
            Err(ConfigError::InvalidLogLevel { .. })
        ));
    }

    #[test]
    fn log_level_names_are_checked() {
        let mut config = RobotConfig::default();
        config.log_level = "TRACE".to_owned();
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Trace);

        config.log_level = "verbose".to_owned();
        assert!(matches!(
            config.level_filter(),
            Err(ConfigError::InvalidLogLevel { level }) if level == "verbose"
        ));
    }

    #[test]
    fn missing_file_means_defaults() {
        let config = RobotConfig::load(Path::new("/nonexistent/chargedup.toml")).unwrap();
        assert_eq!(config, RobotConfig::default());
    }
}
