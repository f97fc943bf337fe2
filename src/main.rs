//! Runs the robot program through a simulated match.
//!
//! ```text
//! chargedup [CONFIG] [--fast]
//! ```
//!
//! `CONFIG` is a TOML file overriding the defaults. `--fast` runs the match as
//! fast as possible instead of in real time.

use std::{path::PathBuf, process::ExitCode};

use chargedup::{
    config::{RobotConfig, map},
    robot::Robot,
    sim::{ChargeStation, MatchScript, Simulation},
};
use chargedup_core::{
    competition::{RobotMode, TimedRobotExt},
    logger,
    time::PeriodicTimer,
};
use log::{info, warn};

/// Tilt of the charge station when the match starts.
const START_TILT: f64 = 12.0;

/// Arm preset button pressed at the start of test mode.
const TEST_PRESET_BUTTON: usize = 10;

fn main() -> ExitCode {
    let mut config_path = None;
    let mut fast = false;
    for arg in std::env::args_os().skip(1) {
        if arg == "--fast" {
            fast = true;
        } else {
            config_path = Some(PathBuf::from(arg));
        }
    }

    let config = match config_path.as_deref().map_or_else(|| Ok(RobotConfig::default()), RobotConfig::load) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = match config.level_filter() {
        Ok(level) => level,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = logger::init(level, config.log_file.as_deref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    let period = config.period();
    let mut sim = Simulation::new(period, ChargeStation::tilted(START_TILT));
    let script = MatchScript::standard(period);
    let mut dispatcher = Robot::new(sim.hardware(), &config).dispatcher();
    let mut timer = if fast {
        PeriodicTimer::unpaced(period)
    } else {
        PeriodicTimer::new(period)
    };

    info!("Running a {} step match every {period:?}", script.len());
    dispatcher.run(&mut timer, |step| {
        if step > 0 {
            sim.advance();
        }

        let word = script.word_at(step)?;
        if word.mode() == RobotMode::Test {
            sim.driver_station.press(map::ARM_JOYSTICK, TEST_PRESET_BUTTON);
        }
        Some(word)
    });

    let robot = dispatcher.robot();
    if robot.autobalance().is_balanced() {
        info!("Match over, robot balanced at {:.2} degrees", sim.station.tilt);
    } else {
        warn!("Match over, robot not balanced at {:.2} degrees", sim.station.tilt);
    }
    info!(
        "Arm at {:.2} rotations ({:?}), {} loop overruns",
        sim.arm_encoder.raw(),
        robot.arm().preset_status(),
        timer.overruns()
    );
    for (key, value) in robot.telemetry().snapshot() {
        info!("{}/{key} = {value:.3}", robot.telemetry().name());
    }

    ExitCode::SUCCESS
}
