// src/main.rs
// Entry point for mecanum_nav: runs an autonomous routine against the simulated
// drivetrain, travelling point of interest to point of interest.

use argh::FromArgs;
use log::{error, info, warn};
use mecanum_nav::{
    core::LogTelemetry,
    AllianceColor, NavConfig, NavigationMode, Navigator, Robot, SimulatedDrivetrain, StopSignal,
    TravelStatus,
};
use std::error::Error;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Plan and drive an autonomous routine on a simulated mecanum robot
struct Args {
    /// YAML configuration file; built-in defaults when omitted
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
    /// routine to run: duck, freight or teleop
    #[argh(option, short = 'm', default = "NavigationMode::Duck")]
    mode: NavigationMode,
    /// alliance side: blue or red
    #[argh(option, short = 'a', default = "AllianceColor::Blue")]
    alliance: AllianceColor,
}

/// Loads the configuration, builds the simulated robot at the routine's start
/// and follows the path until it is done or Ctrl-C is pressed.
fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging for debugging
    env_logger::init();
    let args: Args = argh::from_env();
    info!("Starting mecanum_nav: {:?} routine for {:?}", args.mode, args.alliance);

    let config = match &args.config {
        Some(path) => NavConfig::from_yaml_file(path)?,
        None => NavConfig::default(),
    };

    // Raised by Ctrl-C; every drive loop checks it between ticks
    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.raise();
    })?;

    let mut navigator = Navigator::new(args.mode, args.alliance, &config);
    let start = navigator.start_pose();
    let drivetrain = SimulatedDrivetrain::new(start, config.geometry);
    let mut robot = Robot::new(drivetrain, start, config.geometry).with_telemetry(Box::new(LogTelemetry));

    if navigator.path().is_empty() {
        warn!("No path loaded for {:?}; nothing to drive", args.mode);
        return Ok(());
    }

    loop {
        match navigator.travel_to_next_poi(&mut robot, &stop) {
            Ok(TravelStatus::ReachedPoi(poi)) => {
                info!("Reached {} ({})", poi, navigator.status());
            }
            Ok(TravelStatus::PathComplete) => {
                info!("Routine complete at {}", robot.current_pose());
                break;
            }
            Ok(TravelStatus::Cancelled) => {
                warn!("Stopped by operator at {}", robot.current_pose());
                break;
            }
            Ok(TravelStatus::Travelling) => continue,
            Err(e) => {
                robot.stop();
                error!("Navigation failed: {}", e);
                return Err(e.into());
            }
        }
        if navigator.path().is_empty() {
            info!("Routine complete at {}", robot.current_pose());
            break;
        }
    }

    let truth = robot.drivetrain().true_pose();
    info!(
        "Odometry error after {:.1} s simulated: {:.3} in",
        robot.drivetrain().elapsed(),
        truth.location.distance_to(robot.current_pose().location)
    );
    Ok(())
}
