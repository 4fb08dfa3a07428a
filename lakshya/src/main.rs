//! Lakshya - object approach behavior
//!
//! Runs the approach controller against mock devices and reads text
//! commands from stdin:
//!
//! ```text
//! start <label> <u> <v>        object seen at a depth-image pixel
//! start <label> <x> <y> <z>    object at an absolute map position
//! stop
//! resume
//! ```
//!
//! Usage: `lakshya [config.toml]` (falls back to `lakshya.toml`, then to
//! defaults). Ctrl-C or end of input exits.

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use lakshya::devices::mock::MockRobot;
use lakshya::utils::shutdown_flag;
use lakshya::{ApproachController, ApproachError, ApproachThread, ControlCommand, LakshyaConfig, Result};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lakshya=info".parse().expect("static directive")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = if let Some(path) = args.get(1) {
        info!("Loading configuration from {}", path);
        LakshyaConfig::load(Path::new(path))?
    } else if Path::new("lakshya.toml").exists() {
        info!("Loading configuration from lakshya.toml");
        LakshyaConfig::load(Path::new("lakshya.toml"))?
    } else {
        info!("Using default configuration");
        LakshyaConfig::default()
    };

    info!("Lakshya v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Frames: camera '{}', base '{}', world '{}'",
        config.frames.camera, config.frames.base, config.frames.world
    );
    info!(
        "Safe distance {:.2}m, retry step {:.0}°, scan {:?}",
        config.approach.safe_distance,
        config.approach.increase_degrees,
        config
            .search
            .positions
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
    );

    let robot = MockRobot::new();
    let (controller, handle) = ApproachController::with_handle(&config, robot.devices())?;

    let running = shutdown_flag()?;
    let approach = ApproachThread::spawn(controller, config.period(), running.clone())?;

    // Commands are read on their own thread so Ctrl-C is not blocked by stdin
    let input_handle = handle.clone();
    let input_running = running.clone();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match ControlCommand::parse(&line) {
                    Ok(command) => {
                        if let Err(e) = input_handle.send(command) {
                            error!("{}", e);
                            break;
                        }
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            info!("End of input");
            input_running.store(false, Ordering::Relaxed);
        })
        .map_err(|e| ApproachError::Config(format!("Failed to spawn stdin thread: {}", e)))?;

    let mut reported = 0;
    while running.load(Ordering::Relaxed) && !approach.is_finished() {
        thread::sleep(Duration::from_millis(200));

        let outputs = robot.output.outputs();
        for output in &outputs[reported..] {
            info!("Output: {}", output);
        }
        reported = outputs.len();
    }

    running.store(false, Ordering::Relaxed);
    approach.join();

    let status = handle.status();
    info!(
        "Lakshya finished: {} cycles, {} goals sent",
        status.cycles_completed(),
        status.goals_sent()
    );
    Ok(())
}
