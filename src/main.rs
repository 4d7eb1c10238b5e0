// SipSense - Raspberry Pi Entry Point
//
// Startup sequence:
//   1. Initialise logging and read SIPSENSE_* runtime overrides.
//   2. Probe the I2C buses for the GY-521 (MPU6050). If nothing answers,
//      fall back to the simulated accelerometer.
//   3. Calibrate with the bottle upright and still. A hardware calibration
//      failure also falls back to simulation; a simulated one aborts.
//   4. Spawn sensor, pet and console threads wired by channels, and wait
//      for the sensor thread to stop.

use std::io;
use std::sync::mpsc;
use std::thread;

use anyhow::{anyhow, Context};

use sipsense::config::{RuntimeConfig, TrackerConfig};
use sipsense::drivers::simulated::SimulatedAccel;
use sipsense::drivers::AccelSource;
use sipsense::motion::MotionTracker;
use sipsense::tasks;

type BoxedSource = Box<dyn AccelSource + Send>;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("SipSense starting…");

    let runtime = RuntimeConfig::from_env().context("reading SIPSENSE_* environment")?;
    log::debug!("Runtime config: {:?}", runtime);

    let (source, simulated) = open_source(&runtime);
    let tracker = start_tracker(source, simulated, &runtime)?;

    // ---- Channels ---------------------------------------------------------
    let (pet_tx, pet_rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();

    // ---- Spawn tasks -------------------------------------------------------
    let tick = runtime.tick_interval();
    let calibration_samples = runtime.calibration_samples;
    let sensor = thread::Builder::new()
        .name("sensor".into())
        .spawn(move || tasks::sensor::sensor_task(tracker, tick, calibration_samples, pet_tx, cmd_rx))?;

    let pet = thread::Builder::new()
        .name("pet".into())
        .spawn(move || tasks::pet::pet_task(pet_rx))?;

    // Detached: blocks on stdin and exits on its own at EOF or "quit".
    thread::Builder::new()
        .name("console".into())
        .spawn(move || tasks::console::console_task(io::stdin().lock(), cmd_tx))?;

    let exit = sensor
        .join()
        .map_err(|_| anyhow!("sensor thread panicked"))?;

    // The sensor task owned the only pet sender, so the pet task drains and ends.
    let totals = pet.join().map_err(|_| anyhow!("pet thread panicked"))?;
    log::info!("Session totals: {} sips, {:.1} ml", totals.sips, totals.water_ml);

    let exit = exit?;
    log::info!("Sensor task finished: {:?}", exit);
    Ok(())
}

/// Hardware if it answers, simulation otherwise. The flag is `true` for simulation.
fn open_source(runtime: &RuntimeConfig) -> (BoxedSource, bool) {
    if runtime.force_simulation {
        log::info!("Simulation forced by SIPSENSE_SIMULATE");
        return (simulated(runtime), true);
    }

    if let Some(device) = probe_hardware() {
        return (device, false);
    }
    (simulated(runtime), true)
}

#[cfg(target_os = "linux")]
fn probe_hardware() -> Option<BoxedSource> {
    match sipsense::drivers::probe::probe_linux() {
        Ok(probed) => {
            log::info!("Using MPU6050 on /dev/i2c-{} @ 0x{:02X}", probed.bus, probed.address);
            Some(Box::new(probed.device))
        }
        Err(e) => {
            log::warn!("{}; using simulation mode", e);
            None
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn probe_hardware() -> Option<BoxedSource> {
    log::warn!("No I2C support on this platform; using simulation mode");
    None
}

fn simulated(runtime: &RuntimeConfig) -> BoxedSource {
    Box::new(SimulatedAccel::new(runtime.simulation_seed))
}

fn start_tracker(
    source: BoxedSource,
    simulated_source: bool,
    runtime: &RuntimeConfig,
) -> anyhow::Result<MotionTracker<BoxedSource>> {
    let mut tracker = MotionTracker::new(source, TrackerConfig::default())?;

    let calibrated = tracker.calibrate(runtime.calibration_samples).map(|_| ());
    match calibrated {
        Ok(()) => Ok(tracker),
        Err(e) if !simulated_source => {
            log::error!("Calibration failed on hardware: {}; falling back to simulation", e);
            let mut tracker = MotionTracker::new(simulated(runtime), TrackerConfig::default())?;
            tracker
                .calibrate(runtime.calibration_samples)
                .context("calibrating simulated sensor")?;
            Ok(tracker)
        }
        Err(e) => Err(e).context("calibrating simulated sensor"),
    }
}
