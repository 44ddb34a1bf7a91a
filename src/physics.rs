use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::device::DeviceInitializationError;
use crate::emitter::CentralEmitter;
use crate::solver::{diagnostics, Simulation};

/// Density snapshot published after each frame.
pub struct DensityFrame {
    pub frame: u64,
    pub density: Vec<f32>,
    pub total: f64,
    /// Mean kinetic energy over interior cells.
    pub kinetic_energy: f64,
    /// Wall-clock duration of this frame's tick.
    pub tick: Duration,
}

/// Build the simulation and run it on a dedicated thread.
///
/// Each frame emits at the centre, steps once and publishes a
/// `DensityFrame`. The thread stops when `running` goes false, after
/// `run.frames` frames (if non-zero), or when the receiver is dropped.
/// Device bring-up happens on the calling thread so its errors surface here.
pub fn spawn_physics_thread(
    config: &Config,
    running: Arc<AtomicBool>,
) -> Result<(mpsc::Receiver<DensityFrame>, std::thread::JoinHandle<()>), DeviceInitializationError> {
    let mut sim = Simulation::with_device_config(config.device.device_config(), config.physics.solver_params())?;
    let mut emitter = CentralEmitter::new(config.run.seed)
        .with_sources(config.run.emit_density, config.run.emit_velocity);
    let frames = config.run.frames;
    let (frame_tx, frame_rx) = mpsc::sync_channel::<DensityFrame>(1);

    let handle = std::thread::Builder::new()
        .name("dyeflow-physics".to_string())
        .spawn(move || {
            let mut frame: u64 = 0;
            while running.load(Ordering::SeqCst) && (frames == 0 || frame < frames) {
                if let Err(e) = emitter.emit(&mut sim) {
                    log::error!("emitter: {e}");
                    break;
                }
                sim.step();
                frame += 1;

                let density = sim.density();
                let snapshot = DensityFrame {
                    frame,
                    total: diagnostics::total_density(&density),
                    kinetic_energy: diagnostics::kinetic_energy(&sim.velocity_x(), &sim.velocity_y()),
                    density,
                    tick: sim.timings().last(),
                };
                if frame_tx.send(snapshot).is_err() {
                    break;
                }
            }
            log::info!(
                "physics thread done after {} frames, average tick {:?}",
                frame,
                sim.timings().average()
            );
        })?;
    Ok((frame_rx, handle))
}
