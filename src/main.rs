use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dyeflow::config;
use dyeflow::physics::spawn_physics_thread;

fn main() {
    env_logger::init();

    let cfg = config::load();
    log::info!(
        "dyeflow: dt={} diff={} visc={} frames={}",
        cfg.physics.dt,
        cfg.physics.diff,
        cfg.physics.visc,
        if cfg.run.frames == 0 { "unbounded".to_string() } else { cfg.run.frames.to_string() }
    );

    // Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }

    let (frames, physics_thread) = match spawn_physics_thread(&cfg, running) {
        Ok(spawned) => spawned,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let log_every = cfg.run.log_every;
    for frame in frames.iter() {
        if log_every > 0 && frame.frame % log_every == 0 {
            let peak = frame.density.iter().copied().fold(0.0f32, f32::max);
            log::info!(
                "frame {}: total dye {:.1}, peak {:.2}, KE {:.3e}, tick {:?}",
                frame.frame,
                frame.total,
                peak,
                frame.kinetic_energy,
                frame.tick
            );
        }
    }

    if physics_thread.join().is_err() {
        log::error!("physics thread panicked");
        std::process::exit(1);
    }
}
