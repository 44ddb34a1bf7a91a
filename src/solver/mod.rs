mod boundary;
mod core;
pub mod diagnostics;
mod field;
mod forcing;
mod params;

use std::time::{Duration, Instant};

pub use self::core::{Rate, Solver, RELAX_SWEEPS};
pub use boundary::{fix_corners, FieldType};
pub use field::{Field, FieldPair, FieldSizeError};
pub use forcing::OutOfRangeError;
pub use params::SolverParams;

use crate::device::{Device, DeviceConfig, DeviceInitializationError};
use crate::kernels;

/// Stages of one tick, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    DiffuseVx,
    DiffuseVy,
    Project1,
    AdvectVx,
    AdvectVy,
    Project2,
    DiffuseDensity,
    AdvectDensity,
}

impl Stage {
    /// The fixed sequence a tick walks through, starting and ending at `Idle`.
    pub const PIPELINE: [Stage; 8] = [
        Stage::DiffuseVx,
        Stage::DiffuseVy,
        Stage::Project1,
        Stage::AdvectVx,
        Stage::AdvectVy,
        Stage::Project2,
        Stage::DiffuseDensity,
        Stage::AdvectDensity,
    ];
}

/// Wall-clock cost of completed ticks.
#[derive(Debug, Clone, Default)]
pub struct StepTimings {
    last: Duration,
    total: Duration,
    ticks: u64,
}

impl StepTimings {
    fn record(&mut self, elapsed: Duration) {
        self.last = elapsed;
        self.total += elapsed;
        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn last(&self) -> Duration {
        self.last
    }

    pub fn average(&self) -> Duration {
        if self.ticks == 0 {
            Duration::ZERO
        } else {
            self.total.div_f64(self.ticks as f64)
        }
    }
}

/// A 2D incompressible fluid carrying dye.
///
/// Owns the device, its queue and every field. Velocity and density live in
/// `FieldPair`s; between ticks the `current` side of each pair holds the
/// state and is what forcing and read-out see.
pub struct Simulation {
    solver: Solver,
    params: SolverParams,
    velocity_x: FieldPair,
    velocity_y: FieldPair,
    density: FieldPair,
    stage: Stage,
    timings: StepTimings,
    device: Device,
}

impl Simulation {
    /// Build a simulation on `device`. Fails if any solver kernel is missing
    /// from the device library or the queue cannot start.
    pub fn new(device: Device, params: SolverParams) -> Result<Self, DeviceInitializationError> {
        let solver = Solver::new(&device, &params)?;
        log::info!(
            "simulation {}x{}: dt={} diff={} visc={}",
            crate::state::N,
            crate::state::N,
            params.dt,
            params.diff,
            params.visc
        );
        Ok(Self {
            solver,
            params,
            velocity_x: FieldPair::new(&device),
            velocity_y: FieldPair::new(&device),
            density: FieldPair::new(&device),
            stage: Stage::Idle,
            timings: StepTimings::default(),
            device,
        })
    }

    /// Bring up a CPU device with the solver kernels and build on it.
    pub fn with_device_config(config: DeviceConfig, params: SolverParams) -> Result<Self, DeviceInitializationError> {
        let device = Device::new(config, kernels::library())?;
        Self::new(device, params)
    }

    /// Advance by one time step. Returns with no device work outstanding.
    pub fn step(&mut self) {
        let start = Instant::now();
        for stage in Stage::PIPELINE {
            log::trace!("{:?} -> {:?}", self.stage, stage);
            self.stage = stage;
            self.run_stage(stage);
        }
        self.stage = Stage::Idle;
        self.timings.record(start.elapsed());
        log::debug!("tick {} took {:?}", self.timings.ticks(), self.timings.last());
    }

    fn run_stage(&mut self, stage: Stage) {
        let Self {
            solver,
            velocity_x: vx,
            velocity_y: vy,
            density,
            ..
        } = self;
        match stage {
            Stage::Idle => {}
            Stage::DiffuseVx => {
                vx.swap();
                solver.diffuse(FieldType::Vx, vx.current.buffer(), vx.previous.buffer(), Rate::Viscosity);
            }
            Stage::DiffuseVy => {
                vy.swap();
                solver.diffuse(FieldType::Vy, vy.current.buffer(), vy.previous.buffer(), Rate::Viscosity);
            }
            Stage::Project1 | Stage::Project2 => {
                solver.project(
                    vx.current.buffer(),
                    vy.current.buffer(),
                    vx.previous.buffer(),
                    vy.previous.buffer(),
                );
            }
            Stage::AdvectVx => {
                // Projected velocity moves to `previous`; vy has not swapped yet.
                vx.swap();
                solver.advect(
                    FieldType::Vx,
                    vx.current.buffer(),
                    vx.previous.buffer(),
                    vx.previous.buffer(),
                    vy.current.buffer(),
                );
            }
            Stage::AdvectVy => {
                vy.swap();
                solver.advect(
                    FieldType::Vy,
                    vy.current.buffer(),
                    vy.previous.buffer(),
                    vx.previous.buffer(),
                    vy.previous.buffer(),
                );
            }
            Stage::DiffuseDensity => {
                density.swap();
                solver.diffuse(
                    FieldType::Scalar,
                    density.current.buffer(),
                    density.previous.buffer(),
                    Rate::Diffusion,
                );
            }
            Stage::AdvectDensity => {
                density.swap();
                solver.advect(
                    FieldType::Scalar,
                    density.current.buffer(),
                    density.previous.buffer(),
                    vx.current.buffer(),
                    vy.current.buffer(),
                );
            }
        }
    }

    /// Snapshot of the dye density, N*N values in row-major order.
    pub fn density(&self) -> Vec<f32> {
        self.density.current.read()
    }

    pub fn velocity_x(&self) -> Vec<f32> {
        self.velocity_x.current.read()
    }

    pub fn velocity_y(&self) -> Vec<f32> {
        self.velocity_y.current.read()
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn timings(&self) -> &StepTimings {
        &self.timings
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}
