pub mod config;
pub mod device;
pub mod emitter;
pub mod kernels;
pub mod physics;
pub mod solver;
pub mod state;

pub use device::{Device, DeviceConfig, DeviceInitializationError};
pub use solver::{OutOfRangeError, Simulation, SolverParams};
