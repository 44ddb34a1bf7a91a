use serde::Deserialize;

use crate::device::DeviceConfig;
use crate::solver::SolverParams;

const CONFIG_FILE: &str = "dyeflow.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub physics: PhysicsConfig,
    pub device: DeviceSettings,
    pub run: RunConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub dt: f32,
    pub diff: f32,
    pub visc: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub threads: usize,
    pub execution_width: usize,
    pub max_threads_per_group: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to simulate; 0 runs until interrupted.
    pub frames: u64,
    pub seed: u32,
    pub emit_density: bool,
    pub emit_velocity: bool,
    /// Log a stats line every this many frames; 0 disables it.
    pub log_every: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let p = SolverParams::default();
        Self {
            dt: p.dt,
            diff: p.diff,
            visc: p.visc,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        let d = DeviceConfig::default();
        Self {
            threads: d.threads,
            execution_width: d.execution_width,
            max_threads_per_group: d.max_threads_per_group,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 0,
            seed: 88675123,
            emit_density: true,
            emit_velocity: true,
            log_every: 60,
        }
    }
}

impl PhysicsConfig {
    pub fn solver_params(&self) -> SolverParams {
        SolverParams {
            dt: self.dt,
            diff: self.diff,
            visc: self.visc,
        }
    }
}

impl DeviceSettings {
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            threads: self.threads,
            execution_width: self.execution_width,
            max_threads_per_group: self.max_threads_per_group,
        }
    }
}

pub fn load() -> Config {
    load_from(std::path::Path::new(CONFIG_FILE))
}

pub fn load_from(path: &std::path::Path) -> Config {
    if !path.exists() {
        log::debug!("{} not found; using defaults", path.display());
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("failed to parse {}: {e}; using defaults", path.display());
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read {}: {e}; using defaults", path.display());
            Config::default()
        }
    }
}
