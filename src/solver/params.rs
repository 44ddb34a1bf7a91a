/// Simulation parameters. Fixed for the lifetime of a simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    /// Time step.
    pub dt: f32,
    /// Dye diffusion rate.
    pub diff: f32,
    /// Kinematic viscosity.
    pub visc: f32,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            dt: 30.0,
            diff: 0.0,
            visc: 1e-7,
        }
    }
}
