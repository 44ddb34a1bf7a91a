use crate::device::{CommandQueue, Committed, Device, DeviceBuffer, DeviceInitializationError, Pipeline, Size};
use crate::kernels;
use crate::state::{CELLS, N};

use super::boundary::FieldType;
use super::params::SolverParams;

/// Jacobi sweeps per linear solve. Fixed; no convergence check.
pub const RELAX_SWEEPS: usize = 16;

/// Which diffusion coefficient a `diffuse` call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    Viscosity,
    Diffusion,
}

pub(crate) struct Kernels {
    pub relax: Pipeline,
    pub project_divergence: Pipeline,
    pub project_gradient: Pipeline,
    pub advect: Pipeline,
    pub set_bnd: Pipeline,
}

impl Kernels {
    fn resolve(device: &Device) -> Result<Self, DeviceInitializationError> {
        Ok(Self {
            relax: device.new_pipeline(kernels::RELAX)?,
            project_divergence: device.new_pipeline(kernels::PROJECT_DIVERGENCE)?,
            project_gradient: device.new_pipeline(kernels::PROJECT_GRADIENT)?,
            advect: device.new_pipeline(kernels::ADVECT)?,
            set_bnd: device.new_pipeline(kernels::SET_BND)?,
        })
    }
}

/// Device-resident copies of the simulation parameters, written once.
struct ParamBuffers {
    dt: DeviceBuffer,
    diffusion: DeviceBuffer,
    viscosity: DeviceBuffer,
}

/// Encodes the solver operations onto one device queue.
///
/// Every operation that writes a field ends with a boundary pass on it,
/// and every boundary pass waits for the queue, so no device work is
/// outstanding when an operation returns.
pub struct Solver {
    pub(crate) queue: CommandQueue,
    pub(crate) kernels: Kernels,
    pub(crate) tags: [DeviceBuffer; 3],
    pub(crate) edge_group: Size,
    /// Host mirror used for the corner read-modify-write.
    pub(crate) feedback: Vec<f32>,
    cell_group: Size,
    params: ParamBuffers,
}

impl Solver {
    pub fn new(device: &Device, params: &SolverParams) -> Result<Self, DeviceInitializationError> {
        let kernels = Kernels::resolve(device)?;
        let queue = device.new_command_queue()?;
        let tags = FieldType::ALL.map(|ft| device.new_buffer_with_i32(&[ft.tag()]));
        let cell_group = kernels.relax.group_2d();
        let edge_group = kernels.set_bnd.group_1d();
        let params = ParamBuffers {
            dt: device.new_buffer_with_f32(&[params.dt]),
            diffusion: device.new_buffer_with_f32(&[params.diff]),
            viscosity: device.new_buffer_with_f32(&[params.visc]),
        };
        Ok(Self {
            queue,
            kernels,
            tags,
            edge_group,
            feedback: vec![0.0; CELLS],
            cell_group,
            params,
        })
    }

    fn interior() -> Size {
        Size::new(N - 2, N - 2, 1)
    }

    /// Commit one interior-grid dispatch without waiting on it.
    fn submit(&self, pipeline: &Pipeline, bindings: &[&DeviceBuffer]) -> Committed {
        let mut cb = self.queue.command_buffer();
        cb.dispatch(pipeline, bindings, Self::interior(), self.cell_group);
        cb.commit()
    }

    /// Solve x = (x0 + a * sum(neighbours of x)) / c by `RELAX_SWEEPS`
    /// Jacobi sweeps, enforcing the boundary after each sweep.
    pub fn relax(&mut self, field_type: FieldType, x: &DeviceBuffer, x0: &DeviceBuffer, a: f32, c: f32) {
        let a_buf = DeviceBuffer::from_f32(&[a]);
        let c_buf = DeviceBuffer::from_f32(&[c]);
        for _ in 0..RELAX_SWEEPS {
            self.submit(&self.kernels.relax, &[x, x0, &a_buf, &c_buf]);
            self.enforce(field_type, x);
        }
    }

    /// Implicit diffusion of `x0` into `x`.
    /// a = dt * rate * (N-2)^2, c = 1 + 6a
    pub fn diffuse(&mut self, field_type: FieldType, x: &DeviceBuffer, x0: &DeviceBuffer, rate: Rate) {
        let rate = match rate {
            Rate::Viscosity => self.params.viscosity.scalar_f32(),
            Rate::Diffusion => self.params.diffusion.scalar_f32(),
        };
        let a = self.params.dt.scalar_f32() * rate * ((N - 2) * (N - 2)) as f32;
        self.relax(field_type, x, x0, a, 1.0 + 6.0 * a);
    }

    /// Make (vx, vy) divergence-free. `p` and `div` are scratch and must be
    /// distinct from each other and from the velocity buffers.
    pub fn project(&mut self, vx: &DeviceBuffer, vy: &DeviceBuffer, p: &DeviceBuffer, div: &DeviceBuffer) {
        self.submit(&self.kernels.project_divergence, &[vx, vy, p, div]);
        self.enforce(FieldType::Scalar, div);
        self.enforce(FieldType::Scalar, p);

        self.relax(FieldType::Scalar, p, div, 1.0, 6.0);

        self.submit(&self.kernels.project_gradient, &[vx, vy, p, div]);
        self.enforce(FieldType::Vx, vx);
        self.enforce(FieldType::Vy, vy);
    }

    /// Transport `d0` along (vx, vy) into `d`.
    pub fn advect(
        &mut self,
        field_type: FieldType,
        d: &DeviceBuffer,
        d0: &DeviceBuffer,
        vx: &DeviceBuffer,
        vy: &DeviceBuffer,
    ) {
        self.submit(&self.kernels.advect, &[d, d0, vx, vy, &self.params.dt]);
        self.enforce(field_type, d);
    }
}
