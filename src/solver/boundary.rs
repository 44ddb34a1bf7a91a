use crate::device::{DeviceBuffer, Size};
use crate::state::{CELLS, N};

use super::core::Solver;

/// Physical quantity a buffer holds, selecting its edge reflection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Density, pressure, divergence: every edge copies its neighbour.
    Scalar,
    /// X velocity: left/right edges negate their neighbour.
    Vx,
    /// Y velocity: top/bottom edges negate their neighbour.
    Vy,
}

impl FieldType {
    /// Integer tag bound to the `set_bnd` kernel.
    pub const fn tag(self) -> i32 {
        match self {
            FieldType::Scalar => 0,
            FieldType::Vx => 1,
            FieldType::Vy => 2,
        }
    }

    pub const ALL: [FieldType; 3] = [FieldType::Scalar, FieldType::Vx, FieldType::Vy];
}

/// Set each corner of an `n`x`n` field to the mean of its two edge
/// neighbours. Same rule for every field type.
pub fn fix_corners(x: &mut [f32], n: usize) {
    let at = |i: usize, j: usize| i + j * n;
    x[at(0, 0)] = 0.5 * (x[at(1, 0)] + x[at(0, 1)]);
    x[at(0, n - 1)] = 0.5 * (x[at(1, n - 1)] + x[at(0, n - 2)]);
    x[at(n - 1, 0)] = 0.5 * (x[at(n - 2, 0)] + x[at(n - 1, 1)]);
    x[at(n - 1, n - 1)] = 0.5 * (x[at(n - 2, n - 1)] + x[at(n - 1, n - 2)]);
}

impl Solver {
    /// Apply the boundary rule for `field_type` to `x`.
    ///
    /// Edges are reflected on the device; the host then waits for the
    /// queue to drain and patches the corners with a full read-modify-write.
    /// On return no device work is outstanding. A buffer that is not an
    /// NxN field is logged and left untouched.
    pub fn enforce(&mut self, field_type: FieldType, x: &DeviceBuffer) {
        if x.len() != CELLS {
            log::error!("boundary pass on a {}-value buffer, expected {}; skipped", x.len(), CELLS);
            return;
        }
        let tag = &self.tags[field_type.tag() as usize];
        let mut cb = self.queue.command_buffer();
        cb.dispatch(&self.kernels.set_bnd, &[tag, x], Size::new(N - 2, 1, 1), self.edge_group);
        cb.commit().wait_until_completed();

        x.read_into(&mut self.feedback);
        fix_corners(&mut self.feedback, N);
        x.upload(&self.feedback);
    }
}
