//! The five grid kernels the solver dispatches.
//!
//! Every kernel derives the field side length from its dispatch grid
//! (`n = grid.width + 2`) and touches interior cells `1..n-1` only, except
//! `set_bnd` which writes the four edges. Bindings are ordinal, see each
//! kernel for its layout.

use rayon::prelude::*;

use crate::device::{Binding, Invocation, Library};

pub const RELAX: &str = "relax";
pub const PROJECT_DIVERGENCE: &str = "project_divergence";
pub const PROJECT_GRADIENT: &str = "project_gradient";
pub const ADVECT: &str = "advect";
pub const SET_BND: &str = "set_bnd";

/// Kernel names the solver needs, in pipeline construction order.
pub const ALL: [&str; 5] = [RELAX, PROJECT_DIVERGENCE, PROJECT_GRADIENT, ADVECT, SET_BND];

const TAG_VX: i32 = 1;
const TAG_VY: i32 = 2;

/// Library holding all solver kernels.
pub fn library() -> Library {
    use Binding::{Field, Scalar};
    Library::new()
        .with_kernel(RELAX, &[Field, Field, Scalar, Scalar], relax)
        .with_kernel(PROJECT_DIVERGENCE, &[Field, Field, Field, Field], project_divergence)
        .with_kernel(PROJECT_GRADIENT, &[Field, Field, Field, Field], project_gradient)
        .with_kernel(ADVECT, &[Field, Field, Field, Field, Scalar], advect)
        .with_kernel(SET_BND, &[Scalar, Field], set_bnd)
}

/// One Jacobi sweep. Bindings: 0 x (rw), 1 x0, 2 a, 3 c.
///
/// x[i,j] = (x0[i,j] + a * (x[i-1,j] + x[i+1,j] + x[i,j-1] + x[i,j+1])) / c,
/// with neighbours read from the sweep's input state.
pub fn relax(inv: &Invocation) {
    let n = inv.grid.width + 2;
    let rows = inv.grid.height;
    let x0 = inv.buffer(1).contents();
    let a = inv.buffer(2).scalar_f32();
    let c_inv = 1.0 / inv.buffer(3).scalar_f32();
    inv.buffer(0).with_f32_mut(|x| {
        let prev = x.to_vec();
        x.par_chunks_mut(n)
            .enumerate()
            .skip(1)
            .take(rows)
            .with_min_len(inv.group.height)
            .for_each(|(j, row)| {
                for i in 1..(n - 1) {
                    let k = i + j * n;
                    let neighbors = prev[k - 1] + prev[k + 1] + prev[k - n] + prev[k + n];
                    row[i] = (x0[k] + a * neighbors) * c_inv;
                }
            });
    });
}

/// Divergence and pressure reset. Bindings: 0 vx, 1 vy, 2 p (w), 3 div (w).
pub fn project_divergence(inv: &Invocation) {
    let n = inv.grid.width + 2;
    let rows = inv.grid.height;
    let vx = inv.buffer(0).contents();
    let vy = inv.buffer(1).contents();
    let scale = -0.5 / n as f32;
    inv.buffer(2).with_f32_mut(|p| {
        inv.buffer(3).with_f32_mut(|div| {
            div.par_chunks_mut(n)
                .zip(p.par_chunks_mut(n))
                .enumerate()
                .skip(1)
                .take(rows)
                .with_min_len(inv.group.height)
                .for_each(|(j, (div_row, p_row))| {
                    for i in 1..(n - 1) {
                        let k = i + j * n;
                        div_row[i] = scale * (vx[k + 1] - vx[k - 1] + vy[k + n] - vy[k - n]);
                        p_row[i] = 0.0;
                    }
                });
        });
    });
}

/// Pressure-gradient subtraction. Bindings: 0 vx (rw), 1 vy (rw), 2 p, 3 div.
pub fn project_gradient(inv: &Invocation) {
    let n = inv.grid.width + 2;
    let rows = inv.grid.height;
    let p = inv.buffer(2).contents();
    let scale = 0.5 * n as f32;
    inv.buffer(0).with_f32_mut(|vx| {
        inv.buffer(1).with_f32_mut(|vy| {
            vx.par_chunks_mut(n)
                .zip(vy.par_chunks_mut(n))
                .enumerate()
                .skip(1)
                .take(rows)
                .with_min_len(inv.group.height)
                .for_each(|(j, (vx_row, vy_row))| {
                    for i in 1..(n - 1) {
                        let k = i + j * n;
                        vx_row[i] -= scale * (p[k + 1] - p[k - 1]);
                        vy_row[i] -= scale * (p[k + n] - p[k - n]);
                    }
                });
        });
    });
}

/// Semi-Lagrangian transport. Bindings: 0 d (w), 1 d0, 2 vx, 3 vy, 4 dt.
pub fn advect(inv: &Invocation) {
    let n = inv.grid.width + 2;
    let rows = inv.grid.height;
    let d0 = inv.buffer(1).contents();
    let vx = inv.buffer(2).contents();
    let vy = inv.buffer(3).contents();
    let dt0 = inv.buffer(4).scalar_f32() * (n - 2) as f32;
    let hi = n as f32 - 1.5;
    inv.buffer(0).with_f32_mut(|d| {
        d.par_chunks_mut(n)
            .enumerate()
            .skip(1)
            .take(rows)
            .with_min_len(inv.group.height)
            .for_each(|(j, row)| {
                for i in 1..(n - 1) {
                    let k = i + j * n;
                    let x = (i as f32 - dt0 * vx[k]).clamp(0.5, hi);
                    let y = (j as f32 - dt0 * vy[k]).clamp(0.5, hi);
                    let i0 = x.floor() as usize;
                    let j0 = y.floor() as usize;
                    let s1 = x - i0 as f32;
                    let s0 = 1.0 - s1;
                    let t1 = y - j0 as f32;
                    let t0 = 1.0 - t1;
                    let at = |ii: usize, jj: usize| d0[ii + jj * n];
                    row[i] = s0 * (t0 * at(i0, j0) + t1 * at(i0, j0 + 1))
                        + s1 * (t0 * at(i0 + 1, j0) + t1 * at(i0 + 1, j0 + 1));
                }
            });
    });
}

/// Edge reflection. Bindings: 0 b (i32 tag), 1 x (rw). Corners untouched.
///
/// Tag 1 negates the left/right edges, tag 2 the top/bottom edges; every
/// other edge copies its interior neighbour.
pub fn set_bnd(inv: &Invocation) {
    let n = inv.grid.width + 2;
    let b = inv.buffer(0).scalar_i32();
    let reflect = |flip: bool, v: f32| if flip { -v } else { v };
    inv.buffer(1).with_f32_mut(|x| {
        // [bottom, top, left, right] for each i in 1..n-1
        let edges: Vec<[f32; 4]> = {
            let src: &[f32] = x;
            (1..(n - 1))
                .into_par_iter()
                .with_min_len(inv.group.width)
                .map(|i| {
                    [
                        reflect(b == TAG_VY, src[i + n]),
                        reflect(b == TAG_VY, src[i + (n - 2) * n]),
                        reflect(b == TAG_VX, src[1 + i * n]),
                        reflect(b == TAG_VX, src[(n - 2) + i * n]),
                    ]
                })
                .collect()
        };
        for (i, [bottom, top, left, right]) in (1..(n - 1)).zip(edges) {
            x[i] = bottom;
            x[i + (n - 1) * n] = top;
            x[i * n] = left;
            x[(n - 1) + i * n] = right;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceBuffer, DeviceConfig, Size};

    const SMALL: usize = 8;

    fn device() -> Device {
        let config = DeviceConfig {
            threads: 2,
            execution_width: 4,
            max_threads_per_group: 16,
        };
        Device::new(config, library()).unwrap()
    }

    fn run(device: &Device, name: &str, bindings: &[&DeviceBuffer], grid: Size) {
        let queue = device.new_command_queue().unwrap();
        let pipeline = device.new_pipeline(name).unwrap();
        let mut cb = queue.command_buffer();
        cb.dispatch(&pipeline, bindings, grid, pipeline.group_2d());
        cb.commit().wait_until_completed();
    }

    fn interior() -> Size {
        Size::new(SMALL - 2, SMALL - 2, 1)
    }

    fn at(x: usize, y: usize) -> usize {
        x + y * SMALL
    }

    #[test]
    fn test_library_has_all_kernels() {
        let lib = library();
        for name in ALL {
            assert!(lib.contains(name), "missing kernel {}", name);
        }
    }

    #[test]
    fn test_relax_is_jacobi() {
        let device = device();
        let mut init = vec![0.0; SMALL * SMALL];
        init[at(3, 3)] = 6.0;
        let x = device.new_buffer_with_f32(&init);
        let x0 = device.new_buffer(SMALL * SMALL);
        let a = device.new_buffer_with_f32(&[1.0]);
        let c = device.new_buffer_with_f32(&[6.0]);
        run(&device, RELAX, &[&x, &x0, &a, &c], interior());
        let out = x.contents();
        // Centre only sees zero neighbours from the previous sweep.
        assert_eq!(out[at(3, 3)], 0.0);
        // Every axis neighbour picks up 6 / 6 from the old centre value,
        // including the ones visited after the centre was overwritten.
        for (i, j) in [(2, 3), (4, 3), (3, 2), (3, 4)] {
            assert_eq!(out[at(i, j)], 1.0, "neighbour ({}, {})", i, j);
        }
        assert_eq!(out[at(4, 4)], 0.0);
    }

    #[test]
    fn test_relax_leaves_edges() {
        let device = device();
        let x = device.new_buffer_with_f32(&vec![9.0; SMALL * SMALL]);
        let x0 = device.new_buffer(SMALL * SMALL);
        let a = device.new_buffer_with_f32(&[0.0]);
        let c = device.new_buffer_with_f32(&[1.0]);
        run(&device, RELAX, &[&x, &x0, &a, &c], interior());
        let out = x.contents();
        assert_eq!(out[at(0, 3)], 9.0);
        assert_eq!(out[at(SMALL - 1, 0)], 9.0);
        assert_eq!(out[at(2, 2)], 0.0);
    }

    #[test]
    fn test_project_divergence_of_linear_field() {
        let device = device();
        // vx = x gives d(vx)/dx = 1 everywhere.
        let vx_data: Vec<f32> = (0..SMALL * SMALL).map(|k| (k % SMALL) as f32).collect();
        let vx = device.new_buffer_with_f32(&vx_data);
        let vy = device.new_buffer(SMALL * SMALL);
        let p = device.new_buffer_with_f32(&vec![5.0; SMALL * SMALL]);
        let div = device.new_buffer(SMALL * SMALL);
        run(&device, PROJECT_DIVERGENCE, &[&vx, &vy, &p, &div], interior());
        let div = div.contents();
        let p = p.contents();
        let expected = -0.5 / SMALL as f32 * 2.0;
        for j in 1..SMALL - 1 {
            for i in 1..SMALL - 1 {
                assert!((div[at(i, j)] - expected).abs() < 1e-6);
                assert_eq!(p[at(i, j)], 0.0);
            }
        }
        assert_eq!(p[at(0, 0)], 5.0, "edges keep their value");
    }

    #[test]
    fn test_project_gradient_subtracts() {
        let device = device();
        let vx = device.new_buffer(SMALL * SMALL);
        let vy = device.new_buffer(SMALL * SMALL);
        // p = y, so only vy changes: vy -= 0.5 * n * 2
        let p_data: Vec<f32> = (0..SMALL * SMALL).map(|k| (k / SMALL) as f32).collect();
        let p = device.new_buffer_with_f32(&p_data);
        let div = device.new_buffer(SMALL * SMALL);
        run(&device, PROJECT_GRADIENT, &[&vx, &vy, &p, &div], interior());
        let vx = vx.contents();
        let vy = vy.contents();
        assert_eq!(vx[at(3, 3)], 0.0);
        assert_eq!(vy[at(3, 3)], -(SMALL as f32));
        assert_eq!(vy[at(0, 3)], 0.0);
    }

    #[test]
    fn test_advect_zero_velocity_copies() {
        let device = device();
        let d0_data: Vec<f32> = (0..SMALL * SMALL).map(|k| k as f32).collect();
        let d0 = device.new_buffer_with_f32(&d0_data);
        let d = device.new_buffer(SMALL * SMALL);
        let vx = device.new_buffer(SMALL * SMALL);
        let vy = device.new_buffer(SMALL * SMALL);
        let dt = device.new_buffer_with_f32(&[1.0]);
        run(&device, ADVECT, &[&d, &d0, &vx, &vy, &dt], interior());
        let d = d.contents();
        for j in 1..SMALL - 1 {
            for i in 1..SMALL - 1 {
                assert_eq!(d[at(i, j)], d0_data[at(i, j)]);
            }
        }
    }

    #[test]
    fn test_advect_half_cell_interpolates() {
        let device = device();
        let d0_data: Vec<f32> = (0..SMALL * SMALL).map(|k| (k % SMALL) as f32).collect();
        let d0 = device.new_buffer_with_f32(&d0_data);
        let d = device.new_buffer(SMALL * SMALL);
        // dt * (n - 2) * vx = 0.5 cell
        let vx = device.new_buffer_with_f32(&vec![0.5 / (SMALL - 2) as f32; SMALL * SMALL]);
        let vy = device.new_buffer(SMALL * SMALL);
        let dt = device.new_buffer_with_f32(&[1.0]);
        run(&device, ADVECT, &[&d, &d0, &vx, &vy, &dt], interior());
        let d = d.contents();
        assert!((d[at(3, 3)] - 2.5).abs() < 1e-5, "got {}", d[at(3, 3)]);
    }

    #[test]
    fn test_advect_clamps_backtrace() {
        let device = device();
        let d0 = device.new_buffer_with_f32(&vec![2.0; SMALL * SMALL]);
        let d = device.new_buffer(SMALL * SMALL);
        let vx = device.new_buffer_with_f32(&vec![100.0; SMALL * SMALL]);
        let vy = device.new_buffer_with_f32(&vec![-100.0; SMALL * SMALL]);
        let dt = device.new_buffer_with_f32(&[1.0]);
        run(&device, ADVECT, &[&d, &d0, &vx, &vy, &dt], interior());
        let d = d.contents();
        for j in 1..SMALL - 1 {
            for i in 1..SMALL - 1 {
                assert!((d[at(i, j)] - 2.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_set_bnd_vy_flips_horizontal_edges() {
        let device = device();
        let data: Vec<f32> = (0..SMALL * SMALL).map(|k| k as f32 + 1.0).collect();
        let x = device.new_buffer_with_f32(&data);
        let b = device.new_buffer_with_i32(&[2]);
        let queue = device.new_command_queue().unwrap();
        let pipeline = device.new_pipeline(SET_BND).unwrap();
        let mut cb = queue.command_buffer();
        cb.dispatch(&pipeline, &[&b, &x], Size::new(SMALL - 2, 1, 1), pipeline.group_1d());
        cb.commit().wait_until_completed();
        let out = x.contents();
        for i in 1..SMALL - 1 {
            assert_eq!(out[at(i, 0)], -data[at(i, 1)]);
            assert_eq!(out[at(i, SMALL - 1)], -data[at(i, SMALL - 2)]);
            assert_eq!(out[at(0, i)], data[at(1, i)]);
            assert_eq!(out[at(SMALL - 1, i)], data[at(SMALL - 2, i)]);
        }
        assert_eq!(out[at(0, 0)], data[at(0, 0)], "corners are left to the host");
    }
}
