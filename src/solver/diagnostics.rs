use crate::state::{idx, N};

/// Sum of all density in the field, boundary cells included.
pub fn total_density(density: &[f32]) -> f64 {
    density.iter().map(|&d| d as f64).sum()
}

/// Volume-averaged kinetic energy over interior cells: KE = 0.5 * <vx^2 + vy^2>.
pub fn kinetic_energy(vx: &[f32], vy: &[f32]) -> f64 {
    let mut sum = 0.0;
    for j in 1..(N - 1) {
        for i in 1..(N - 1) {
            let k = idx(i, j);
            sum += (vx[k] * vx[k] + vy[k] * vy[k]) as f64;
        }
    }
    0.5 * sum / ((N - 2) * (N - 2)) as f64
}

fn divergence_at(vx: &[f32], vy: &[f32], i: usize, j: usize) -> f64 {
    let k = idx(i, j);
    0.5 * ((vx[k + 1] - vx[k - 1]) + (vy[k + N] - vy[k - N])) as f64
}

/// Sum of |central-difference divergence| over interior cells.
pub fn total_abs_divergence(vx: &[f32], vy: &[f32]) -> f64 {
    let mut sum = 0.0;
    for j in 1..(N - 1) {
        for i in 1..(N - 1) {
            sum += divergence_at(vx, vy, i, j).abs();
        }
    }
    sum
}

/// Largest |central-difference divergence| over interior cells.
pub fn max_abs_divergence(vx: &[f32], vy: &[f32]) -> f64 {
    let mut max: f64 = 0.0;
    for j in 1..(N - 1) {
        for i in 1..(N - 1) {
            max = max.max(divergence_at(vx, vy, i, j).abs());
        }
    }
    max
}
