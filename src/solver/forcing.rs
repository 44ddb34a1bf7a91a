use crate::state::{idx, in_bounds, N};

use super::Simulation;

/// A forcing call addressed a cell outside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cell ({x}, {y}) is outside the {n}x{n} grid")]
pub struct OutOfRangeError {
    pub x: i32,
    pub y: i32,
    pub n: usize,
}

fn cell_index(x: i32, y: i32) -> Result<usize, OutOfRangeError> {
    if !in_bounds(x as i64, y as i64) {
        return Err(OutOfRangeError { x, y, n: N });
    }
    Ok(idx(x as usize, y as usize))
}

impl Simulation {
    /// Add dye at one cell. Runs between ticks only, which `&mut self`
    /// guarantees since a tick never returns with device work in flight.
    pub fn add_density(&mut self, x: i32, y: i32, amount: f32) -> Result<(), OutOfRangeError> {
        let k = cell_index(x, y)?;
        self.density.current.add_at(k, amount);
        Ok(())
    }

    /// Add a velocity impulse at one cell.
    pub fn add_velocity(&mut self, x: i32, y: i32, amount_x: f32, amount_y: f32) -> Result<(), OutOfRangeError> {
        let k = cell_index(x, y)?;
        self.velocity_x.current.add_at(k, amount_x);
        self.velocity_y.current.add_at(k, amount_y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::simulation;

    #[test]
    fn test_add_density_changes_exactly_one_cell() {
        let mut sim = simulation();
        sim.add_density(10, 20, 4.0).unwrap();
        let before = sim.density();
        sim.add_density(128, 64, 2.5).unwrap();
        let after = sim.density();
        for (k, (b, a)) in before.iter().zip(&after).enumerate() {
            if k == idx(128, 64) {
                assert_eq!(*a, b + 2.5);
            } else {
                assert_eq!(a, b, "cell {} changed", k);
            }
        }
    }

    #[test]
    fn test_add_density_accumulates() {
        let mut sim = simulation();
        sim.add_density(0, 0, 1.0).unwrap();
        sim.add_density(0, 0, 1.0).unwrap();
        assert_eq!(sim.density()[idx(0, 0)], 2.0);
    }

    #[test]
    fn test_add_velocity_writes_both_components() {
        let mut sim = simulation();
        sim.add_velocity(5, 6, 0.8, -0.4).unwrap();
        assert_eq!(sim.velocity_x()[idx(5, 6)], 0.8);
        assert_eq!(sim.velocity_y()[idx(5, 6)], -0.4);
        assert_eq!(sim.velocity_x()[idx(6, 6)], 0.0);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut sim = simulation();
        let n = N as i32;
        for (x, y) in [(-1, 0), (0, -1), (n, 0), (0, n), (i32::MIN, i32::MAX)] {
            assert_eq!(
                sim.add_density(x, y, 1.0),
                Err(OutOfRangeError { x, y, n: N })
            );
            assert!(sim.add_velocity(x, y, 1.0, 1.0).is_err());
        }
        assert!(sim.density().iter().all(|v| *v == 0.0));
        assert!(sim.velocity_x().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_error_message() {
        let err = OutOfRangeError { x: 300, y: 2, n: N };
        assert_eq!(err.to_string(), "cell (300, 2) is outside the 256x256 grid");
    }
}
