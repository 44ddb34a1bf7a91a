/// Width and height of the simulation grid.
pub const N: usize = 256;

/// Number of cells in one field.
pub const CELLS: usize = N * N;

/// Convert 2D coordinates to the row-major flat index `x + y * N`.
/// Callers guarantee `0 <= x, y < N`.
#[inline(always)]
pub const fn idx(x: usize, y: usize) -> usize {
    x + y * N
}

/// Whether `(x, y)` addresses a cell of the grid.
pub fn in_bounds(x: i64, y: i64) -> bool {
    (0..N as i64).contains(&x) && (0..N as i64).contains(&y)
}

/// xorshift128 generator used by the demo force source.
pub struct Xor128 {
    x: u32,
    y: u32,
    z: u32,
    w: u32,
}

impl Xor128 {
    pub fn new(seed: u32) -> Self {
        Self {
            x: seed,
            y: seed.wrapping_mul(1812433253).wrapping_add(1),
            z: seed.wrapping_mul(1812433253).wrapping_mul(2).wrapping_add(2),
            w: seed.wrapping_mul(1812433253).wrapping_mul(3).wrapping_add(3),
        }
    }

    pub fn next(&mut self) -> u32 {
        let t = self.x ^ (self.x << 11);
        self.x = self.y;
        self.y = self.z;
        self.z = self.w;
        self.w = self.w ^ (self.w >> 19) ^ (t ^ (t >> 8));
        self.w
    }

    /// Returns a float in [0.0, 1.0].
    pub fn next_unit(&mut self) -> f32 {
        (self.next() as f64 / u32::MAX as f64) as f32
    }

    /// Returns an integer in [lo, hi], both inclusive.
    pub fn next_in(&mut self, lo: u32, hi: u32) -> u32 {
        lo + self.next() % (hi - lo + 1)
    }
}
