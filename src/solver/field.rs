use crate::device::{Device, DeviceBuffer};
use crate::state::CELLS;

/// Snapshot length did not match the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("field snapshot has {got} values, expected {expected}")]
pub struct FieldSizeError {
    pub expected: usize,
    pub got: usize,
}

/// One NxN grid of floats: a device buffer plus the host staging array
/// used for read-modify-write updates.
pub struct Field {
    buffer: DeviceBuffer,
    staging: Vec<f32>,
}

impl Field {
    pub fn new(device: &Device) -> Self {
        Self {
            buffer: device.new_buffer(CELLS),
            staging: vec![0.0; CELLS],
        }
    }

    pub fn buffer(&self) -> &DeviceBuffer {
        &self.buffer
    }

    /// Full device-to-host copy.
    pub fn read(&self) -> Vec<f32> {
        self.buffer.contents()
    }

    /// Full host-to-device copy.
    pub fn write(&self, snapshot: &[f32]) -> Result<(), FieldSizeError> {
        if snapshot.len() != CELLS {
            return Err(FieldSizeError {
                expected: CELLS,
                got: snapshot.len(),
            });
        }
        self.buffer.upload(snapshot);
        Ok(())
    }

    /// Add `amount` to one cell: full read-back, one mutation, full write-back.
    pub(crate) fn add_at(&mut self, index: usize, amount: f32) {
        self.buffer.read_into(&mut self.staging);
        self.staging[index] += amount;
        self.buffer.upload(&self.staging);
    }
}

/// A field and its pre-step snapshot. Operations read `previous` and
/// write `current`.
pub struct FieldPair {
    pub current: Field,
    pub previous: Field,
}

impl FieldPair {
    pub fn new(device: &Device) -> Self {
        Self {
            current: Field::new(device),
            previous: Field::new(device),
        }
    }

    /// Exchange the roles of the two buffers.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::test_support::{device, patterned};

    #[test]
    fn test_write_then_read_round_trips() {
        let device = device();
        let field = Field::new(&device);
        let data = patterned();
        field.write(&data).unwrap();
        assert_eq!(field.read(), data);
    }

    #[test]
    fn test_write_rejects_wrong_length() {
        let device = device();
        let field = Field::new(&device);
        let err = field.write(&[1.0; 3]).unwrap_err();
        assert_eq!(err, FieldSizeError { expected: CELLS, got: 3 });
        assert!(field.read().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_add_at_touches_one_cell() {
        let device = device();
        let mut field = Field::new(&device);
        let data = patterned();
        field.write(&data).unwrap();
        field.add_at(77, 1.5);
        let out = field.read();
        for (k, (a, b)) in out.iter().zip(&data).enumerate() {
            if k == 77 {
                assert_eq!(*a, b + 1.5);
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_swap_exchanges_roles() {
        let device = device();
        let mut pair = FieldPair::new(&device);
        let current = pair.current.buffer().clone();
        let previous = pair.previous.buffer().clone();
        pair.swap();
        assert!(pair.current.buffer().same_storage(&previous));
        assert!(pair.previous.buffer().same_storage(&current));
    }
}
