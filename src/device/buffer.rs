use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Host-visible device memory.
///
/// Storage is a run of 32-bit words shared between the host and the queue
/// worker. Kernels and the host view it as `f32` (fields, scalar parameters)
/// or `i32` (boundary tags). Cloning the handle aliases the same storage.
#[derive(Clone)]
pub struct DeviceBuffer {
    words: Arc<RwLock<Vec<u32>>>,
    len: usize,
}

impl DeviceBuffer {
    pub(crate) fn zeroed(len: usize) -> Self {
        Self {
            words: Arc::new(RwLock::new(vec![0; len])),
            len,
        }
    }

    pub(crate) fn from_f32(data: &[f32]) -> Self {
        Self {
            words: Arc::new(RwLock::new(bytemuck::cast_slice::<f32, u32>(data).to_vec())),
            len: data.len(),
        }
    }

    pub(crate) fn from_i32(data: &[i32]) -> Self {
        Self {
            words: Arc::new(RwLock::new(bytemuck::cast_slice::<i32, u32>(data).to_vec())),
            len: data.len(),
        }
    }

    /// Number of 32-bit elements.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether two handles refer to the same storage.
    pub fn same_storage(&self, other: &DeviceBuffer) -> bool {
        Arc::ptr_eq(&self.words, &other.words)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<u32>> {
        self.words.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<u32>> {
        self.words.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full device-to-host copy.
    pub fn contents(&self) -> Vec<f32> {
        bytemuck::cast_slice::<u32, f32>(&self.read_guard()).to_vec()
    }

    /// Full device-to-host copy into an existing host array of equal length.
    pub fn read_into(&self, dst: &mut [f32]) {
        dst.copy_from_slice(bytemuck::cast_slice::<u32, f32>(&self.read_guard()));
    }

    /// Full host-to-device copy. `src` must hold exactly `len()` elements.
    pub fn upload(&self, src: &[f32]) {
        self.write_guard().copy_from_slice(bytemuck::cast_slice::<f32, u32>(src));
    }

    /// First element as `f32`, for 1-element parameter buffers.
    pub fn scalar_f32(&self) -> f32 {
        self.read_guard()
            .first()
            .map(|w| f32::from_bits(*w))
            .unwrap_or(0.0)
    }

    /// First element as `i32`, for 1-element tag buffers.
    pub fn scalar_i32(&self) -> i32 {
        self.read_guard().first().map(|w| *w as i32).unwrap_or(0)
    }

    /// Run `f` with exclusive access to the storage viewed as `f32`.
    pub fn with_f32_mut<R>(&self, f: impl FnOnce(&mut [f32]) -> R) -> R {
        let mut guard = self.write_guard();
        f(bytemuck::cast_slice_mut::<u32, f32>(guard.as_mut_slice()))
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer").field("len", &self.len).finish()
    }
}
