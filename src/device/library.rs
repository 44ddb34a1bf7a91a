use std::collections::HashMap;

use super::{DeviceBuffer, Size};

/// Signature of a compute kernel: one call processes the whole dispatch grid.
pub type KernelFn = fn(&Invocation);

/// Arguments of one kernel dispatch, as seen by the kernel.
pub struct Invocation<'a> {
    pub grid: Size,
    pub group: Size,
    bindings: &'a [DeviceBuffer],
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(grid: Size, group: Size, bindings: &'a [DeviceBuffer]) -> Self {
        Self { grid, group, bindings }
    }

    /// Buffer bound at ordinal `index`. Arity is checked at encode time.
    pub fn buffer(&self, index: usize) -> &DeviceBuffer {
        &self.bindings[index]
    }
}

/// Shape a kernel expects of one buffer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// One value.
    Scalar,
    /// One value per dispatched thread.
    Array,
    /// A square field with a one-cell border around the dispatch grid:
    /// (grid.width + 2)^2 values.
    Field,
}

impl Binding {
    /// Smallest buffer length this binding accepts for a dispatch over `grid`.
    pub fn min_len(self, grid: Size) -> usize {
        match self {
            Binding::Scalar => 1,
            Binding::Array => grid.count(),
            Binding::Field => (grid.width + 2) * (grid.width + 2),
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct KernelEntry {
    pub layout: &'static [Binding],
    pub function: KernelFn,
}

/// Named set of kernels a device can build pipelines from.
#[derive(Clone, Default)]
pub struct Library {
    kernels: HashMap<&'static str, KernelEntry>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`; `layout[i]` describes argument `i`.
    pub fn with_kernel(mut self, name: &'static str, layout: &'static [Binding], function: KernelFn) -> Self {
        self.kernels.insert(name, KernelEntry { layout, function });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kernels.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kernels.keys().copied()
    }

    pub(crate) fn get(&self, name: &str) -> Option<(&'static str, KernelEntry)> {
        self.kernels.get_key_value(name).map(|(k, v)| (*k, *v))
    }
}

/// A resolved kernel plus the execution limits the host uses to shape
/// thread groups.
#[derive(Clone)]
pub struct Pipeline {
    name: &'static str,
    entry: KernelEntry,
    execution_width: usize,
    max_threads_per_group: usize,
}

impl Pipeline {
    pub(crate) fn new(
        name: &'static str,
        entry: KernelEntry,
        execution_width: usize,
        max_threads_per_group: usize,
    ) -> Self {
        Self {
            name,
            entry,
            execution_width,
            max_threads_per_group,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.entry.layout.len()
    }

    pub fn layout(&self) -> &'static [Binding] {
        self.entry.layout
    }

    pub fn thread_execution_width(&self) -> usize {
        self.execution_width
    }

    pub fn max_total_threads_per_group(&self) -> usize {
        self.max_threads_per_group
    }

    /// Thread-group shape for 2-D grids: one execution width across,
    /// as many rows as the per-group limit allows.
    pub fn group_2d(&self) -> Size {
        Size::new(
            self.execution_width,
            (self.max_threads_per_group / self.execution_width).max(1),
            1,
        )
    }

    /// Thread-group shape for 1-D grids.
    pub fn group_1d(&self) -> Size {
        Size::new(self.max_threads_per_group, 1, 1)
    }

    pub(crate) fn function(&self) -> KernelFn {
        self.entry.function
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("layout", &self.entry.layout)
            .finish()
    }
}
