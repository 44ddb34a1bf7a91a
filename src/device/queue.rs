use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::{DeviceBuffer, DeviceInitializationError, Invocation, Pipeline, Size};

struct Command {
    pipeline: Pipeline,
    bindings: Vec<DeviceBuffer>,
    grid: Size,
    group: Size,
}

struct Submission {
    commands: Vec<Command>,
    done: mpsc::SyncSender<()>,
}

/// Single in-order work queue. Committed command buffers run on a worker
/// thread one after another; each dispatch fans out across the device's
/// thread pool.
pub struct CommandQueue {
    tx: Option<mpsc::Sender<Submission>>,
    worker: Option<JoinHandle<()>>,
}

impl CommandQueue {
    pub(crate) fn spawn(pool: Arc<rayon::ThreadPool>) -> Result<Self, DeviceInitializationError> {
        let (tx, rx) = mpsc::channel::<Submission>();
        let worker = std::thread::Builder::new()
            .name("dyeflow-queue".into())
            .spawn(move || {
                for submission in rx {
                    for cmd in &submission.commands {
                        let invocation = Invocation::new(cmd.grid, cmd.group, &cmd.bindings);
                        pool.install(|| (cmd.pipeline.function())(&invocation));
                    }
                    // The host may have dropped the handle without waiting.
                    let _ = submission.done.send(());
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Start encoding a new command buffer.
    pub fn command_buffer(&self) -> CommandBuffer<'_> {
        CommandBuffer {
            queue: self,
            commands: Vec::new(),
        }
    }

    fn submit(&self, commands: Vec<Command>) -> Committed {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let sent = self
            .tx
            .as_ref()
            .map(|tx| tx.send(Submission { commands, done: done_tx }).is_ok())
            .unwrap_or(false);
        if !sent {
            log::error!("command queue worker is gone; submission dropped");
        }
        Committed { done: done_rx }
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("command queue worker panicked");
            }
        }
    }
}

/// Encoder for an ordered list of dispatches, submitted together.
pub struct CommandBuffer<'q> {
    queue: &'q CommandQueue,
    commands: Vec<Command>,
}

impl CommandBuffer<'_> {
    /// Encode one dispatch of `pipeline` over `grid` threads, grouped by
    /// `group`. Bindings are ordinal: `bindings[i]` is kernel argument `i`.
    pub fn dispatch(&mut self, pipeline: &Pipeline, bindings: &[&DeviceBuffer], grid: Size, group: Size) {
        if bindings.len() != pipeline.arity() {
            log::error!(
                "kernel `{}` takes {} buffers, got {}; dispatch skipped",
                pipeline.name(),
                pipeline.arity(),
                bindings.len()
            );
            return;
        }
        for (i, (buffer, binding)) in bindings.iter().zip(pipeline.layout()).enumerate() {
            let need = binding.min_len(grid);
            if buffer.len() < need {
                log::error!(
                    "kernel `{}` argument {} needs {} values for grid {:?}, buffer has {}; dispatch skipped",
                    pipeline.name(),
                    i,
                    need,
                    grid,
                    buffer.len()
                );
                return;
            }
        }
        if group.count() > pipeline.max_total_threads_per_group() {
            log::warn!(
                "kernel `{}` group {:?} exceeds {} threads",
                pipeline.name(),
                group,
                pipeline.max_total_threads_per_group()
            );
        }
        self.commands.push(Command {
            pipeline: pipeline.clone(),
            bindings: bindings.iter().map(|b| (*b).clone()).collect(),
            grid,
            group,
        });
    }

    /// Hand the encoded work to the queue. Work starts after everything
    /// committed earlier on the same queue.
    pub fn commit(self) -> Committed {
        self.queue.submit(self.commands)
    }
}

/// Handle to committed work.
pub struct Committed {
    done: mpsc::Receiver<()>,
}

impl Committed {
    /// Block until the work, and therefore everything committed before it,
    /// has finished.
    pub fn wait_until_completed(self) {
        if self.done.recv().is_err() {
            log::error!("command queue worker stopped before completing submitted work");
        }
    }
}
