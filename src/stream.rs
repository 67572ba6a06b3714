//! Command queues and where a matrix gets one from.
//!
//! Work on an accelerator is performed asynchronously. Kernels and copies are scheduled on a
//! command queue (a CUDA stream) and execute in the order they were scheduled. The host must
//! wait for the queue to drain before it can safely read memory the device wrote.
//!
//! Every allocated matrix is associated with one queue, used as the default queue for copies
//! and as the barrier for `sync()`. The queue is either the default queue of a device or the
//! queue of some other allocated object, so several matrices can share one ordered stream of
//! work.

use crate::device::{Backend, Device};
use crate::error::{CudaError, CudaResult};
use std::fmt;

/// A handle onto an ordered queue of asynchronous device work.
///
/// Cloning a queue yields another handle onto the same queue; it does not create a new one.
pub trait CommandQueue: Clone {
    /// Wait until all work scheduled on this queue before the call has completed.
    fn synchronize(&self) -> CudaResult<()>;

    /// Returns true if the device this queue submits to addresses host memory directly.
    fn shared_memory(&self) -> bool;
}

/// Implemented by objects that carry a command queue other objects can reuse.
pub trait HasCommandQueue<Q: CommandQueue> {
    /// Returns the queue associated with this object, or `None` if it has not been allocated.
    fn command_queue(&self) -> Option<&Q>;
}

/// Where an allocation takes its command queue from.
pub enum QueueSource<'a, B: Backend> {
    /// Use the default queue of a device.
    Device(&'a B::Device),
    /// Reuse the queue of an existing, allocated object.
    Inherit(&'a dyn HasCommandQueue<B::Queue>),
}

impl<'a, B: Backend> QueueSource<'a, B> {
    /// Take the default queue of `device`.
    pub fn device(device: &'a B::Device) -> Self {
        QueueSource::Device(device)
    }

    /// Take the queue of `object`, which must already be allocated.
    pub fn inherit(object: &'a dyn HasCommandQueue<B::Queue>) -> Self {
        QueueSource::Inherit(object)
    }

    /// Produce the queue to associate with a new allocation.
    ///
    /// # Errors:
    ///
    /// Returns `InvalidHandle` if the inherited object has no queue yet. Errors from creating a
    /// device's default queue are returned unchanged.
    pub fn resolve(&self) -> CudaResult<B::Queue> {
        match *self {
            QueueSource::Device(device) => device.default_queue(),
            QueueSource::Inherit(object) => object
                .command_queue()
                .cloned()
                .ok_or(CudaError::InvalidHandle),
        }
    }

    /// Returns true if the device behind this source shares physical memory with the host.
    pub(crate) fn shared_memory(&self, queue: &B::Queue) -> bool {
        match *self {
            QueueSource::Device(device) => device.shared_memory(),
            QueueSource::Inherit(_) => queue.shared_memory(),
        }
    }
}

impl<'a, B: Backend> Clone for QueueSource<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<'a, B: Backend> Copy for QueueSource<'a, B> {}

impl<'a, B: Backend> fmt::Debug for QueueSource<'a, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            QueueSource::Device(_) => f.write_str("QueueSource::Device"),
            QueueSource::Inherit(_) => f.write_str("QueueSource::Inherit"),
        }
    }
}
