use super::Platform;
use crate::error::{CudaError, CudaResult};
use crate::stream::CommandQueue;
use std::fmt;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

enum Job {
    Run(Box<dyn FnOnce() + Send + 'static>),
    Barrier(SyncSender<()>),
}

struct Worker {
    sender: Mutex<Option<Sender<Job>>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once the backlog has run.
        if let Ok(sender) = self.sender.get_mut() {
            drop(sender.take());
        }
        if let Some(thread) = self.thread.take() {
            // The last handle may be dropped by a job on the worker itself, which cannot join
            // itself; the thread exits on its own once the closed channel drains.
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

/// An ordered queue of work executed on a dedicated worker thread.
///
/// Work runs in the order it was enqueued, asynchronously to the caller. If a job panics the
/// queue is dead: further submissions and synchronization return `LaunchFailed`.
#[derive(Clone)]
pub struct EmulatedQueue {
    worker: Arc<Worker>,
    platform: Arc<Platform>,
}

impl EmulatedQueue {
    pub(crate) fn spawn(platform: Arc<Platform>) -> CudaResult<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread = thread::Builder::new()
            .name("dualmat-queue".to_string())
            .spawn(move || {
                for job in receiver {
                    match job {
                        Job::Run(work) => work(),
                        Job::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|_| CudaError::UnknownError)?;

        Ok(EmulatedQueue {
            worker: Arc::new(Worker {
                sender: Mutex::new(Some(sender)),
                thread: Some(thread),
            }),
            platform,
        })
    }

    /// Schedule `work` to run after everything enqueued before it.
    ///
    /// # Examples:
    ///
    /// ```
    /// use dualmat::emulated::EmulatedDevice;
    /// use dualmat::prelude::*;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let device = EmulatedDevice::new().unwrap();
    /// let queue = device.default_queue().unwrap();
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let c = counter.clone();
    /// queue.enqueue(move || { c.fetch_add(1, Ordering::SeqCst); }).unwrap();
    /// queue.synchronize().unwrap();
    /// assert_eq!(1, counter.load(Ordering::SeqCst));
    /// ```
    pub fn enqueue<F>(&self, work: F) -> CudaResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Job::Run(Box::new(work)))
    }

    /// Returns true if `self` and `other` are handles onto the same queue.
    pub fn same_queue(&self, other: &EmulatedQueue) -> bool {
        Arc::ptr_eq(&self.worker, &other.worker)
    }

    pub(crate) fn platform(&self) -> &Platform {
        &self.platform
    }

    fn submit(&self, job: Job) -> CudaResult<()> {
        let sender = self
            .worker
            .sender
            .lock()
            .map_err(|_| CudaError::LaunchFailed)?;
        match *sender {
            Some(ref sender) => sender.send(job).map_err(|_| CudaError::LaunchFailed),
            None => Err(CudaError::LaunchFailed),
        }
    }
}

impl CommandQueue for EmulatedQueue {
    fn synchronize(&self) -> CudaResult<()> {
        let (done, wait) = mpsc::sync_channel(1);
        self.submit(Job::Barrier(done))?;
        wait.recv().map_err(|_| CudaError::LaunchFailed)
    }

    fn shared_memory(&self) -> bool {
        self.platform.shared_memory
    }
}

impl fmt::Debug for EmulatedQueue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EmulatedQueue")
            .field("worker", &(&*self.worker as *const Worker))
            .field("shared_memory", &self.platform.shared_memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::EmulatedDevice;
    use super::*;
    use crate::device::Device;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn synchronize_waits_for_enqueued_work() {
        let device = EmulatedDevice::new().unwrap();
        let queue = device.default_queue().unwrap();
        let finished = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let finished = finished.clone();
            queue
                .enqueue(move || {
                    thread::sleep(Duration::from_millis(2));
                    let _ = finished.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        queue.synchronize().unwrap();
        assert_eq!(8, finished.load(Ordering::SeqCst));
    }

    #[test]
    fn work_runs_in_submission_order() {
        let device = EmulatedDevice::new().unwrap();
        let queue = device.default_queue().unwrap();
        let (sender, receiver) = mpsc::channel();
        for i in 0..16 {
            let sender = sender.clone();
            queue
                .enqueue(move || {
                    sender.send(i).unwrap();
                })
                .unwrap();
        }
        queue.synchronize().unwrap();
        let order: Vec<i32> = receiver.try_iter().collect();
        assert_eq!((0..16).collect::<Vec<_>>(), order);
    }

    #[test]
    fn panicking_job_kills_queue() {
        let device = EmulatedDevice::new().unwrap();
        let queue = device.create_queue().unwrap();
        queue.enqueue(|| panic!("kernel fault")).unwrap();
        assert_eq!(Err(CudaError::LaunchFailed), queue.synchronize());
    }

    #[test]
    fn last_handle_dropped_by_own_job() {
        let device = EmulatedDevice::new().unwrap();
        let queue = device.create_queue().unwrap();
        let captured = queue.clone();
        let (gate, wait_gate) = mpsc::channel::<()>();
        let (done, wait_done) = mpsc::channel::<()>();
        queue
            .enqueue(move || {
                wait_gate.recv().unwrap();
                drop(captured);
                done.send(()).unwrap();
            })
            .unwrap();
        drop(queue);
        drop(device);
        gate.send(()).unwrap();
        wait_done.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn clones_share_one_queue() {
        let device = EmulatedDevice::new().unwrap();
        let a = device.default_queue().unwrap();
        let b = device.default_queue().unwrap();
        let other = device.create_queue().unwrap();
        assert!(a.same_queue(&b));
        assert!(!a.same_queue(&other));
    }
}
