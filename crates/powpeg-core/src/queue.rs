//! Serialises commands sent to a signing device.
//!
//! A hardware signer accepts exactly one request at a time. Every command is
//! pushed onto a FIFO and a single worker drains it: one command in flight,
//! completion in submission order, and nothing dispatched while the device
//! reports itself busy.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{PowPegError, Result};
use crate::traits::DeviceStatus;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Job>,
    processing: bool,
    poll_scheduled: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    device: Arc<dyn DeviceStatus>,
    busy_poll_interval: Option<Duration>,
}

/// FIFO command queue in front of a single signing device.
///
/// Cloning yields another handle to the same queue. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct SignerCommandQueue {
    inner: Arc<Inner>,
}

impl SignerCommandQueue {
    /// Queue in front of `device`. While the device is busy, pending commands
    /// wait for the next enqueue or completion, or for the next poll when
    /// `busy_poll_interval` is set.
    pub fn new(device: Arc<dyn DeviceStatus>, busy_poll_interval: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                device,
                busy_poll_interval,
            }),
        }
    }

    /// Submit `operation`. It is queued immediately, before the returned
    /// future is first polled, so submission order is call order. Dropping
    /// the returned future before the command is dispatched cancels it.
    pub fn enqueue<T, F, Fut>(&self, operation: F) -> impl Future<Output = Result<T>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                if tx.is_closed() {
                    debug!("signer command abandoned by caller, skipping");
                    return;
                }
                let _ = tx.send(operation().await);
            })
        });

        let depth = {
            let mut state = self.lock();
            state.pending.push_back(job);
            state.pending.len()
        };
        debug!(depth, "signer command enqueued");
        self.drain();

        async move {
            rx.await.unwrap_or_else(|_| {
                Err(PowPegError::Signer("signer command aborted before completing".into()))
            })
        }
    }

    /// Number of commands waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether a command is currently running against the device.
    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drain(&self) {
        let job = {
            let mut state = self.lock();
            if state.processing || state.pending.is_empty() {
                return;
            }
            if self.inner.device.is_busy() {
                debug!(pending = state.pending.len(), "signing device busy, holding queue");
                self.schedule_poll(&mut state);
                return;
            }
            let Some(job) = state.pending.pop_front() else {
                return;
            };
            state.processing = true;
            job
        };

        let queue = self.clone();
        tokio::spawn(async move {
            if AssertUnwindSafe(job()).catch_unwind().await.is_err() {
                warn!("signer command panicked");
            }
            queue.lock().processing = false;
            queue.drain();
        });
    }

    fn schedule_poll(&self, state: &mut QueueState) {
        let Some(interval) = self.inner.busy_poll_interval else {
            return;
        };
        if state.poll_scheduled {
            return;
        }
        state.poll_scheduled = true;

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            queue.lock().poll_scheduled = false;
            queue.drain();
        });
    }
}
