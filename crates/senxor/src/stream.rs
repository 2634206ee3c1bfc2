//! Push-style frame delivery on a dedicated thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use senxor_link::{LinkError, SenxorLink};
use senxor_wire::FrameData;
use thiserror::Error;
use tracing::{debug, warn};

use crate::device::Senxor;

/// Frames buffered between producer and consumer before the stream
/// declares the consumer too slow.
const STREAM_QUEUE_DEPTH: usize = 5;

/// Errors surfaced by [`FrameStream::recv`].
#[derive(Debug, Error)]
pub enum StreamError {
    /// No frame arrived within the deadline; the stream is still alive.
    #[error("no frame within {0:?}")]
    Timeout(Duration),

    /// The consumer fell behind the producer and frames would have piled
    /// up without bound. The stream shuts down instead of buffering.
    #[error("frame consumer fell behind the producer")]
    Backlog,

    /// The producer thread stopped on a link failure.
    #[error("stream worker stopped: {0}")]
    Link(#[from] LinkError),

    /// The stream was stopped, or its failure was already reported.
    #[error("stream is stopped")]
    Stopped,
}

/// Background reader turning [`Senxor::read_frame`] pulls into a bounded
/// queue of frames.
///
/// The queue holds [`STREAM_QUEUE_DEPTH`] frames. A full queue is treated
/// as a fatal backlog: the producer stops rather than block or drop
/// silently, and the next [`recv`](FrameStream::recv) reports it.
pub struct FrameStream {
    frames: Receiver<FrameData>,
    stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<StreamError>>>,
    worker: Option<JoinHandle<()>>,
}

impl FrameStream {
    /// Start pulling frames from the device's link.
    ///
    /// The device must already be in continuous capture mode; quiet
    /// periods on the line are tolerated and waited out.
    pub fn start(device: &Senxor) -> Self {
        let link = Arc::clone(device.link());
        let (tx, frames) = mpsc::sync_channel(STREAM_QUEUE_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));
        let failure = Arc::new(Mutex::new(None));
        let worker = {
            let stop = Arc::clone(&stop);
            let failure = Arc::clone(&failure);
            std::thread::spawn(move || pump(&link, &tx, &stop, &failure))
        };
        Self {
            frames,
            stop,
            failure,
            worker: Some(worker),
        }
    }

    /// Wait for the next frame.
    pub fn recv(&self, timeout: Duration) -> Result<FrameData, StreamError> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => match self.take_failure() {
                Some(err) => Err(err),
                None => Err(StreamError::Timeout(timeout)),
            },
            Err(RecvTimeoutError::Disconnected) => match self.take_failure() {
                Some(err) => Err(err),
                None => Err(StreamError::Stopped),
            },
        }
    }

    /// Stop the producer thread. Idempotent; buffered frames are dropped.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("frame stream worker panicked");
            }
        }
    }

    fn take_failure(&self) -> Option<StreamError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

fn pump(
    link: &SenxorLink,
    tx: &SyncSender<FrameData>,
    stop: &AtomicBool,
    failure: &Mutex<Option<StreamError>>,
) {
    while !stop.load(Ordering::SeqCst) {
        match link.read_frame(true) {
            Ok(Some(frame)) => match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(depth = STREAM_QUEUE_DEPTH, "frame queue full, stopping stream");
                    fail(failure, StreamError::Backlog);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => break,
            },
            Ok(None) => {}
            // A bare timeout means a quiet line, not a dead one.
            Err(LinkError::AckTimeout(_)) => {}
            Err(err) => {
                debug!(error = %err, "frame stream worker stopping");
                fail(failure, StreamError::Link(err));
                break;
            }
        }
    }
}

fn fail(failure: &Mutex<Option<StreamError>>, err: StreamError) {
    let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}
