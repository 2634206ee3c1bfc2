use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use senxor_wire::FrameData;
use tracing::debug;

use crate::error::LinkError;

/// Frames retained when the consumer falls behind. Oldest are dropped
/// first; streaming favors freshness over completeness.
pub(crate) const FRAME_RING_CAPACITY: usize = 5;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest-value mailbox for one acknowledgement kind.
///
/// Callers hold the link's I/O lock, so at most one request of a given kind
/// is in flight; a fresh value simply replaces an unclaimed stale one.
pub(crate) struct Slot<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Discard any value left over from a previous (timed out) request.
    pub(crate) fn clear(&self) {
        lock(&self.value).take();
    }

    pub(crate) fn put(&self, value: T) {
        *lock(&self.value) = Some(value);
        self.ready.notify_all();
    }

    /// Wake blocked waiters without delivering a value.
    pub(crate) fn wake(&self) {
        self.ready.notify_all();
    }

    /// Block until a value arrives, the deadline passes, or `abort` reports
    /// that waiting is pointless.
    pub(crate) fn wait(&self, timeout: Duration, abort: impl Fn() -> bool) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = lock(&self.value);
        loop {
            if let Some(value) = guard.take() {
                return Some(value);
            }
            if abort() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            guard = self
                .ready
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Bounded queue of decoded frames; overflow drops the oldest.
pub(crate) struct FrameRing {
    frames: Mutex<VecDeque<FrameData>>,
    ready: Condvar,
}

impl FrameRing {
    pub(crate) fn new() -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(FRAME_RING_CAPACITY)),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, frame: FrameData) {
        let mut frames = lock(&self.frames);
        if frames.len() == FRAME_RING_CAPACITY {
            frames.pop_front();
            debug!("frame ring full, dropping oldest");
        }
        frames.push_back(frame);
        self.ready.notify_all();
    }

    pub(crate) fn pop(&self) -> Option<FrameData> {
        lock(&self.frames).pop_front()
    }

    pub(crate) fn wake(&self) {
        self.ready.notify_all();
    }

    pub(crate) fn wait_pop(
        &self,
        timeout: Duration,
        abort: impl Fn() -> bool,
    ) -> Option<FrameData> {
        let deadline = Instant::now() + timeout;
        let mut frames = lock(&self.frames);
        loop {
            if let Some(frame) = frames.pop_front() {
                return Some(frame);
            }
            if abort() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            frames = self
                .ready
                .wait_timeout(frames, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// State shared between the worker thread and caller threads.
pub(crate) struct LinkState {
    pub(crate) register: Slot<u8>,
    pub(crate) write: Slot<()>,
    pub(crate) registers: Slot<Vec<(u8, u8)>>,
    pub(crate) frames: FrameRing,
    no_module: AtomicBool,
    stop: AtomicBool,
    down: AtomicBool,
    fatal: Mutex<Option<LinkError>>,
    finished: Mutex<bool>,
    finished_cv: Condvar,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            register: Slot::new(),
            write: Slot::new(),
            registers: Slot::new(),
            frames: FrameRing::new(),
            no_module: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            down: AtomicBool::new(false),
            fatal: Mutex::new(None),
            finished: Mutex::new(false),
            finished_cv: Condvar::new(),
        }
    }

    /// Ask the worker to exit and release every blocked caller.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.down.store(true, Ordering::SeqCst);
        self.wake_waiters();
    }

    pub(crate) fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Whether the link can no longer carry requests.
    pub(crate) fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }

    /// Record a fatal error and release every blocked caller. The first
    /// error wins.
    pub(crate) fn fail(&self, err: LinkError) {
        let mut fatal = lock(&self.fatal);
        if fatal.is_none() {
            *fatal = Some(err);
        } else {
            debug!(error = %err, "suppressing subsequent fatal error");
        }
        drop(fatal);
        self.down.store(true, Ordering::SeqCst);
        self.wake_waiters();
    }

    /// Claim the recorded fatal error, if any. Later callers see the link
    /// as plainly closed.
    pub(crate) fn take_fatal(&self) -> Option<LinkError> {
        lock(&self.fatal).take()
    }

    pub(crate) fn set_no_module(&self) -> bool {
        self.no_module.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn no_module(&self) -> bool {
        self.no_module.load(Ordering::SeqCst)
    }

    fn wake_waiters(&self) {
        self.register.wake();
        self.write.wake();
        self.registers.wake();
        self.frames.wake();
    }

    /// Worker exit notification.
    pub(crate) fn finish(&self) {
        *lock(&self.finished) = true;
        self.finished_cv.notify_all();
    }

    /// Wait for the worker to exit. `false` means it is still running.
    pub(crate) fn wait_finished(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut finished = lock(&self.finished);
        while !*finished {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            finished = self
                .finished_cv
                .wait_timeout(finished, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn frame(first_pixel: u16) -> FrameData {
        FrameData {
            header: None,
            data: vec![first_pixel],
            rows: 1,
            cols: 1,
        }
    }

    #[test]
    fn test_slot_delivers_latest_value() {
        let slot = Slot::new();
        slot.put(1u8);
        slot.put(2u8);
        assert_eq!(slot.wait(Duration::from_millis(10), || false), Some(2));
        assert_eq!(slot.wait(Duration::from_millis(10), || false), None);
    }

    #[test]
    fn test_slot_clear_discards_stale_value() {
        let slot = Slot::new();
        slot.put(7u8);
        slot.clear();
        assert_eq!(slot.wait(Duration::from_millis(10), || false), None);
    }

    #[test]
    fn test_slot_wait_crosses_threads() {
        let slot = Arc::new(Slot::new());
        let producer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                slot.put(0xABu8);
            })
        };
        assert_eq!(slot.wait(Duration::from_secs(2), || false), Some(0xAB));
        producer.join().unwrap();
    }

    #[test]
    fn test_slot_wait_aborts_when_asked() {
        let slot: Slot<u8> = Slot::new();
        let start = Instant::now();
        assert_eq!(slot.wait(Duration::from_secs(10), || true), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_frame_ring_drops_oldest_on_overflow() {
        let ring = FrameRing::new();
        for pixel in 0..7 {
            ring.push(frame(pixel));
        }
        let mut pixels = Vec::new();
        while let Some(f) = ring.pop() {
            pixels.push(f.data[0]);
        }
        assert_eq!(pixels, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_first_fatal_error_wins() {
        let state = LinkState::new();
        state.fail(LinkError::NotConnected);
        state.fail(LinkError::NoModule);
        assert!(matches!(state.take_fatal(), Some(LinkError::NotConnected)));
        assert!(state.take_fatal().is_none());
        assert!(state.is_down());
    }

    #[test]
    fn test_wait_finished_times_out_then_succeeds() {
        let state = Arc::new(LinkState::new());
        assert!(!state.wait_finished(Duration::from_millis(10)));
        let worker = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.finish())
        };
        assert!(state.wait_finished(Duration::from_secs(2)));
        worker.join().unwrap();
    }
}
