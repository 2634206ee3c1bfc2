use std::io::{Read, Write};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use senxor_wire::{
    encode_read_register, encode_read_registers, encode_write_register, DecoderConfig, FrameData,
};
use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::policy::ErrorPolicy;
use crate::state::{lock, LinkState};
use crate::worker;

/// Timing parameters for one device link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Deadline for a register acknowledgement. Default: 3 s.
    pub ack_timeout: Duration,
    /// Deadline for a blocking frame read. Default: 1.5 s.
    pub frame_timeout: Duration,
    /// How long [`SenxorLink::stop`] waits for the worker to exit before
    /// detaching it. Default: 3 s.
    pub stop_timeout: Duration,
    /// Worker sleep between polls when the line is quiet. Default: 5 ms.
    pub poll_interval: Duration,
    /// Receive decoder tuning.
    pub decoder: DecoderConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(3),
            frame_timeout: Duration::from_millis(1500),
            stop_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(5),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Synchronous command interface to one SenXor module.
///
/// Owns a worker thread that pumps the transport. Register operations are
/// serialized by an internal I/O lock, block for the matching
/// acknowledgement, and are retried per [`ErrorPolicy`]. Frames decoded in
/// the background accumulate in a small ring and are fetched with
/// [`read_frame`](Self::read_frame).
///
/// A fatal transport or decode failure closes the link; the first
/// operation to fail afterwards reports the cause, and every later one
/// fails fast with [`LinkError::NotConnected`].
pub struct SenxorLink {
    state: Arc<LinkState>,
    commands: Sender<Bytes>,
    io_lock: Mutex<()>,
    config: LinkConfig,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SenxorLink {
    /// Start the worker over an open transport.
    pub fn open<T>(transport: T, config: LinkConfig) -> Self
    where
        T: Read + Write + Send + 'static,
    {
        let state = Arc::new(LinkState::new());
        let (commands, queue) = mpsc::channel();
        let worker = {
            let state = Arc::clone(&state);
            let decoder = config.decoder.clone();
            let poll_interval = config.poll_interval;
            std::thread::spawn(move || worker::run(transport, queue, state, decoder, poll_interval))
        };
        Self {
            state,
            commands,
            io_lock: Mutex::new(()),
            config,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Whether the link can still carry requests.
    pub fn is_connected(&self) -> bool {
        !self.state.is_down()
    }

    /// Whether the device has reported that no sensor module is installed.
    /// Sticky for the lifetime of the link.
    pub fn no_module(&self) -> bool {
        self.state.no_module()
    }

    /// Read one register.
    pub fn read_register(&self, addr: u8) -> Result<u8> {
        self.with_retries(|| {
            let _io = lock(&self.io_lock);
            self.ensure_connected()?;
            self.state.register.clear();
            self.enqueue(encode_read_register(addr))?;
            self.state
                .register
                .wait(self.config.ack_timeout, || self.state.is_down())
                .ok_or_else(|| self.wait_failure(self.config.ack_timeout))
        })
    }

    /// Write one register and wait for the acknowledgement.
    pub fn write_register(&self, addr: u8, value: u8) -> Result<()> {
        self.with_retries(|| {
            let _io = lock(&self.io_lock);
            self.ensure_connected()?;
            self.state.write.clear();
            self.enqueue(encode_write_register(addr, value))?;
            self.state
                .write
                .wait(self.config.ack_timeout, || self.state.is_down())
                .ok_or_else(|| self.wait_failure(self.config.ack_timeout))
        })
    }

    /// Read several registers in one transaction. Fails without touching
    /// the device when `addrs` is empty.
    pub fn read_registers(&self, addrs: &[u8]) -> Result<Vec<(u8, u8)>> {
        let command = encode_read_registers(addrs).map_err(LinkError::Decode)?;
        self.with_retries(|| {
            let _io = lock(&self.io_lock);
            self.ensure_connected()?;
            self.state.registers.clear();
            self.enqueue(command.clone())?;
            self.state
                .registers
                .wait(self.config.ack_timeout, || self.state.is_down())
                .ok_or_else(|| self.wait_failure(self.config.ack_timeout))
        })
    }

    /// Fetch the next decoded frame.
    ///
    /// With `block` unset, returns `Ok(None)` when no frame is buffered.
    /// With `block` set, waits up to the frame timeout. Reports
    /// [`LinkError::NoModule`] once the device has declared that no sensor
    /// is installed and no buffered frame remains.
    pub fn read_frame(&self, block: bool) -> Result<Option<FrameData>> {
        self.ensure_connected()?;
        if let Some(frame) = self.state.frames.pop() {
            return Ok(Some(frame));
        }
        if self.state.no_module() {
            return Err(LinkError::NoModule);
        }
        if !block {
            return Ok(None);
        }
        let waited = self.state.frames.wait_pop(self.config.frame_timeout, || {
            self.state.is_down() || self.state.no_module()
        });
        match waited {
            Some(frame) => Ok(Some(frame)),
            None => {
                if self.state.no_module() {
                    return Err(LinkError::NoModule);
                }
                Err(self.wait_failure(self.config.frame_timeout))
            }
        }
    }

    /// Stop the worker and close the transport.
    ///
    /// Idempotent. Waits up to the configured stop timeout for the worker
    /// to exit; a worker stuck in a transport call is detached and the link
    /// is marked closed regardless.
    pub fn stop(&self) {
        self.state.request_stop();
        let finished = self.state.wait_finished(self.config.stop_timeout);
        if let Some(worker) = lock(&self.worker).take() {
            if finished {
                let _ = worker.join();
                debug!("link worker joined");
            } else {
                warn!("link worker did not stop in time, detaching");
            }
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state.is_down() {
            return Err(self.state.take_fatal().unwrap_or(LinkError::NotConnected));
        }
        Ok(())
    }

    fn enqueue(&self, command: Bytes) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| LinkError::NotConnected)
    }

    /// The error behind an empty wait: a published fatal error if one
    /// exists, a plain closed link, or a timeout.
    fn wait_failure(&self, timeout: Duration) -> LinkError {
        if let Some(err) = self.state.take_fatal() {
            return err;
        }
        if self.state.is_down() {
            return LinkError::NotConnected;
        }
        LinkError::AckTimeout(timeout)
    }

    /// Run an operation under the retry policy for the errors it produces.
    /// Exhausting a policy's retries closes the link.
    fn with_retries<R>(&self, op: impl Fn() -> Result<R>) -> Result<R> {
        let mut attempts = 0u32;
        loop {
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let Some(policy) = ErrorPolicy::for_kind(err.kind()) else {
                return Err(err);
            };
            if attempts >= policy.retries {
                if attempts > 0 {
                    warn!(error = %err, attempts, "retries exhausted, closing link");
                }
                self.state.request_stop();
                return Err(err);
            }
            attempts += 1;
            debug!(error = %err, attempt = attempts, "retrying after link error");
            std::thread::sleep(policy.retry_interval);
        }
    }
}

impl Drop for SenxorLink {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SenxorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenxorLink")
            .field("connected", &self.is_connected())
            .field("no_module", &self.no_module())
            .finish()
    }
}
