use std::io::{ErrorKind as IoErrorKind, Read, Write};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use senxor_wire::{Ack, AckDecoder, DecoderConfig};
use tracing::{debug, warn};

use crate::error::LinkError;
use crate::state::LinkState;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// I/O pump for one open device.
///
/// Owns the transport exclusively. Each turn reads available bytes into the
/// ack decoder, dispatches every decoded acknowledgement, then writes at
/// most one queued command. Exits on a stop request, on transport failure,
/// or on an unrecoverable decode error; the cause is published for the next
/// caller to observe.
pub(crate) fn run<T: Read + Write>(
    mut transport: T,
    commands: Receiver<Bytes>,
    state: Arc<LinkState>,
    decoder_config: DecoderConfig,
    poll_interval: Duration,
) {
    let mut decoder = AckDecoder::with_config(decoder_config);
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    'io: while !state.stopping() {
        let mut idle = true;

        match transport.read(&mut chunk) {
            Ok(0) => {
                state.fail(LinkError::LostConnection(std::io::Error::new(
                    IoErrorKind::UnexpectedEof,
                    "transport closed",
                )));
                break 'io;
            }
            Ok(n) => {
                decoder.feed(&chunk[..n]);
                idle = false;
            }
            Err(err)
                if matches!(
                    err.kind(),
                    IoErrorKind::TimedOut | IoErrorKind::WouldBlock | IoErrorKind::Interrupted
                ) => {}
            Err(err) => {
                state.fail(LinkError::LostConnection(err));
                break 'io;
            }
        }

        loop {
            match decoder.next_ack() {
                Ok(Some(ack)) => dispatch(&state, ack),
                Ok(None) => break,
                Err(err) => {
                    state.fail(LinkError::Decode(err));
                    break 'io;
                }
            }
        }

        match commands.try_recv() {
            Ok(command) => {
                if let Err(err) = transport
                    .write_all(&command)
                    .and_then(|()| transport.flush())
                {
                    state.fail(LinkError::LostConnection(err));
                    break 'io;
                }
                debug!(len = command.len(), "command written");
                idle = false;
            }
            Err(TryRecvError::Empty) => {}
            // Every link handle is gone; nobody is left to serve.
            Err(TryRecvError::Disconnected) => break 'io,
        }

        if idle {
            std::thread::sleep(poll_interval);
        }
    }

    decoder.close();
    drop(transport);
    state.request_stop();
    state.finish();
    debug!("link worker stopped");
}

fn dispatch(state: &LinkState, ack: Ack) {
    match ack {
        Ack::Register(value) => state.register.put(value),
        Ack::Write => state.write.put(()),
        Ack::Registers(values) => state.registers.put(values),
        Ack::Frame(frame) => state.frames.push(frame),
        Ack::ModuleError => {
            if !state.set_no_module() {
                warn!("device reports no sensor module installed");
            }
            // Wake frame waiters so they observe the condition.
            state.frames.wake();
        }
    }
}
