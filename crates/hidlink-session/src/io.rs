//! Polling reads and blocking writes over an open session.

use std::io;

use bytes::BytesMut;
use hidlink_frame::{encode_outbound, normalize_inbound, MAX_FRAME_LEN};
use hidlink_transport::TransportError;
use tracing::{debug, trace, warn};

use crate::error::{Result, SessionError};
use crate::record::DeviceRecord;
use crate::state::DeviceEvent;

/// Result of one [`poll`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The record has no open session. Nothing was attempted.
    NotConnected,
    /// No data arrived within the poll timeout.
    Idle,
    /// A frame of this many bytes is in [`DeviceRecord::received`].
    Frame(usize),
    /// The peer closed the session; the record is back to `Found`.
    Closed,
    /// The local adapter went away; the record is back to `Found`.
    AdapterLost,
    /// A transient error. The session is still open.
    Error(io::ErrorKind),
    /// Transient errors hit the configured limit; the session was torn down.
    ErrorLimit(io::ErrorKind),
}

impl PollOutcome {
    /// A new inbound frame is available.
    pub fn has_frame(&self) -> bool {
        matches!(self, PollOutcome::Frame(_))
    }

    /// This poll ended the session.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            PollOutcome::Closed | PollOutcome::AdapterLost | PollOutcome::ErrorLimit(_)
        )
    }
}

/// Wait up to the record's poll timeout for an inbound frame and read it.
///
/// Never blocks longer than the poll timeout plus one read, and never
/// blocks at all on a record that is not connected.
pub fn poll(record: &mut DeviceRecord) -> PollOutcome {
    let id = record.id();
    let timeout = record.poll_timeout();
    let Some((link, buf)) = record.link_and_buffer() else {
        return PollOutcome::NotConnected;
    };

    let input = link.input();
    match input.wait_readable(timeout) {
        Ok(true) => {}
        Ok(false) => return PollOutcome::Idle,
        Err(err) => {
            debug!(id, error = %err, "readiness wait failed");
            return transient(record, err.kind());
        }
    }

    match input.recv(&mut buf[..]) {
        Ok(0) => {
            record.disconnect();
            record.set_event(DeviceEvent::Disconnected);
            PollOutcome::Closed
        }
        Ok(n) => {
            let n = n.min(MAX_FRAME_LEN);
            normalize_inbound(&mut buf[..n]);
            record.finish_read(n);
            trace!(id, len = n, "frame received");
            PollOutcome::Frame(n)
        }
        Err(err) => match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => PollOutcome::Idle,
            io::ErrorKind::NotConnected => {
                warn!(id, error = %err, "adapter lost");
                record.disconnect();
                record.set_event(DeviceEvent::UnexpectedDisconnect);
                PollOutcome::AdapterLost
            }
            kind => {
                debug!(id, error = %err, "read failed");
                transient(record, kind)
            }
        },
    }
}

fn transient(record: &mut DeviceRecord, kind: io::ErrorKind) -> PollOutcome {
    let count = record.note_read_error();
    if !record.read_error_policy().should_escalate(count) {
        return PollOutcome::Error(kind);
    }
    warn!(id = record.id(), consecutive = count, ?kind, "read error limit reached");
    record.disconnect();
    record.set_event(DeviceEvent::ReadErrorLimit);
    PollOutcome::ErrorLimit(kind)
}

/// Write one frame to the record's output channel.
///
/// `frame` is copied before the direction marker is patched, so the
/// caller's buffer is never modified. Returns the number of bytes the
/// channel accepted.
pub fn send(record: &mut DeviceRecord, frame: &[u8]) -> Result<usize> {
    let id = record.id();
    let Some(link) = record.link_mut() else {
        return Err(SessionError::NotConnected(id));
    };

    let mut out = BytesMut::with_capacity(frame.len());
    encode_outbound(frame, &mut out)?;

    let n = link.output().send(&out).map_err(TransportError::Io)?;
    trace!(id, len = n, "frame sent");
    Ok(n)
}
