use std::fmt;
use std::io;
use std::time::Duration;

use crate::addr::{BdAddr, ScanResult};
use crate::error::Result;

/// Parameters for a single inquiry round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InquiryParams {
    /// Inquiry length in 1.28 s units.
    pub length: u8,
    /// Upper bound on responses collected in one round.
    pub max_responses: u8,
    /// Discard the adapter's inquiry cache before surveying.
    pub flush_cache: bool,
}

impl Default for InquiryParams {
    fn default() -> Self {
        Self {
            length: 1,
            max_responses: 128,
            flush_cache: true,
        }
    }
}

/// Access to the local radio adapter.
pub trait Radio {
    /// Open a control handle to the adapter.
    ///
    /// The handle is released when the returned value is dropped.
    fn open(&self) -> Result<Box<dyn RadioControl>>;
}

/// An open control handle to the local radio adapter.
pub trait RadioControl {
    /// Survey nearby devices for one bounded round.
    fn inquiry(&mut self, params: &InquiryParams) -> Result<Vec<ScanResult>>;
}

/// Opens packet-oriented channels to remote devices.
pub trait ChannelTransport {
    /// Open a connection to `psm` on `address` (blocking).
    ///
    /// The channel is closed when the returned handle is dropped.
    fn open(&self, address: BdAddr, psm: u16) -> Result<Box<dyn Channel>>;
}

/// One open, packet-oriented channel.
///
/// Each `recv`/`send` moves exactly one packet.
pub trait Channel: Send + fmt::Debug {
    /// Wait up to `timeout` for inbound data. Returns `Ok(false)` on timeout.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read one packet. `Ok(0)` means the peer closed the channel.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one packet, returning the number of bytes accepted.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl<R: Radio + ?Sized> Radio for &R {
    fn open(&self) -> Result<Box<dyn RadioControl>> {
        (**self).open()
    }
}

impl<T: ChannelTransport + ?Sized> ChannelTransport for &T {
    fn open(&self, address: BdAddr, psm: u16) -> Result<Box<dyn Channel>> {
        (**self).open(address, psm)
    }
}
