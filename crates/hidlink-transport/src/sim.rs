//! In-memory radio and channel transport for tests.
//!
//! A [`SimWorld`] holds the simulated radio environment. [`SimRadio`] and
//! [`SimTransport`] handles created from it share that state, so a test can
//! script inquiry results, refuse channel opens, queue inbound packets and
//! inspect everything written, while the code under test drives the
//! ordinary [`Radio`]/[`ChannelTransport`] traits.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::addr::{BdAddr, DeviceClass, ScanResult};
use crate::error::{Result, TransportError};
use crate::traits::{Channel, ChannelTransport, InquiryParams, Radio, RadioControl};

/// One scripted inbound event on a simulated channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimRead {
    /// A packet with these bytes.
    Data(Vec<u8>),
    /// Zero-length read (peer closed).
    Eof,
    /// The read fails with this error kind.
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct SimState {
    visible: Vec<ScanResult>,
    radio_unavailable: bool,
    fail_inquiry_after: Option<usize>,
    inquiry_rounds: usize,
    open_controls: usize,
    refused: HashSet<(BdAddr, u16)>,
    inbound: HashMap<(BdAddr, u16), VecDeque<SimRead>>,
    written: Vec<(BdAddr, u16, Vec<u8>)>,
    write_error: Option<io::ErrorKind>,
    wait_error: Option<io::ErrorKind>,
    open_channels: usize,
    opened: Vec<(BdAddr, u16)>,
}

/// Shared simulated radio environment.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    state: Arc<Mutex<SimState>>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A radio handle backed by this world.
    pub fn radio(&self) -> SimRadio {
        SimRadio {
            world: self.clone(),
        }
    }

    /// A channel transport backed by this world.
    pub fn transport(&self) -> SimTransport {
        SimTransport {
            world: self.clone(),
        }
    }

    /// Make a device visible to subsequent inquiry rounds.
    pub fn add_device(&self, address: BdAddr, class: DeviceClass) {
        self.lock().visible.push(ScanResult { address, class });
    }

    /// Hide a device from subsequent inquiry rounds.
    pub fn remove_device(&self, address: BdAddr) {
        self.lock().visible.retain(|r| r.address != address);
    }

    /// Simulate a missing or powered-off adapter.
    pub fn set_radio_available(&self, available: bool) {
        self.lock().radio_unavailable = !available;
    }

    /// Let `rounds` inquiry rounds succeed, then fail every later one.
    pub fn fail_inquiry_after(&self, rounds: usize) {
        self.lock().fail_inquiry_after = Some(rounds);
    }

    /// Refuse channel opens to `psm` on `address`.
    pub fn refuse(&self, address: BdAddr, psm: u16) {
        self.lock().refused.insert((address, psm));
    }

    pub fn allow(&self, address: BdAddr, psm: u16) {
        self.lock().refused.remove(&(address, psm));
    }

    /// Queue an inbound event on the channel `(address, psm)`.
    pub fn push_inbound(&self, address: BdAddr, psm: u16, read: SimRead) {
        self.lock()
            .inbound
            .entry((address, psm))
            .or_default()
            .push_back(read);
    }

    /// Make every subsequent write fail with `kind` (or succeed with `None`).
    pub fn fail_writes(&self, kind: Option<io::ErrorKind>) {
        self.lock().write_error = kind;
    }

    /// Make every subsequent readiness wait fail with `kind` (or work
    /// normally with `None`).
    pub fn fail_wait(&self, kind: Option<io::ErrorKind>) {
        self.lock().wait_error = kind;
    }

    /// Packets written to `(address, psm)`, oldest first.
    pub fn written(&self, address: BdAddr, psm: u16) -> Vec<Vec<u8>> {
        self.lock()
            .written
            .iter()
            .filter(|(a, p, _)| *a == address && *p == psm)
            .map(|(_, _, bytes)| bytes.clone())
            .collect()
    }

    /// Number of channel handles currently open.
    pub fn open_channels(&self) -> usize {
        self.lock().open_channels
    }

    /// Number of radio control handles currently open.
    pub fn open_controls(&self) -> usize {
        self.lock().open_controls
    }

    /// Number of inquiry rounds attempted so far.
    pub fn inquiry_rounds(&self) -> usize {
        self.lock().inquiry_rounds
    }

    /// Every successful channel open, in order.
    pub fn opened(&self) -> Vec<(BdAddr, u16)> {
        self.lock().opened.clone()
    }
}

/// Simulated radio adapter.
#[derive(Debug, Clone)]
pub struct SimRadio {
    world: SimWorld,
}

impl Radio for SimRadio {
    fn open(&self) -> Result<Box<dyn RadioControl>> {
        let mut state = self.world.lock();
        if state.radio_unavailable {
            return Err(TransportError::AdapterUnavailable(io::Error::new(
                io::ErrorKind::NotFound,
                "simulated adapter unavailable",
            )));
        }
        state.open_controls += 1;
        Ok(Box::new(SimControl {
            world: self.world.clone(),
        }))
    }
}

#[derive(Debug)]
struct SimControl {
    world: SimWorld,
}

impl RadioControl for SimControl {
    fn inquiry(&mut self, params: &InquiryParams) -> Result<Vec<ScanResult>> {
        let mut state = self.world.lock();
        let round = state.inquiry_rounds;
        state.inquiry_rounds += 1;
        if state.fail_inquiry_after.is_some_and(|ok| round >= ok) {
            return Err(TransportError::Inquiry(io::Error::other(
                "simulated inquiry failure",
            )));
        }
        Ok(state
            .visible
            .iter()
            .take(params.max_responses as usize)
            .copied()
            .collect())
    }
}

impl Drop for SimControl {
    fn drop(&mut self) {
        let mut state = self.world.lock();
        state.open_controls = state.open_controls.saturating_sub(1);
    }
}

/// Simulated channel transport.
#[derive(Debug, Clone)]
pub struct SimTransport {
    world: SimWorld,
}

impl ChannelTransport for SimTransport {
    fn open(&self, address: BdAddr, psm: u16) -> Result<Box<dyn Channel>> {
        let mut state = self.world.lock();
        if state.refused.contains(&(address, psm)) {
            return Err(TransportError::Connect {
                address,
                psm,
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        state.open_channels += 1;
        state.opened.push((address, psm));
        Ok(Box::new(SimChannel {
            world: self.world.clone(),
            address,
            psm,
        }))
    }
}

/// One open simulated channel. Closed on drop.
#[derive(Debug)]
pub struct SimChannel {
    world: SimWorld,
    address: BdAddr,
    psm: u16,
}

impl Channel for SimChannel {
    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        let state = self.world.lock();
        if let Some(kind) = state.wait_error {
            return Err(io::Error::from(kind));
        }
        Ok(state
            .inbound
            .get(&(self.address, self.psm))
            .is_some_and(|queue| !queue.is_empty()))
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.world.lock();
        let next = state
            .inbound
            .get_mut(&(self.address, self.psm))
            .and_then(VecDeque::pop_front);
        match next {
            Some(SimRead::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(SimRead::Eof) => Ok(0),
            Some(SimRead::Error(kind)) => Err(io::Error::from(kind)),
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }

    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.world.lock();
        if let Some(kind) = state.write_error {
            return Err(io::Error::from(kind));
        }
        state.written.push((self.address, self.psm, buf.to_vec()));
        Ok(buf.len())
    }
}

impl Drop for SimChannel {
    fn drop(&mut self) {
        let mut state = self.world.lock();
        state.open_channels = state.open_channels.saturating_sub(1);
    }
}
