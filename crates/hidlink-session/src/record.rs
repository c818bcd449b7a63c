use std::fmt;
use std::mem;
use std::time::Duration;

use hidlink_frame::{Frame, MAX_FRAME_LEN};
use hidlink_transport::{BdAddr, Channel};
use tracing::{debug, info};

use crate::config::{ReadErrorPolicy, DEFAULT_POLL_TIMEOUT};
use crate::error::{Result, SessionError};
use crate::state::{DeviceEvent, StateKind};

/// The two open channels of a session.
///
/// Dropping a `Link` closes both channels.
pub struct Link {
    output: Box<dyn Channel>,
    input: Box<dyn Channel>,
}

impl Link {
    pub(crate) fn new(output: Box<dyn Channel>, input: Box<dyn Channel>) -> Self {
        Self { output, input }
    }

    /// Host-to-device channel.
    pub fn output(&mut self) -> &mut dyn Channel {
        self.output.as_mut()
    }

    /// Device-to-host channel.
    pub fn input(&mut self) -> &mut dyn Channel {
        self.input.as_mut()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("output", &self.output)
            .field("input", &self.input)
            .finish()
    }
}

/// Lifecycle state together with the resources each state owns.
///
/// Channels exist only inside the connected variants, so a record is
/// connected exactly when both of its channels are open.
#[derive(Debug)]
enum DeviceState {
    Unfound,
    Found,
    Connected(Link),
    HandshakeComplete(Link),
}

impl DeviceState {
    fn kind(&self) -> StateKind {
        match self {
            DeviceState::Unfound => StateKind::Unfound,
            DeviceState::Found => StateKind::Found,
            DeviceState::Connected(_) => StateKind::Connected,
            DeviceState::HandshakeComplete(_) => StateKind::HandshakeComplete,
        }
    }

    fn link_mut(&mut self) -> Option<&mut Link> {
        match self {
            DeviceState::Connected(link) | DeviceState::HandshakeComplete(link) => Some(link),
            DeviceState::Unfound | DeviceState::Found => None,
        }
    }

    fn into_link(self) -> Option<Link> {
        match self {
            DeviceState::Connected(link) | DeviceState::HandshakeComplete(link) => Some(link),
            DeviceState::Unfound | DeviceState::Found => None,
        }
    }
}

/// One peripheral slot.
///
/// Records are allocated by the caller (see
/// [`SessionConfig::records`](crate::SessionConfig::records)) and reused
/// across any number of discover/connect/disconnect cycles. Once a record is
/// found it keeps its address for its whole lifetime.
#[derive(Debug)]
pub struct DeviceRecord {
    id: u32,
    address: BdAddr,
    state: DeviceState,
    event: DeviceEvent,
    poll_timeout: Duration,
    read_error_policy: ReadErrorPolicy,
    read_errors: u32,
    buf: [u8; MAX_FRAME_LEN],
    received_len: usize,
}

impl DeviceRecord {
    /// An empty slot with default poll timeout and error policy.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            address: BdAddr::ANY,
            state: DeviceState::Unfound,
            event: DeviceEvent::None,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            read_error_policy: ReadErrorPolicy::default(),
            read_errors: 0,
            buf: [0; MAX_FRAME_LEN],
            received_len: 0,
        }
    }

    /// A slot pre-loaded with a known address (already found).
    pub fn with_address(id: u32, address: BdAddr) -> Result<Self> {
        let mut record = Self::new(id);
        record.mark_found(address)?;
        Ok(record)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Radio address; all-zero until the record is found.
    pub fn address(&self) -> BdAddr {
        self.address
    }

    pub fn state(&self) -> StateKind {
        self.state.kind()
    }

    pub fn is_found(&self) -> bool {
        self.state().is_found()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.state() == StateKind::HandshakeComplete
    }

    /// Whether both channel handles are open.
    pub fn has_channels(&self) -> bool {
        matches!(
            self.state,
            DeviceState::Connected(_) | DeviceState::HandshakeComplete(_)
        )
    }

    /// Last recorded event.
    pub fn event(&self) -> DeviceEvent {
        self.event
    }

    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    pub fn set_poll_timeout(&mut self, timeout: Duration) {
        self.poll_timeout = timeout;
    }

    pub fn read_error_policy(&self) -> ReadErrorPolicy {
        self.read_error_policy
    }

    pub fn set_read_error_policy(&mut self, policy: ReadErrorPolicy) {
        self.read_error_policy = policy;
    }

    /// Consecutive transient read errors since the last good read.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    /// The most recently received frame (empty if none since connecting).
    pub fn received(&self) -> &[u8] {
        &self.buf[..self.received_len]
    }

    /// Owned copy of the most recently received frame.
    pub fn received_frame(&self) -> Option<Frame> {
        (self.received_len > 0).then(|| Frame::inbound(self.received()))
    }

    /// Record that the report parser recognized the handshake response.
    pub fn complete_handshake(&mut self) -> Result<()> {
        self.transition(StateKind::HandshakeComplete)?;
        debug!(id = self.id, "handshake complete");
        Ok(())
    }

    /// Close both channels and return to `Found`.
    ///
    /// Safe on any record; returns whether a session was actually torn down.
    /// The address and found state are kept so the device can reconnect.
    pub fn disconnect(&mut self) -> bool {
        if !self.is_connected() {
            return false;
        }
        let old = mem::replace(&mut self.state, DeviceState::Found);
        drop(old.into_link());
        self.event = DeviceEvent::None;
        self.read_errors = 0;
        self.received_len = 0;
        info!(id = self.id, address = %self.address, "disconnected");
        true
    }

    pub(crate) fn mark_found(&mut self, address: BdAddr) -> Result<()> {
        if address.is_zero() {
            return Err(SessionError::NoAddress);
        }
        self.check_transition(StateKind::Found)?;
        self.address = address;
        self.state = DeviceState::Found;
        Ok(())
    }

    /// Take ownership of a freshly opened link. On error the link is dropped.
    pub(crate) fn attach(&mut self, link: Link) -> Result<()> {
        self.check_transition(StateKind::Connected)?;
        self.state = DeviceState::Connected(link);
        self.read_errors = 0;
        self.received_len = 0;
        Ok(())
    }

    pub(crate) fn set_event(&mut self, event: DeviceEvent) {
        self.event = event;
    }

    pub(crate) fn link_mut(&mut self) -> Option<&mut Link> {
        self.state.link_mut()
    }

    /// Split borrow of the open link and the receive buffer.
    pub(crate) fn link_and_buffer(&mut self) -> Option<(&mut Link, &mut [u8; MAX_FRAME_LEN])> {
        let link = self.state.link_mut()?;
        Some((link, &mut self.buf))
    }

    pub(crate) fn finish_read(&mut self, len: usize) {
        self.received_len = len.min(MAX_FRAME_LEN);
        self.read_errors = 0;
    }

    /// Count one transient error; returns the consecutive total.
    pub(crate) fn note_read_error(&mut self) -> u32 {
        self.read_errors = self.read_errors.saturating_add(1);
        self.read_errors
    }

    fn check_transition(&self, to: StateKind) -> Result<()> {
        let from = self.state();
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(SessionError::IllegalTransition { from, to })
        }
    }

    fn transition(&mut self, to: StateKind) -> Result<()> {
        self.check_transition(to)?;
        let old = mem::replace(&mut self.state, DeviceState::Unfound);
        self.state = match (old, to) {
            (DeviceState::Connected(link), StateKind::HandshakeComplete) => {
                DeviceState::HandshakeComplete(link)
            }
            (old, StateKind::Found) => {
                drop(old.into_link());
                DeviceState::Found
            }
            (old, _) => old,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hidlink_transport::{ChannelTransport, SimWorld};

    use super::*;

    fn addr() -> BdAddr {
        "00:19:1D:11:22:33".parse().unwrap()
    }

    fn link(world: &SimWorld) -> Link {
        let transport = world.transport();
        Link::new(
            transport.open(addr(), 0x11).unwrap(),
            transport.open(addr(), 0x13).unwrap(),
        )
    }

    #[test]
    fn new_record_is_empty() {
        let record = DeviceRecord::new(7);
        assert_eq!(record.id(), 7);
        assert_eq!(record.state(), StateKind::Unfound);
        assert!(record.address().is_zero());
        assert!(!record.has_channels());
        assert!(record.received().is_empty());
        assert!(record.received_frame().is_none());
        assert_eq!(record.poll_timeout(), DEFAULT_POLL_TIMEOUT);
    }

    #[test]
    fn found_requires_nonzero_address() {
        let mut record = DeviceRecord::new(1);
        assert!(matches!(
            record.mark_found(BdAddr::ANY),
            Err(SessionError::NoAddress)
        ));
        assert_eq!(record.state(), StateKind::Unfound);

        record.mark_found(addr()).unwrap();
        assert!(record.is_found());
        assert_eq!(record.address(), addr());
    }

    #[test]
    fn found_address_is_never_overwritten() {
        let mut record = DeviceRecord::with_address(1, addr()).unwrap();
        let other: BdAddr = "00:19:1D:44:55:66".parse().unwrap();
        assert!(matches!(
            record.mark_found(other),
            Err(SessionError::IllegalTransition { .. })
        ));
        assert_eq!(record.address(), addr());
    }

    #[test]
    fn attach_and_disconnect_cycle() {
        let world = SimWorld::new();
        let mut record = DeviceRecord::with_address(1, addr()).unwrap();

        for _ in 0..3 {
            record.attach(link(&world)).unwrap();
            assert!(record.is_connected());
            assert!(record.has_channels());
            assert_eq!(world.open_channels(), 2);

            assert!(record.disconnect());
            assert_eq!(record.state(), StateKind::Found);
            assert!(!record.has_channels());
            assert_eq!(world.open_channels(), 0);
            assert_eq!(record.address(), addr());
        }
    }

    #[test]
    fn attach_requires_found() {
        let world = SimWorld::new();
        let mut record = DeviceRecord::new(1);
        assert!(matches!(
            record.attach(link(&world)),
            Err(SessionError::IllegalTransition {
                from: StateKind::Unfound,
                to: StateKind::Connected
            })
        ));
        assert_eq!(world.open_channels(), 0, "rejected link must be closed");
    }

    #[test]
    fn disconnect_is_noop_when_not_connected() {
        let mut record = DeviceRecord::new(1);
        assert!(!record.disconnect());
        record.mark_found(addr()).unwrap();
        record.set_event(DeviceEvent::Disconnected);
        assert!(!record.disconnect());
        assert_eq!(record.event(), DeviceEvent::Disconnected);
        assert_eq!(record.state(), StateKind::Found);
    }

    #[test]
    fn handshake_requires_connection() {
        let world = SimWorld::new();
        let mut record = DeviceRecord::with_address(1, addr()).unwrap();
        assert!(record.complete_handshake().is_err());

        record.attach(link(&world)).unwrap();
        record.complete_handshake().unwrap();
        assert!(record.is_handshake_complete());
        assert!(record.has_channels());
        assert!(record.complete_handshake().is_err());

        record.set_event(DeviceEvent::Connected);
        assert!(record.disconnect());
        assert!(!record.is_handshake_complete());
        assert_eq!(record.event(), DeviceEvent::None);
        assert_eq!(world.open_channels(), 0);
    }

    #[test]
    fn read_bookkeeping() {
        let mut record = DeviceRecord::new(1);
        assert_eq!(record.note_read_error(), 1);
        assert_eq!(record.note_read_error(), 2);
        record.buf[..3].copy_from_slice(&[0xA2, 0x30, 0x01]);
        record.finish_read(3);
        assert_eq!(record.read_errors(), 0);
        assert_eq!(record.received(), &[0xA2, 0x30, 0x01]);
        assert_eq!(
            record.received_frame().unwrap().report(),
            &[0x30, 0x01]
        );
    }
}
