use bytes::BytesMut;
use hidlink_transport::{BdAddr, ChannelTransport};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::record::{DeviceRecord, Link};
use crate::state::DeviceEvent;

/// Opens and closes dual-channel sessions.
pub struct Connector<T> {
    transport: T,
    config: SessionConfig,
}

impl<T: ChannelTransport> Connector<T> {
    /// Create a connector with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a connector with explicit configuration.
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open both channels to a found record's address.
    ///
    /// The output channel is opened first, then the input channel. If either
    /// fails, nothing stays open and the record is left exactly as it was.
    /// On success the record is `Connected` and the report-type command has
    /// been sent; `HandshakeComplete` is left to the report parser.
    pub fn connect(&self, record: &mut DeviceRecord) -> Result<()> {
        if record.is_connected() {
            return Err(SessionError::AlreadyConnected(record.id()));
        }
        let address = record.address();
        if address.is_zero() {
            return Err(SessionError::NoAddress);
        }
        if !record.is_found() {
            return Err(SessionError::NotFound(record.id()));
        }

        let output = self
            .transport
            .open(address, self.config.output_psm)
            .inspect_err(|err| warn!(id = record.id(), error = %err, "output channel failed"))?;

        let input = match self.transport.open(address, self.config.input_psm) {
            Ok(input) => input,
            Err(err) => {
                warn!(id = record.id(), error = %err, "input channel failed, closing output");
                drop(output);
                return Err(err.into());
            }
        };

        record.attach(Link::new(output, input))?;
        record.set_event(DeviceEvent::Connected);
        info!(id = record.id(), %address, "connected");

        if self.config.send_report_mode {
            self.request_report_mode(record);
        }
        Ok(())
    }

    /// Assign `address` to the record (if it has none yet) and connect.
    pub fn connect_address(&self, record: &mut DeviceRecord, address: BdAddr) -> Result<()> {
        if address.is_zero() {
            return Err(SessionError::NoAddress);
        }
        if !record.is_found() {
            record.mark_found(address)?;
        } else if record.address() != address {
            return Err(SessionError::AddressMismatch {
                expected: record.address(),
                actual: address,
            });
        }
        self.connect(record)
    }

    /// Connect every found, not-yet-connected record.
    ///
    /// Returns the number of sessions opened by this call.
    pub fn connect_all(&self, records: &mut [DeviceRecord]) -> usize {
        let mut connected = 0usize;
        for record in records
            .iter_mut()
            .filter(|r| r.is_found() && !r.is_connected())
        {
            match self.connect(record) {
                Ok(()) => connected += 1,
                Err(err) => {
                    warn!(id = record.id(), address = %record.address(), error = %err, "connect failed")
                }
            }
        }
        connected
    }

    fn request_report_mode(&self, record: &mut DeviceRecord) {
        let id = record.id();
        let Some(link) = record.link_mut() else {
            return;
        };
        let mut frame = BytesMut::with_capacity(4);
        self.config.report_mode.encode(&mut frame);
        match link.output().send(&frame) {
            Ok(n) => debug!(id, bytes = n, "report mode requested"),
            Err(err) => warn!(id, error = %err, "report mode request failed"),
        }
    }
}

/// Tear down a record's session. No-op if it is not connected.
pub fn disconnect(record: &mut DeviceRecord) {
    record.disconnect();
}

#[cfg(test)]
mod tests {
    use hidlink_frame::{ReportMode, INPUT, OUTPUT};
    use hidlink_transport::SimWorld;

    use super::*;
    use crate::state::StateKind;

    fn addr() -> BdAddr {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    fn found(id: u32) -> DeviceRecord {
        DeviceRecord::with_address(id, addr()).unwrap()
    }

    #[test]
    fn connect_opens_output_then_input() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        connector.connect(&mut record).unwrap();
        assert_eq!(record.state(), StateKind::Connected);
        assert!(record.has_channels());
        assert_eq!(record.event(), DeviceEvent::Connected);
        assert_eq!(world.opened(), vec![(addr(), OUTPUT), (addr(), INPUT)]);
        assert_eq!(world.open_channels(), 2);
    }

    #[test]
    fn connect_sends_report_mode_on_output() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        connector.connect(&mut record).unwrap();
        assert_eq!(
            world.written(addr(), OUTPUT),
            vec![vec![0x52, 0x12, 0x00, 0x30]]
        );
        assert!(world.written(addr(), INPUT).is_empty());
        assert!(!record.is_handshake_complete());
    }

    #[test]
    fn report_mode_can_be_configured_or_disabled() {
        let world = SimWorld::new();
        let connector = Connector::with_config(
            world.transport(),
            SessionConfig {
                report_mode: ReportMode {
                    continuous: true,
                    mode: 0x31,
                },
                ..SessionConfig::default()
            },
        );
        let mut record = found(1);
        connector.connect(&mut record).unwrap();
        assert_eq!(
            world.written(addr(), OUTPUT),
            vec![vec![0x52, 0x12, 0x04, 0x31]]
        );

        let quiet_world = SimWorld::new();
        let quiet = Connector::with_config(
            quiet_world.transport(),
            SessionConfig {
                send_report_mode: false,
                ..SessionConfig::default()
            },
        );
        let mut record = found(2);
        quiet.connect(&mut record).unwrap();
        assert!(quiet_world.written(addr(), OUTPUT).is_empty());
    }

    #[test]
    fn failed_report_mode_write_keeps_connection() {
        let world = SimWorld::new();
        world.fail_writes(Some(std::io::ErrorKind::BrokenPipe));
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        connector.connect(&mut record).unwrap();
        assert!(record.is_connected());
    }

    #[test]
    fn zero_address_fails_without_opening() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = DeviceRecord::new(1);

        assert!(matches!(
            connector.connect(&mut record),
            Err(SessionError::NoAddress)
        ));
        assert!(!record.is_connected());
        assert!(world.opened().is_empty());
    }

    #[test]
    fn output_failure_opens_nothing() {
        let world = SimWorld::new();
        world.refuse(addr(), OUTPUT);
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        assert!(matches!(
            connector.connect(&mut record),
            Err(SessionError::Transport(_))
        ));
        assert!(world.opened().is_empty(), "input must not be tried");
        assert_eq!(record.state(), StateKind::Found);
    }

    #[test]
    fn input_failure_rolls_back_output() {
        let world = SimWorld::new();
        world.refuse(addr(), INPUT);
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        assert!(connector.connect(&mut record).is_err());
        assert_eq!(world.opened(), vec![(addr(), OUTPUT)]);
        assert_eq!(world.open_channels(), 0, "output handle leaked");
        assert!(!record.has_channels());
        assert!(!record.is_connected());
        assert_eq!(record.event(), DeviceEvent::None);
    }

    #[test]
    fn connect_twice_is_rejected() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        connector.connect(&mut record).unwrap();
        assert!(matches!(
            connector.connect(&mut record),
            Err(SessionError::AlreadyConnected(1))
        ));
        assert_eq!(world.open_channels(), 2);
    }

    #[test]
    fn connect_address_assigns_and_checks() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());

        let mut record = DeviceRecord::new(1);
        connector.connect_address(&mut record, addr()).unwrap();
        assert!(record.is_connected());
        assert_eq!(record.address(), addr());

        let mut other = found(2);
        let wrong: BdAddr = "11:22:33:44:55:66".parse().unwrap();
        assert!(matches!(
            connector.connect_address(&mut other, wrong),
            Err(SessionError::AddressMismatch { .. })
        ));
        assert!(matches!(
            connector.connect_address(&mut DeviceRecord::new(3), BdAddr::ANY),
            Err(SessionError::NoAddress)
        ));
    }

    #[test]
    fn connect_all_skips_unfound_and_counts_successes() {
        let world = SimWorld::new();
        let second: BdAddr = "00:19:1D:00:00:02".parse().unwrap();
        world.refuse(second, INPUT);
        let connector = Connector::new(world.transport());

        let mut records = vec![
            found(1),
            DeviceRecord::new(2),
            DeviceRecord::with_address(3, second).unwrap(),
            DeviceRecord::new(4),
        ];
        assert_eq!(connector.connect_all(&mut records), 1);
        assert!(records[0].is_connected());
        assert!(!records[1].is_connected());
        assert!(!records[2].is_connected());
        assert_eq!(world.open_channels(), 2);

        world.allow(second, INPUT);
        assert_eq!(connector.connect_all(&mut records), 1);
        assert!(records[2].is_connected());
        assert_eq!(world.open_channels(), 4);
    }

    #[test]
    fn connected_iff_channels_across_sequences() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        let steps: [&dyn Fn(&mut DeviceRecord); 8] = [
            &|r| drop(connector.connect(r)),
            &|r| drop(connector.connect(r)),
            &|r| disconnect(r),
            &|r| disconnect(r),
            &|r| drop(connector.connect(r)),
            &|r| drop(r.complete_handshake()),
            &|r| drop(connector.connect(r)),
            &|r| disconnect(r),
        ];
        for (i, step) in steps.iter().enumerate() {
            step(&mut record);
            assert_eq!(record.is_connected(), record.has_channels(), "step {i}");
            assert_eq!(
                world.open_channels(),
                if record.is_connected() { 2 } else { 0 },
                "step {i}"
            );
            assert!(record.is_found());
        }
    }

    #[test]
    fn disconnect_keeps_identity() {
        let world = SimWorld::new();
        let connector = Connector::new(world.transport());
        let mut record = found(1);

        connector.connect(&mut record).unwrap();
        disconnect(&mut record);
        assert_eq!(record.state(), StateKind::Found);
        assert_eq!(record.address(), addr());
        assert_eq!(record.event(), DeviceEvent::None);

        connector.connect(&mut record).unwrap();
        assert!(record.is_connected());
    }
}
