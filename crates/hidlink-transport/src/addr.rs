use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A 6-byte Bluetooth device address.
///
/// Bytes are stored in display order, so `AA:BB:CC:DD:EE:FF` is
/// `[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]`. Backends that use the
/// little-endian kernel layout convert with [`BdAddr::to_le_bytes`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// The all-zero address, meaning "no target known".
    pub const ANY: BdAddr = BdAddr([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Kernel (`bdaddr_t`) byte order.
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut le = self.0;
        le.reverse();
        le
    }

    pub fn from_le_bytes(mut le: [u8; 6]) -> Self {
        le.reverse();
        Self(le)
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BdAddr({self})")
    }
}

impl FromStr for BdAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| TransportError::InvalidAddress(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| TransportError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for BdAddr {
    type Error = TransportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BdAddr> for String {
    fn from(addr: BdAddr) -> Self {
        addr.to_string()
    }
}

/// Class-of-device signature advertised during inquiry, in the byte order
/// the radio reports it (least significant byte first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceClass(pub [u8; 3]);

impl DeviceClass {
    /// Nintendo Wii Remote (peripheral, joystick).
    pub const WIIMOTE: DeviceClass = DeviceClass([0x04, 0x25, 0x00]);

    /// The 24-bit class value.
    pub fn value(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 0])
    }
}

impl Default for DeviceClass {
    fn default() -> Self {
        Self::WIIMOTE
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.value())
    }
}

/// One radio-visible device reported by an inquiry round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    pub address: BdAddr,
    pub class: DeviceClass,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let addr: BdAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(addr.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn parse_accepts_lowercase_and_dashes() {
        let addr: BdAddr = "00-1f-32-aa-bb-01".parse().unwrap();
        assert_eq!(addr.to_string(), "00:1F:32:AA:BB:01");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "AA:BB:CC:DD:EE", "AA:BB:CC:DD:EE:FF:00", "AA:BB:CC:DD:EE:GG", "A:BB:CC:DD:EE:FF"] {
            assert!(
                matches!(bad.parse::<BdAddr>(), Err(TransportError::InvalidAddress(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn kernel_byte_order_is_reversed() {
        let addr: BdAddr = "01:02:03:04:05:06".parse().unwrap();
        assert_eq!(addr.to_le_bytes(), [6, 5, 4, 3, 2, 1]);
        assert_eq!(BdAddr::from_le_bytes(addr.to_le_bytes()), addr);
    }

    #[test]
    fn zero_address() {
        assert!(BdAddr::ANY.is_zero());
        assert!(BdAddr::default().is_zero());
        assert!(!BdAddr::new([0, 0, 0, 0, 0, 1]).is_zero());
    }

    #[test]
    fn address_serializes_as_string() {
        let addr: BdAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");
        let back: BdAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<BdAddr>("\"nope\"").is_err());
    }

    #[test]
    fn wiimote_class_value() {
        assert_eq!(DeviceClass::WIIMOTE.value(), 0x002504);
        assert_eq!(DeviceClass::default(), DeviceClass::WIIMOTE);
    }
}
