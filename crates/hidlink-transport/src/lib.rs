//! Radio control and dual-channel packet transport for Bluetooth HID.
//!
//! Provides the collaborator interfaces the session layer drives:
//! - [`Radio`] / [`RadioControl`]: adapter access and inquiry rounds
//! - [`ChannelTransport`] / [`Channel`]: packet channels to a remote device
//!
//! Backends:
//! - BlueZ raw HCI + L2CAP sockets (Linux)
//! - an in-memory simulation (feature `sim`) for tests
//!
//! This is the lowest layer of hidlink. Every handle it returns releases its
//! underlying resource on drop.

pub mod addr;
pub mod error;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod bluez;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use addr::{BdAddr, DeviceClass, ScanResult};
pub use error::{Result, TransportError};
pub use traits::{Channel, ChannelTransport, InquiryParams, Radio, RadioControl};

#[cfg(target_os = "linux")]
pub use bluez::{BluezRadio, BluezTransport};

#[cfg(any(test, feature = "sim"))]
pub use sim::{SimRadio, SimRead, SimTransport, SimWorld};
