//! Device discovery and dual-channel session management for Bluetooth HID.
//!
//! This is the layer applications drive. Allocate a fixed set of
//! [`DeviceRecord`]s, fill them with [`Scanner::discover`], open sessions
//! with [`Connector`], then call [`poll`] once per tick per record and
//! [`send`] to write command frames.
//!
//! A record is connected exactly when both of its channels are open; every
//! failure path closes whatever was opened before returning.

pub mod config;
pub mod connector;
pub mod error;
pub mod io;
pub mod record;
pub mod scanner;
pub mod state;

pub use config::{ReadErrorPolicy, ScanConfig, SessionConfig, DEFAULT_POLL_TIMEOUT};
pub use connector::{disconnect, Connector};
pub use error::{Result, SessionError};
pub use io::{poll, send, PollOutcome};
pub use record::{DeviceRecord, Link};
pub use scanner::Scanner;
pub use state::{DeviceEvent, StateKind};
