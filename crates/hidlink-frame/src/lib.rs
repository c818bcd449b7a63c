//! Direction-marker framing for Bluetooth HID report frames.
//!
//! Every frame is a short byte buffer whose first byte marks its direction:
//! - `0xA2` for frames received from the device
//! - `0x52` for frames sent to the device
//!
//! The remaining bytes are opaque here. This crate validates frame length,
//! keeps the two markers from leaking across directions, and builds the
//! report-type command used to configure a freshly connected device.

pub mod channel;
pub mod codec;
pub mod error;
pub mod report;

pub use channel::{channel_name, INPUT, OUTPUT};
pub use codec::{
    encode_outbound, normalize_inbound, normalize_outbound, validate, Direction, Frame,
    INPUT_MARKER, MAX_FRAME_LEN, OUTPUT_MARKER,
};
pub use error::{FrameError, Result};
pub use report::ReportMode;
