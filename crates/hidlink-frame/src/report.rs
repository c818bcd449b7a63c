//! The report-type configuration command sent right after connecting.
//!
//! Interpreting the device's answer is left to the report parser; this
//! module only knows how to ask.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::codec::{Direction, Frame, OUTPUT_MARKER};

/// Output report id: set data reporting mode.
pub const SET_REPORT_TYPE: u8 = 0x12;

/// Reporting mode: core buttons only.
pub const MODE_BUTTONS: u8 = 0x30;

/// Flag byte value requesting continuous reporting.
pub const CONTINUOUS: u8 = 0x04;

/// Reporting mode requested during the post-connect handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportMode {
    /// Report on every sample instead of only on change.
    pub continuous: bool,
    /// Reporting mode id.
    pub mode: u8,
}

impl Default for ReportMode {
    fn default() -> Self {
        Self {
            continuous: false,
            mode: MODE_BUTTONS,
        }
    }
}

impl ReportMode {
    /// Append the command frame (`[0x52, 0x12, flags, mode]`) to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let flags = if self.continuous { CONTINUOUS } else { 0x00 };
        dst.reserve(4);
        dst.put_u8(OUTPUT_MARKER);
        dst.put_u8(SET_REPORT_TYPE);
        dst.put_u8(flags);
        dst.put_u8(self.mode);
    }

    /// The command as an outbound [`Frame`].
    pub fn to_frame(&self) -> Frame {
        let mut dst = BytesMut::with_capacity(4);
        self.encode(&mut dst);
        Frame {
            direction: Direction::Outbound,
            data: dst.freeze(),
        }
    }
}
