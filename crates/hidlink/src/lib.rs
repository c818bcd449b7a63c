//! Bluetooth HID peripheral discovery, sessions and report I/O.
//!
//! hidlink finds nearby HID peripherals by device class, opens the two
//! L2CAP channels each session needs, and moves short direction-marked
//! report frames over them with a bounded-latency polling read.
//!
//! # Crate Structure
//!
//! - [`transport`] — Radio inquiry and packet channels (BlueZ, simulated)
//! - [`frame`] — Direction-marker framing and the report-mode command
//! - [`session`] — Device records, discovery, connect/disconnect, poll/send

/// Re-export transport types.
pub mod transport {
    pub use hidlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use hidlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use hidlink_session::*;
}
