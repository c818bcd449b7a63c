//! Channel identifiers (L2CAP PSMs) used by a HID session.
//!
//! Every session uses exactly two channels to the same device.

/// Output channel: commands from host to device (HID control).
pub const OUTPUT: u16 = 0x11;

/// Input channel: reports from device to host (HID interrupt).
pub const INPUT: u16 = 0x13;

/// Returns a human-readable name for a channel identifier.
pub fn channel_name(psm: u16) -> &'static str {
    match psm {
        OUTPUT => "OUTPUT",
        INPUT => "INPUT",
        _ => "OTHER",
    }
}
