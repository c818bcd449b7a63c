use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};

/// Canonical marker for frames received from the device.
pub const INPUT_MARKER: u8 = 0xA2;

/// Canonical marker for frames sent to the device.
pub const OUTPUT_MARKER: u8 = 0x52;

/// Fixed maximum frame length, marker included.
pub const MAX_FRAME_LEN: usize = 25;

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to host, on the input channel.
    Inbound,
    /// Host to device, on the output channel.
    Outbound,
}

impl Direction {
    /// The canonical marker for this direction.
    pub fn marker(self) -> u8 {
        match self {
            Direction::Inbound => INPUT_MARKER,
            Direction::Outbound => OUTPUT_MARKER,
        }
    }
}

/// An owned copy of one frame.
///
/// Wire shape:
/// ```text
/// ┌──────────┬──────────────────────────────┐
/// │ Marker   │ Report bytes (opaque)        │
/// │ (1B)     │ (up to MAX_FRAME_LEN - 1)    │
/// └──────────┴──────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub direction: Direction,
    pub data: Bytes,
}

impl Frame {
    /// Copy an inbound frame out of a receive buffer.
    pub fn inbound(data: &[u8]) -> Self {
        Self {
            direction: Direction::Inbound,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Build an outbound frame, validating length and patching the marker.
    pub fn outbound(data: &[u8]) -> Result<Self> {
        let mut dst = BytesMut::with_capacity(data.len());
        encode_outbound(data, &mut dst)?;
        Ok(Self {
            direction: Direction::Outbound,
            data: dst.freeze(),
        })
    }

    /// First byte of the frame.
    pub fn marker(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Bytes after the marker.
    pub fn report(&self) -> &[u8] {
        self.data.get(1..).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Check that `buf` is a sendable frame: non-empty, within the fixed maximum.
pub fn validate(buf: &[u8]) -> Result<()> {
    if buf.is_empty() {
        return Err(FrameError::Empty);
    }
    if buf.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLong {
            len: buf.len(),
            max: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

/// Force byte 0 of a received frame to [`INPUT_MARKER`], whatever it was.
///
/// Some stacks deliver interrupt-channel reports with a different first
/// byte; consumers always see the canonical marker. Returns the byte that
/// was replaced, or `None` for an empty buffer.
pub fn normalize_inbound(buf: &mut [u8]) -> Option<u8> {
    let first = buf.first_mut()?;
    let original = *first;
    *first = INPUT_MARKER;
    if original != INPUT_MARKER {
        trace!(original, "patched inbound marker");
    }
    Some(original)
}

/// Rewrite an [`INPUT_MARKER`] at byte 0 to [`OUTPUT_MARKER`].
///
/// Any other first byte is left alone. Returns whether a rewrite happened.
pub fn normalize_outbound(buf: &mut [u8]) -> bool {
    match buf.first_mut() {
        Some(first) if *first == INPUT_MARKER => {
            *first = OUTPUT_MARKER;
            trace!("patched outbound marker");
            true
        }
        _ => false,
    }
}

/// Validate `src` and append an outbound-normalized copy of it to `dst`.
///
/// `src` itself is never modified.
pub fn encode_outbound(src: &[u8], dst: &mut BytesMut) -> Result<()> {
    validate(src)?;
    let start = dst.len();
    dst.reserve(src.len());
    dst.put_slice(src);
    normalize_outbound(&mut dst[start..]);
    Ok(())
}
