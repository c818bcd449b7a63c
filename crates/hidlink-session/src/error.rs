use hidlink_transport::BdAddr;

use crate::state::StateKind;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] hidlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] hidlink_frame::FrameError),

    /// The record has no target address.
    #[error("no target address known")]
    NoAddress,

    /// The record has not been discovered yet.
    #[error("device {0} has not been found")]
    NotFound(u32),

    /// The record already has an open session.
    #[error("device {0} is already connected")]
    AlreadyConnected(u32),

    /// The record has no open session.
    #[error("device {0} is not connected")]
    NotConnected(u32),

    /// A found record was asked to connect to a different address.
    #[error("address mismatch (record has {expected}, requested {actual})")]
    AddressMismatch { expected: BdAddr, actual: BdAddr },

    /// The requested state change is not in the transition table.
    #[error("illegal state transition {from} -> {to}")]
    IllegalTransition { from: StateKind, to: StateKind },
}

pub type Result<T> = std::result::Result<T, SessionError>;
