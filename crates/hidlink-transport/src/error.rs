use crate::addr::BdAddr;

/// Errors that can occur in radio and channel transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No usable radio adapter, or its control handle could not be opened.
    #[error("radio adapter unavailable: {0}")]
    AdapterUnavailable(std::io::Error),

    /// An inquiry round failed.
    #[error("inquiry failed: {0}")]
    Inquiry(std::io::Error),

    /// Failed to open a channel to the specified address.
    #[error("failed to connect to {address} (psm {psm:#06x}): {source}")]
    Connect {
        address: BdAddr,
        psm: u16,
        source: std::io::Error,
    },

    /// An I/O error occurred on an open channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A radio address string could not be parsed.
    #[error("invalid radio address: {0}")]
    InvalidAddress(String),

    /// The backend is not available on this platform.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, TransportError>;
