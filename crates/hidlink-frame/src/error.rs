/// Errors that can occur while validating or building frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A frame must carry at least its direction marker.
    #[error("empty frame")]
    Empty,

    /// The frame exceeds the fixed maximum frame length.
    #[error("frame too long ({len} bytes, max {max})")]
    TooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
