use thiserror::Error;

/// Errors from the swank wire layer and client.
#[derive(Debug, Error)]
pub enum SwankError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sexp error: {0}")]
    Sexp(#[from] ensign_sexp::SexpError),

    /// A frame header that is not six hex digits.
    #[error("invalid frame length header {0:?}")]
    BadLength(String),

    /// A payload too large for the six-digit header.
    #[error("frame payload of {len} bytes exceeds the framing limit")]
    FrameTooLarge { len: usize },

    /// A frame body that is not valid UTF-8.
    #[error("frame payload is not valid UTF-8")]
    BadUtf8,

    /// Connecting to the server did not finish in time.
    #[error("timed out connecting to server")]
    ConnectTimeout,

    /// The session is not (or no longer) connected.
    #[error("not connected to server")]
    NotConnected,

    /// A well-framed message whose shape the protocol does not allow.
    #[error("malformed message: {0}")]
    Malformed(String),
}
