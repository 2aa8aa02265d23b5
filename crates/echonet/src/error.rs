//! Codec error types.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EchonetError {
    /// Frame is too short to hold the fixed header.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    /// Not an ECHONET Lite format-1 frame.
    #[error("bad frame header: {0:02X} {1:02X}")]
    BadHeader(u8, u8),

    /// A declared property runs past the end of the frame.
    #[error("property {index} truncated: needs {expected} more bytes, {actual} left")]
    TruncatedProperty {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Property data does not have the width its property code requires.
    #[error("unexpected data length {actual} for property 0x{epc:02X}")]
    BadPropertyLength { epc: u8, actual: usize },

    /// No decoder for this property code.
    #[error("no decoder for property 0x{0:02X}")]
    UnknownProperty(u8),
}
