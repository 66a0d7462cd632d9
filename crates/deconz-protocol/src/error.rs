//! Error types shared across the APS/ZDP wire layer

use thiserror::Error;

/// Errors raised while decoding or encoding protocol primitives.
///
/// Codecs never panic on malformed input; every fallible path returns one of
/// these instead, consuming only the bytes it successfully parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("frame too short: need {need} bytes, have {have}")]
    FrameTooShort { need: usize, have: usize },

    #[error("unsupported address mode: {0:#04x}")]
    UnsupportedAddressMode(u8),

    #[error("invalid data type id: {0:#04x}")]
    InvalidDataType(u8),

    #[error("value out of range for width {width} bits")]
    OutOfRange { width: u8 },

    #[error("length {0} exceeds encoding budget")]
    LengthExceeded(usize),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("pool exhausted for {0}")]
    PoolExhausted(&'static str),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
