//! Error types for the ZCL codec and controller façade (C5/C10).
//!
//! Mirrors the teacher's boundary-error style (`deconz_protocol::ProtocolError`,
//! `zcl_db::SchemaError`): one `thiserror`-derived enum per crate, composed
//! with `#[from]` rather than a single crate-spanning error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("frame too short: need {need} bytes, have {have}")]
    FrameTooShort { need: usize, have: usize },

    #[error("value out of range for declared width")]
    OutOfRange,

    #[error("unsupported data type: {0:#04x}")]
    UnsupportedDataType(u8),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("resource address has too many path components (max {max}): {uri}")]
    UriTooLong { uri: String, max: usize },

    #[error(transparent)]
    Protocol(#[from] deconz_protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("transport not connected")]
    NotConnected,

    #[error("request queue full")]
    QueueFull,

    #[error("node is a zombie and cannot accept requests")]
    NodeIsZombie,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] deconz_protocol::ProtocolError),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type ControllerResult<T> = std::result::Result<T, ControllerError>;
