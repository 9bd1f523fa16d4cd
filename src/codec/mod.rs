//! Codec abstraction for message encoding/decoding
//!
//! Separates wire encoding from transport, same split as the teacher:
//! - **Codec**: how an `ActionPacket`/`ObservationPacket` becomes bytes
//!   and back (today: self-describing CBOR).
//! - **Transport**: how those bytes flow between processes (TCP, framed
//!   with a length prefix — see `crate::transport`).
//!
//! Decode failures are intentionally a narrower type than `CoreError`:
//! a malformed or stale-protocol observation is dropped and logged by
//! the `ObservationPump`, never surfaced to the caller of `recv_observation`.

pub mod cbor;
pub mod packet;

pub use cbor::CborCodec;
pub use packet::{
    ActionPacket, CursorMode, CursorPos, CursorPosInt, FrameType, GlfwAction, InputEvent,
    InputType, InventorySlot, Mode, ObservationPacket, PlayerPos,
};

use std::fmt;

/// Encodes outbound `ActionPacket`s and decodes inbound `ObservationPacket`s
pub trait Codec: Send + Sync {
    /// Serialize an action for transmission. Infallible: every value a
    /// caller can construct through the public API is representable.
    fn encode_action(&self, action: &ActionPacket) -> Vec<u8>;

    /// Parse a frame received on the observation channel.
    ///
    /// Distinguishes three failure kinds so a caller logging skip
    /// statistics can tell "garbage on the wire" from "the simulator
    /// speaks a protocol version we don't."
    fn decode_observation(&self, bytes: &[u8]) -> Result<ObservationPacket, DecodeError>;
}

/// Why an inbound frame could not be turned into an `ObservationPacket`
#[derive(Debug)]
pub enum DecodeError {
    /// Bytes are not valid CBOR at all
    MalformedPayload(serde_cbor::Error),
    /// Valid CBOR, but missing fields or wrong shapes for `ObservationPacket`
    SchemaMismatch(serde_cbor::Error),
    /// Valid `ObservationPacket`, but `protocol_version` does not match
    /// this build
    VersionMismatch { expected: u32, got: u32 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedPayload(e) => write!(f, "malformed observation payload: {e}"),
            Self::SchemaMismatch(e) => write!(f, "observation does not match schema: {e}"),
            Self::VersionMismatch { expected, got } => {
                write!(f, "observation protocol version mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MalformedPayload(e) | Self::SchemaMismatch(e) => Some(e),
            Self::VersionMismatch { .. } => None,
        }
    }
}
