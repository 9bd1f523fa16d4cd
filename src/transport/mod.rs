//! Transport layer: two loopback TCP sockets
//!
//! `ActionTransport` binds and publishes (lossy until a peer attaches);
//! `ObservationTransport` connects and subscribes (blocking receive, one
//! peer, no topic filtering). Framing is handled by `framing`; the CBOR
//! encoding itself is the codec's job, not this layer's.

pub mod action;
pub mod framing;
pub mod observation;

pub use action::ActionTransport;
pub use observation::ObservationTransport;
