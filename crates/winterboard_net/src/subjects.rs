//! Peer addressing and NATS subject hierarchy.
//!
//! Every peer claims one address derived from a name: the host uses the
//! operator-supplied session name, a joiner uses its own (or generated)
//! name. Frames for a peer are published on that peer's subject; there is
//! no other signaling.

/// Namespace prefix baked into every peer address.
pub const BASE_NS: &str = "winterboard";

/// Root prefix for all winterboard NATS subjects.
pub const PREFIX: &str = "winterboard";

/// Build the session-scoped address for a named peer.
///
/// `winterboard_<name>`
#[must_use]
pub fn peer_address(name: &str) -> String {
    format!("{BASE_NS}_{name}")
}

/// Build the NATS subject a peer listens on for inbound frames.
///
/// `winterboard.peer.<address>`
#[must_use]
pub fn peer_subject(address: &str) -> String {
    format!("{PREFIX}.peer.{address}")
}

/// Build the address of the host for a given session name.
///
/// The host is always addressable directly from the session name, which is
/// how a joiner finds it with no central arbiter.
#[must_use]
pub fn host_address(session_name: &str) -> String {
    peer_address(session_name)
}
