//! # winterboard_net
//!
//! Peer session layer for winterboard matches.
//!
//! This crate provides:
//!
//! - [`subjects`] — peer addressing and NATS subject builders.
//! - [`action`] — the closed action vocabulary exchanged between peers.
//! - [`frame`] — the versioned wire envelope around actions and the
//!   connection lifecycle.
//! - [`codec`] — MessagePack serialisation/deserialisation helpers.
//! - [`peers`] — bookkeeping of live connections and joined players.
//! - [`session`] — the [`PeerSession`](session::PeerSession) itself.
//! - [`error`] — network-layer error types.
//!
//! The underlying reliable ordered channel is an external NATS server; this
//! crate never implements transport, it consumes one.

pub mod action;
pub mod codec;
pub mod error;
pub mod frame;
pub mod peers;
pub mod session;
pub mod subjects;

pub use action::{ActionMeta, Assignment, PlayerAction};
pub use codec::{decode, encode};
pub use error::NetError;
pub use frame::{Frame, FrameBody, PROTOCOL_VERSION};
pub use session::{PeerSession, SessionConfig, SessionEvent};
