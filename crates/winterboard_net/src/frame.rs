//! The versioned wire envelope.
//!
//! Every unit transmitted between peers is one [`Frame`]: a protocol version
//! plus a body. The version is checked on receipt and a mismatch is a hard
//! rejection — without it, drifted action vocabularies on the two sides
//! would deserialise into wrong payload shapes with no detection.

use serde::{Deserialize, Serialize};

use crate::action::PlayerAction;
use crate::codec;
use crate::error::NetError;

/// The wire protocol version this build speaks.
pub const PROTOCOL_VERSION: u16 = 1;

/// The body of a wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FrameBody {
    /// Connection request (joiner → host) or acknowledgement (host → joiner).
    Open {
        /// The sender's peer address.
        from: String,
    },
    /// One replicated game action.
    Action {
        /// The sender's peer address.
        from: String,
        /// The action payload.
        action: PlayerAction,
    },
    /// Periodic liveness signal. A connection that stops sending these (or
    /// anything else) is eventually expired.
    Ping {
        /// The sender's peer address.
        from: String,
    },
    /// The sender is closing its side of the connection.
    Close {
        /// The sender's peer address.
        from: String,
    },
}

impl FrameBody {
    /// Returns the sender address carried by the body.
    #[must_use]
    pub fn from_address(&self) -> &str {
        match self {
            Self::Open { from }
            | Self::Action { from, .. }
            | Self::Ping { from }
            | Self::Close { from } => from,
        }
    }
}

/// A complete wire frame: version + body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Protocol version of the sender.
    pub version: u16,
    /// Frame payload.
    pub body: FrameBody,
}

impl Frame {
    /// Wrap a body in a frame at the current protocol version.
    #[must_use]
    pub fn new(body: FrameBody) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            body,
        }
    }

    /// Encode this frame to MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Encode`] if serialisation fails.
    pub fn encode(&self) -> Result<Vec<u8>, NetError> {
        codec::encode(self)
    }

    /// Decode a frame from MessagePack bytes, rejecting version mismatches.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Decode`] on malformed bytes and
    /// [`NetError::VersionMismatch`] if the sender speaks a different
    /// protocol version.
    pub fn decode(bytes: &[u8]) -> Result<Self, NetError> {
        let frame: Frame = codec::decode(bytes)?;
        if frame.version != PROTOCOL_VERSION {
            return Err(NetError::VersionMismatch {
                got: frame.version,
                expected: PROTOCOL_VERSION,
            });
        }
        Ok(frame)
    }
}
