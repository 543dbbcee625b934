//! Network-layer error types.

/// Errors that can occur during peer session operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a frame to MessagePack.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a frame from MessagePack.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The remote peer speaks a different protocol version.
    #[error("protocol version mismatch: got {got}, expected {expected}")]
    VersionMismatch {
        /// Version carried by the inbound frame.
        got: u16,
        /// Version this build speaks.
        expected: u16,
    },

    /// NATS transport error that does not fit a more specific variant.
    #[error("NATS error: {0}")]
    Nats(String),

    /// NATS connection error.
    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    /// NATS subscription error.
    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    /// NATS publish error.
    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),
}
