//! Consistency-violation error types.
//!
//! These are correctness bugs, not expected runtime conditions: an action
//! referencing an entity the local registry does not know means the two
//! participants' worlds have diverged. They must never be swallowed —
//! whoever drives the event loop surfaces them and stops, because
//! continuing would entrench the divergence.

use winterboard_core::NetId;

/// Errors raised by registration and action application.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WorldError {
    /// An action referenced a pawn id not present in the local registry.
    #[error("unknown pawn id: {0}")]
    UnknownPawn(NetId),

    /// An action referenced a team id not present in the local registry.
    #[error("unknown team id: {0}")]
    UnknownTeam(NetId),

    /// A pawn was registered with an id that is already taken.
    #[error("duplicate pawn id: {0}")]
    DuplicatePawnId(NetId),

    /// A team was registered with an id that is already taken.
    #[error("duplicate team id: {0}")]
    DuplicateTeamId(NetId),

    /// A team tried to claim a pawn that already belongs to another team.
    #[error("pawn {0} already belongs to a team")]
    PawnAlreadyOwned(NetId),
}
