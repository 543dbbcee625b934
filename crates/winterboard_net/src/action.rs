//! The closed action vocabulary exchanged between peers.
//!
//! Every state mutation in a match is described by exactly one
//! [`PlayerAction`] value. Actions are immutable once created: they are
//! broadcast, applied, and appended to the history, never edited. Adding a
//! new kind of action means adding a variant here, and the exhaustive
//! matches in the game world make every consumer a compile error until it
//! handles the new kind.

use serde::{Deserialize, Serialize};
use winterboard_core::{HashId, NetId, Player, Vec3};

/// Metadata common to turn-advancing actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMeta {
    /// The turn count at the originating peer when the action was created.
    /// Used as a divergence hint, not for ordering.
    pub turn: u64,
    /// The player that originated the action.
    pub player_id: HashId,
}

/// One `(player, team)` pairing inside an [`PlayerAction::AssignPlayers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The player taking control of the team.
    pub player: Player,
    /// The team being assigned.
    pub team_id: NetId,
}

/// A replicated game action.
///
/// Each variant carries the minimum data required to reproduce its effect on
/// a remote copy of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Order a pawn toward a board position.
    Move {
        /// Common metadata.
        meta: ActionMeta,
        /// The acting team.
        team_id: NetId,
        /// The pawn being moved.
        pawn_id: NetId,
        /// Destination in board space.
        target: Vec3,
    },
    /// Strike a target pawn for fixed damage.
    Attack {
        /// Common metadata.
        meta: ActionMeta,
        /// The attacking pawn.
        pawn_id: NetId,
        /// The pawn taking the hit.
        target_id: NetId,
    },
    /// Spend the turn on a cast. Carries no effect payload yet.
    Cast {
        /// Common metadata.
        meta: ActionMeta,
    },
    /// A joiner announces itself to the host.
    JoinRequest {
        /// The joining player's identity.
        player: Player,
    },
    /// The host binds players to teams and fixes the turn order.
    ///
    /// Broadcast and applied on every participant, the host included, so
    /// that all copies converge on identical controller assignments.
    AssignPlayers {
        /// Controller pairings, one per team being assigned.
        assignments: Vec<Assignment>,
        /// The replicated team turn order. Carried explicitly so the order
        /// never depends on each side's local registration sequence.
        turn_order: Vec<NetId>,
    },
    /// No payload, no effect. Recorded in the history like any other action.
    None,
}

impl PlayerAction {
    /// Returns `true` if applying this action advances the turn counter.
    #[must_use]
    pub fn advances_turn(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::Attack { .. } | Self::Cast { .. }
        )
    }

    /// Returns the common metadata, for the variants that carry it.
    #[must_use]
    pub fn meta(&self) -> Option<&ActionMeta> {
        match self {
            Self::Move { meta, .. } | Self::Attack { meta, .. } | Self::Cast { meta } => Some(meta),
            Self::JoinRequest { .. } | Self::AssignPlayers { .. } | Self::None => None,
        }
    }

    /// A short tag naming the action kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Attack { .. } => "attack",
            Self::Cast { .. } => "cast",
            Self::JoinRequest { .. } => "join_request",
            Self::AssignPlayers { .. } => "assign_players",
            Self::None => "none",
        }
    }
}
