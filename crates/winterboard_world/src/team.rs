//! Teams.
//!
//! A [`Team`] aggregates pawns for iteration and carries the controller
//! binding produced by the join handshake. The world owns the pawns
//! themselves; a team only lists their ids.

use winterboard_core::{NetId, Player};

/// An ordered group of pawns under one controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    /// Network id, set by the world at spawn time. `None` until registered.
    pub id: Option<NetId>,
    /// The pawns on this team, in their fixed iteration order.
    pub pawn_ids: Vec<NetId>,
    /// The player controlling this team. Unset until the assignment
    /// handshake completes; terminal for the session once set.
    pub controller: Option<Player>,
}

impl Team {
    /// Create an unregistered team over already-spawned pawns.
    #[must_use]
    pub fn new(pawn_ids: Vec<NetId>) -> Self {
        Self {
            id: None,
            pawn_ids,
            controller: None,
        }
    }

    /// Request a specific network id at registration.
    #[must_use]
    pub fn with_id(mut self, id: NetId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns `true` once a controller is bound.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.controller.is_some()
    }
}
