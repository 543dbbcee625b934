//! The player record.
//!
//! Exactly one local [`Player`] exists per process; it is constructed at
//! startup and passed explicitly into whatever composes the peer session and
//! the game world. Remote players are learned from `join_request` /
//! `assign_players` payloads and are never deleted, only left behind when a
//! team goes away.

use serde::{Deserialize, Serialize};

use crate::id::HashId;

/// A participant in a match, identified by a session-stable [`HashId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Session-stable random identity, generated locally.
    pub id: HashId,
    /// Display name. Mutable until a session starts.
    pub name: String,
}

impl Player {
    /// Create a player with a fresh random id and the given display name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: HashId::generate(),
            name: name.into(),
        }
    }

    /// Create an anonymous player with a generated id and a default name.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new("Default Player")
    }
}
