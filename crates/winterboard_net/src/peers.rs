//! Live-connection bookkeeping.
//!
//! The [`PeerSet`] tracks every open connection by its remote peer address,
//! and — on the host — which player identity completed the join handshake on
//! each connection. It is shared between the session handle and the receive
//! task, so it lives behind a [`DashMap`].

use std::time::{Duration, Instant};

use dashmap::DashMap;
use winterboard_core::Player;

/// State tracked for one open connection.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// The remote peer's address.
    pub address: String,
    /// The player bound to this connection, once its join request has been
    /// seen. Host-side only; a joiner never learns this for the host.
    pub player: Option<Player>,
    /// When the connection last produced any frame.
    pub last_seen: Instant,
}

/// The set of currently open connections, keyed by remote peer address.
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: DashMap<String, PeerInfo>,
}

impl PeerSet {
    /// Create an empty peer set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Record a newly opened connection.
    ///
    /// Returns `true` if the address was not already present.
    pub fn open(&self, address: &str) -> bool {
        if self.peers.contains_key(address) {
            return false;
        }
        self.peers.insert(
            address.to_string(),
            PeerInfo {
                address: address.to_string(),
                player: None,
                last_seen: Instant::now(),
            },
        );
        true
    }

    /// Mark a connection as alive at `now`.
    ///
    /// Returns `false` if no connection with that address is open.
    pub fn touch(&self, address: &str, now: Instant) -> bool {
        match self.peers.get_mut(address) {
            Some(mut info) => {
                info.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Addresses of connections that have been silent for longer than `ttl`.
    #[must_use]
    pub fn expired(&self, now: Instant, ttl: Duration) -> Vec<String> {
        self.peers
            .iter()
            .filter(|e| now.saturating_duration_since(e.value().last_seen) > ttl)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Remove a closed connection, returning its info if it was present.
    pub fn close(&self, address: &str) -> Option<PeerInfo> {
        self.peers.remove(address).map(|(_, info)| info)
    }

    /// Bind a player identity to an open connection.
    ///
    /// Returns `false` if no connection with that address is open.
    pub fn bind_player(&self, address: &str, player: Player) -> bool {
        match self.peers.get_mut(address) {
            Some(mut info) => {
                info.player = Some(player);
                true
            }
            None => false,
        }
    }

    /// Addresses of every open connection — the broadcast recipient list.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Players that have completed the join handshake, with the address of
    /// the connection each arrived on.
    #[must_use]
    pub fn connected_players(&self) -> Vec<(String, Player)> {
        self.peers
            .iter()
            .filter_map(|e| e.value().player.clone().map(|p| (e.key().clone(), p)))
            .collect()
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no connections are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
