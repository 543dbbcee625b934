//! Network-scoped identifiers.
//!
//! A [`NetId`] is a small integer identifying one pawn or one team within a
//! session. Ids are allocated by the game world at spawn time and are unique
//! per entity class (pawn ids and team ids are separate namespaces).
//!
//! A [`HashId`] is a short random string identifying a *player*. It is
//! generated locally and carried in the join handshake; it is not guaranteed
//! globally unique, but collisions over the id space (36^16) are treated as
//! negligible.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A network-scoped entity identifier.
///
/// Unique among pawns and separately unique among teams within one session.
/// Allocated by the game world; immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetId(pub u32);

impl NetId {
    /// Create an id from a raw `u32`.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NetId({})", self.0)
    }
}

/// Alphabet used for hash id characters.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Pattern for freshly generated ids; every `x` becomes a random character.
const DEFAULT_PATTERN: &str = "xxxx-xxxx-xxxx-xxxx";

/// A short random string identifying a player across the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashId(String);

impl HashId {
    /// Generate a fresh random id in the default `xxxx-xxxx-xxxx-xxxx` shape.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with_pattern(DEFAULT_PATTERN)
    }

    /// Generate a fresh random id, replacing every `x` in `pattern` with a
    /// random character from the lowercase alphanumeric alphabet.
    #[must_use]
    pub fn generate_with_pattern(pattern: &str) -> Self {
        let mut rng = rand::thread_rng();
        let id = pattern
            .chars()
            .map(|c| {
                if c == 'x' {
                    ALPHABET[rng.gen_range(0..ALPHABET.len())] as char
                } else {
                    c
                }
            })
            .collect();
        Self(id)
    }

    /// Wrap an existing string as a hash id (e.g. an operator-chosen name).
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HashId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_id_raw_roundtrip() {
        let id = NetId::from_raw(7);
        assert_eq!(id.id(), 7);
        assert_eq!(id, NetId(7));
    }

    #[test]
    fn test_net_id_ordering() {
        assert!(NetId(0) < NetId(1));
        assert!(NetId(1) < NetId(10));
    }

    #[test]
    fn test_hash_id_matches_pattern_shape() {
        let id = HashId::generate();
        let s = id.as_str();
        assert_eq!(s.len(), DEFAULT_PATTERN.len());
        for (c, p) in s.chars().zip(DEFAULT_PATTERN.chars()) {
            if p == 'x' {
                assert!(c.is_ascii_lowercase() || c.is_ascii_digit());
            } else {
                assert_eq!(c, p);
            }
        }
    }

    #[test]
    fn test_hash_id_custom_pattern() {
        let id = HashId::generate_with_pattern("xx-xx");
        assert_eq!(id.as_str().len(), 5);
        assert_eq!(id.as_str().as_bytes()[2], b'-');
    }

    #[test]
    fn test_hash_ids_are_distinct() {
        // Not a collision proof, just a sanity check that the generator
        // is not returning a constant.
        let a = HashId::generate();
        let b = HashId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_net_id_serde_roundtrip() {
        let id = NetId(42);
        let bytes = rmp_serde::to_vec(&id).unwrap();
        let restored: NetId = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, id);
    }
}
