//! # winterboard_core
//!
//! Identity and primitive types shared by every winterboard crate.
//!
//! This crate provides:
//!
//! - [`id`] — network-scoped entity ids and random player hash ids.
//! - [`player`] — the player record carried through the join handshake.
//!
//! It also re-exports [`glam::Vec3`] so the rest of the workspace shares
//! one vector type for board positions and movement targets.

pub mod id;
pub mod player;

pub use glam::Vec3;

pub use id::{HashId, NetId};
pub use player::Player;
