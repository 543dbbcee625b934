//! # winterboard_world
//!
//! The replicated game world: the single place where an action becomes a
//! state mutation, and the single place whose output must be identical on
//! both participants given the same ordered action sequence.
//!
//! This crate provides:
//!
//! - [`pawn`] — a board piece with non-replicated movement interpolation.
//! - [`team`] — an ordered group of pawns bound to a controlling player.
//! - [`world`] — the [`GameWorld`](world::GameWorld) state machine.
//! - [`error`] — consistency-violation error types.

pub mod error;
pub mod pawn;
pub mod team;
pub mod world;

pub use error::WorldError;
pub use pawn::Pawn;
pub use team::Team;
pub use world::{GameWorld, Role};
