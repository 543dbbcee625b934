//! Board pieces.
//!
//! A [`Pawn`]'s replicated state is its identity, health, and current
//! movement target. The actual position interpolation toward the target is
//! per-frame presentation state advanced by [`Pawn::update`] — it never
//! feeds back into replication.

use winterboard_core::{NetId, Vec3};

/// Health every pawn starts with.
pub const MAX_HEALTH: f32 = 100.0;

/// A single board piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Pawn {
    /// Network id, set by the world at spawn time. `None` until registered.
    pub id: Option<NetId>,
    /// Display name.
    pub name: String,
    /// Current board position (presentation state).
    pub position: Vec3,
    /// Units per second toward the movement target.
    pub move_speed: f32,
    /// Remaining health, clamped at zero.
    pub health: f32,
    /// Destination of the current move order, if any.
    move_target: Option<Vec3>,
    /// Back-reference to the owning team, set when a team claims this pawn.
    /// Non-owning; only used to resolve the controller.
    team: Option<NetId>,
}

impl Pawn {
    /// Create an unregistered pawn at a starting position.
    #[must_use]
    pub fn new(name: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: None,
            name: name.into(),
            position,
            move_speed: 1.0,
            health: MAX_HEALTH,
            move_target: None,
            team: None,
        }
    }

    /// Request a specific network id at registration.
    #[must_use]
    pub fn with_id(mut self, id: NetId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the movement speed.
    #[must_use]
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// The team this pawn belongs to, if any.
    #[must_use]
    pub fn team(&self) -> Option<NetId> {
        self.team
    }

    pub(crate) fn set_team(&mut self, team: NetId) {
        self.team = Some(team);
    }

    /// The pending movement target, if a move order is in flight.
    #[must_use]
    pub fn move_target(&self) -> Option<Vec3> {
        self.move_target
    }

    /// Order this pawn toward a position. The replicated effect of a `move`
    /// action; traversal happens over subsequent [`update`](Self::update)
    /// calls.
    pub fn set_target_position(&mut self, target: Vec3) {
        self.move_target = Some(target);
    }

    /// Apply damage, clamping health at zero.
    pub fn apply_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    /// Returns `true` while health remains.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Advance position toward the movement target: snap when within one
    /// step, otherwise lerp by `step / distance`.
    pub fn update(&mut self, dt: f32) {
        let Some(target) = self.move_target else {
            return;
        };

        let dist = self.position.distance(target);
        let step = self.move_speed * dt;

        if dist <= step {
            self.position = target;
            self.move_target = None;
        } else {
            self.position = self.position.lerp(target, step / dist);
        }
    }
}
