//! The replicated state machine.
//!
//! [`GameWorld`] owns the per-process copy of teams, pawns, turn state, and
//! the action history. Both participants apply the same ordered action
//! sequence through [`GameWorld::play_action_local`], and that is the whole
//! convergence argument: the dispatch is deterministic, so identical
//! registries plus identical action sequences yield identical state.
//!
//! Locally originated actions go through [`GameWorld::play_action`], which
//! queues the action for broadcast and then applies it through the same
//! local path a remote copy will use.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};
use winterboard_core::{NetId, Player, Vec3};
use winterboard_net::{ActionMeta, Assignment, PlayerAction};

use crate::error::WorldError;
use crate::pawn::Pawn;
use crate::team::Team;

/// Damage applied by one `attack` action.
pub const ATTACK_DAMAGE: f32 = 25.0;

/// Whether this process hosts the session or joined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepts inbound connections and arbitrates the join handshake.
    Host,
    /// Opens one outbound connection to the host.
    Client,
}

/// The authoritative-per-process game state.
#[derive(Debug)]
pub struct GameWorld {
    /// The player driving this process. Passed in explicitly; never global.
    local_player: Player,
    /// Host or joining participant.
    role: Role,
    /// All pawns, keyed by network id. Exclusively owned here.
    pawns: BTreeMap<NetId, Pawn>,
    /// All teams, keyed by network id.
    teams: BTreeMap<NetId, Team>,
    /// Replicated team turn order. Seeded by registration order, replaced
    /// wholesale by the `assign_players` handshake so both sides agree
    /// regardless of local construction sequence.
    turn_order: Vec<NetId>,
    /// Count of turn-advancing actions applied so far.
    turn_count: u64,
    /// Append-only record of every applied action, in application order.
    history: Vec<PlayerAction>,
    /// Locally originated actions awaiting broadcast by the session driver.
    outbox: VecDeque<PlayerAction>,
    /// Host-side: requesters seen but not yet seated.
    pending_joiners: Vec<Player>,
}

impl GameWorld {
    /// Create an empty world for the given local player and role.
    #[must_use]
    pub fn new(local_player: Player, role: Role) -> Self {
        Self {
            local_player,
            role,
            pawns: BTreeMap::new(),
            teams: BTreeMap::new(),
            turn_order: Vec::new(),
            turn_count: 0,
            history: Vec::new(),
            outbox: VecDeque::new(),
            pending_joiners: Vec::new(),
        }
    }

    // ── Registration ────────────────────────────────────────────────────

    /// Register a pawn, allocating a network id if it supplied none.
    ///
    /// Auto-allocated ids are `max(existing) + 1`, starting at 0.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicatePawnId`] if an explicitly supplied id
    /// is already taken; the registry is left unchanged.
    pub fn spawn_pawn(&mut self, mut pawn: Pawn) -> Result<NetId, WorldError> {
        let id = match pawn.id {
            Some(id) => {
                if self.pawns.contains_key(&id) {
                    return Err(WorldError::DuplicatePawnId(id));
                }
                id
            }
            None => self
                .pawns
                .keys()
                .next_back()
                .map_or(NetId(0), |max| NetId(max.0 + 1)),
        };
        pawn.id = Some(id);
        self.pawns.insert(id, pawn);
        Ok(id)
    }

    /// Register a team over already-spawned pawns, allocating a network id
    /// if it supplied none, and append it to the turn order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateTeamId`] on an id collision,
    /// [`WorldError::UnknownPawn`] if a listed pawn is not registered, or
    /// [`WorldError::PawnAlreadyOwned`] if a listed pawn already belongs to
    /// a team. Nothing is mutated on failure.
    pub fn spawn_team(&mut self, mut team: Team) -> Result<NetId, WorldError> {
        let id = match team.id {
            Some(id) => {
                if self.teams.contains_key(&id) {
                    return Err(WorldError::DuplicateTeamId(id));
                }
                id
            }
            None => self
                .teams
                .keys()
                .next_back()
                .map_or(NetId(0), |max| NetId(max.0 + 1)),
        };

        // Validate every pawn before touching anything. A pawn listed twice
        // in the same roster counts as already owned.
        for (i, pawn_id) in team.pawn_ids.iter().enumerate() {
            if team.pawn_ids[..i].contains(pawn_id) {
                return Err(WorldError::PawnAlreadyOwned(*pawn_id));
            }
            let pawn = self
                .pawns
                .get(pawn_id)
                .ok_or(WorldError::UnknownPawn(*pawn_id))?;
            if pawn.team().is_some() {
                return Err(WorldError::PawnAlreadyOwned(*pawn_id));
            }
        }

        for pawn_id in &team.pawn_ids {
            if let Some(pawn) = self.pawns.get_mut(pawn_id) {
                pawn.set_team(id);
            }
        }
        team.id = Some(id);
        self.teams.insert(id, team);
        self.turn_order.push(id);
        Ok(id)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// The local player's identity.
    #[must_use]
    pub fn local_player(&self) -> &Player {
        &self.local_player
    }

    /// Whether this world is the hosting or joining side.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Look up a pawn by id.
    #[must_use]
    pub fn pawn(&self, id: NetId) -> Option<&Pawn> {
        self.pawns.get(&id)
    }

    /// Look up a team by id.
    #[must_use]
    pub fn team(&self, id: NetId) -> Option<&Team> {
        self.teams.get(&id)
    }

    /// All pawns, in id order.
    pub fn pawns(&self) -> impl Iterator<Item = &Pawn> {
        self.pawns.values()
    }

    /// All teams, in id order.
    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Count of turn-advancing actions applied so far.
    #[must_use]
    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    /// The replicated team turn order.
    #[must_use]
    pub fn turn_order(&self) -> &[NetId] {
        &self.turn_order
    }

    /// Every action applied so far, in application order.
    #[must_use]
    pub fn history(&self) -> &[PlayerAction] {
        &self.history
    }

    /// The team whose turn it is, rotating through the turn order.
    #[must_use]
    pub fn current_turn_team(&self) -> Option<&Team> {
        if self.turn_order.is_empty() {
            return None;
        }
        let idx = (self.turn_count % self.turn_order.len() as u64) as usize;
        self.teams.get(&self.turn_order[idx])
    }

    /// Returns `true` once every registered team has a controller.
    #[must_use]
    pub fn match_is_ready(&self) -> bool {
        !self.teams.is_empty() && self.teams.values().all(Team::is_assigned)
    }

    /// Returns `true` if the local player controls the team whose turn it
    /// is. Evaluated fresh on every call — controllers are assigned
    /// asynchronously by the handshake.
    #[must_use]
    pub fn has_local_turn(&self) -> bool {
        self.local_turn_team().is_some()
    }

    /// The current team's id, iff the match is ready and the local player
    /// controls it.
    fn local_turn_team(&self) -> Option<NetId> {
        if !self.match_is_ready() {
            return None;
        }
        let team = self.current_turn_team()?;
        let controller = team.controller.as_ref()?;
        if controller.id == self.local_player.id {
            team.id
        } else {
            None
        }
    }

    // ── Input wrapping ──────────────────────────────────────────────────

    /// Wrap a local move input into an action and play it.
    ///
    /// Returns `Ok(false)` without side effects when it is not the local
    /// player's turn — input gating, not an error.
    ///
    /// # Errors
    ///
    /// Propagates consistency violations from application.
    pub fn play_move(&mut self, pawn_id: NetId, target: Vec3) -> Result<bool, WorldError> {
        let Some(team_id) = self.local_turn_team() else {
            debug!("move input ignored, not the local turn");
            return Ok(false);
        };
        let action = PlayerAction::Move {
            meta: self.new_meta(),
            team_id,
            pawn_id,
            target,
        };
        self.play_action(action)?;
        Ok(true)
    }

    /// Wrap a local attack input into an action and play it.
    ///
    /// Returns `Ok(false)` without side effects when it is not the local
    /// player's turn.
    ///
    /// # Errors
    ///
    /// Propagates consistency violations from application.
    pub fn play_attack(&mut self, pawn_id: NetId, target_id: NetId) -> Result<bool, WorldError> {
        if self.local_turn_team().is_none() {
            debug!("attack input ignored, not the local turn");
            return Ok(false);
        }
        let action = PlayerAction::Attack {
            meta: self.new_meta(),
            pawn_id,
            target_id,
        };
        self.play_action(action)?;
        Ok(true)
    }

    /// Metadata stamped onto locally originated actions.
    fn new_meta(&self) -> ActionMeta {
        ActionMeta {
            turn: self.turn_count,
            player_id: self.local_player.id.clone(),
        }
    }

    // ── Replication ─────────────────────────────────────────────────────

    /// Play a locally originated action: queue it for broadcast, then apply
    /// it locally. Both paths converge on [`play_action_local`], so the
    /// local history sees the action in the same position a remote copy
    /// will.
    ///
    /// # Errors
    ///
    /// Propagates consistency violations from application.
    pub fn play_action(&mut self, action: PlayerAction) -> Result<(), WorldError> {
        self.outbox.push_back(action.clone());
        self.play_action_local(action)
    }

    /// Apply one action to the local state, identically regardless of
    /// origin.
    ///
    /// A successfully applied action is appended to the history and, for
    /// the turn-advancing kinds, advances the turn counter. A failed action
    /// leaves the world fully untouched — a partial application would be
    /// worse than none, since it could never be reconciled with the peer.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] consistency violation when the action
    /// references an entity this registry does not know. Callers must
    /// surface it and stop; it means the two participants have diverged.
    pub fn play_action_local(&mut self, action: PlayerAction) -> Result<(), WorldError> {
        if let Some(meta) = action.meta()
            && meta.turn != self.turn_count
        {
            // A skew here does not fail the action, but it is the earliest
            // visible symptom of divergence, so make it loud.
            warn!(
                local_turn = self.turn_count,
                action_turn = meta.turn,
                kind = action.kind(),
                "action turn metadata disagrees with local turn count"
            );
        }

        match &action {
            PlayerAction::Move {
                pawn_id, target, ..
            } => {
                let pawn = self
                    .pawns
                    .get_mut(pawn_id)
                    .ok_or(WorldError::UnknownPawn(*pawn_id))?;
                pawn.set_target_position(*target);
            }
            PlayerAction::Attack { target_id, .. } => {
                let target = self
                    .pawns
                    .get_mut(target_id)
                    .ok_or(WorldError::UnknownPawn(*target_id))?;
                target.apply_damage(ATTACK_DAMAGE);
            }
            PlayerAction::Cast { .. } => {
                // Spends the turn; the vocabulary carries no effect payload
                // for casts yet.
            }
            PlayerAction::JoinRequest { player } => {
                // Only the host seats players; everyone else keeps the
                // request as history and waits for `AssignPlayers`.
                if self.role == Role::Host {
                    self.record_join_request(player);
                }
            }
            PlayerAction::AssignPlayers {
                assignments,
                turn_order,
            } => {
                self.apply_assignments(assignments, turn_order)?;
            }
            PlayerAction::None => {}
        }

        let advances = action.advances_turn();
        let was_join = matches!(action, PlayerAction::JoinRequest { .. });
        debug!(kind = action.kind(), turn = self.turn_count, "action applied");
        self.history.push(action);
        if advances {
            self.turn_count += 1;
        }

        // Host-only arbitration: a join request may complete the seating.
        if was_join && self.role == Role::Host {
            self.try_assign_players()?;
        }
        Ok(())
    }

    /// Drain the queue of locally originated actions awaiting broadcast.
    pub fn drain_outbox(&mut self) -> Vec<PlayerAction> {
        self.outbox.drain(..).collect()
    }

    /// Advance non-replicated presentation state (movement interpolation).
    pub fn update(&mut self, dt: f32) {
        for pawn in self.pawns.values_mut() {
            pawn.update(dt);
        }
    }

    // ── Join handshake (host side) ──────────────────────────────────────

    /// Remember a requester until enough players are present to seat
    /// everyone. The host's own identity and already-seated players are
    /// ignored, as are duplicate requests.
    fn record_join_request(&mut self, player: &Player) {
        if player.id == self.local_player.id {
            return;
        }
        if self.pending_joiners.iter().any(|p| p.id == player.id) {
            return;
        }
        let already_seated = self
            .teams
            .values()
            .any(|t| t.controller.as_ref().is_some_and(|c| c.id == player.id));
        if already_seated {
            return;
        }
        debug!(player = %player.id, "join request recorded");
        self.pending_joiners.push(player.clone());
    }

    /// If every unassigned team can now get a distinct player, synthesize
    /// the `assign_players` action and play it — broadcast and applied
    /// everywhere, the host included.
    fn try_assign_players(&mut self) -> Result<(), WorldError> {
        let unassigned: Vec<NetId> = self
            .turn_order
            .iter()
            .copied()
            .filter(|id| self.teams.get(id).is_some_and(|t| !t.is_assigned()))
            .collect();
        if unassigned.is_empty() {
            return Ok(());
        }

        let host_is_seated = self
            .teams
            .values()
            .any(|t| t.controller.as_ref().is_some_and(|c| c.id == self.local_player.id));

        let mut players = Vec::new();
        if !host_is_seated {
            players.push(self.local_player.clone());
        }
        players.extend(self.pending_joiners.iter().cloned());

        if players.len() < unassigned.len() {
            debug!(
                seats = unassigned.len(),
                players = players.len(),
                "waiting for more join requests before assigning"
            );
            return Ok(());
        }

        let assignments: Vec<Assignment> = unassigned
            .into_iter()
            .zip(players)
            .map(|(team_id, player)| Assignment { player, team_id })
            .collect();

        self.play_action(PlayerAction::AssignPlayers {
            assignments,
            turn_order: self.turn_order.clone(),
        })
    }

    /// Apply an `assign_players` action: adopt the replicated turn order and
    /// bind every listed controller. Validated in full before any mutation.
    fn apply_assignments(
        &mut self,
        assignments: &[Assignment],
        turn_order: &[NetId],
    ) -> Result<(), WorldError> {
        for assignment in assignments {
            if !self.teams.contains_key(&assignment.team_id) {
                return Err(WorldError::UnknownTeam(assignment.team_id));
            }
        }
        for team_id in turn_order {
            if !self.teams.contains_key(team_id) {
                return Err(WorldError::UnknownTeam(*team_id));
            }
        }

        self.turn_order = turn_order.to_vec();
        for assignment in assignments {
            if let Some(team) = self.teams.get_mut(&assignment.team_id) {
                debug!(
                    team = %assignment.team_id,
                    player = %assignment.player.id,
                    "controller assigned"
                );
                team.controller = Some(assignment.player.clone());
            }
            self.pending_joiners
                .retain(|p| p.id != assignment.player.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use winterboard_core::HashId;

    use super::*;

    fn player(tag: &str) -> Player {
        Player {
            id: HashId::from_string(tag),
            name: tag.to_string(),
        }
    }

    fn cast(world: &GameWorld, by: &Player) -> PlayerAction {
        PlayerAction::Cast {
            meta: ActionMeta {
                turn: world.turn_count(),
                player_id: by.id.clone(),
            },
        }
    }

    /// Two teams of two pawns each, in a fixed script order.
    fn two_team_world(local: Player, role: Role) -> GameWorld {
        let mut world = GameWorld::new(local, role);
        let mut pawn_ids = Vec::new();
        for (name, x) in [("Scar", 0.0), ("Hades", 1.0), ("Maleficent", 6.0), ("Thumper", 7.0)] {
            let id = world
                .spawn_pawn(Pawn::new(name, Vec3::new(x, 0.0, 0.0)))
                .unwrap();
            pawn_ids.push(id);
        }
        world.spawn_team(Team::new(vec![pawn_ids[0], pawn_ids[1]])).unwrap();
        world.spawn_team(Team::new(vec![pawn_ids[2], pawn_ids[3]])).unwrap();
        world
    }

    fn assign_both(world: &mut GameWorld, first: &Player, second: &Player) {
        world
            .play_action_local(PlayerAction::AssignPlayers {
                assignments: vec![
                    Assignment {
                        player: first.clone(),
                        team_id: NetId(0),
                    },
                    Assignment {
                        player: second.clone(),
                        team_id: NetId(1),
                    },
                ],
                turn_order: vec![NetId(0), NetId(1)],
            })
            .unwrap();
    }

    #[test]
    fn test_pawn_id_allocation_monotonic() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        for expected in 0..4u32 {
            let id = world.spawn_pawn(Pawn::new("x", Vec3::ZERO)).unwrap();
            assert_eq!(id, NetId(expected));
        }
    }

    #[test]
    fn test_pawn_id_allocation_after_explicit_id() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        world
            .spawn_pawn(Pawn::new("x", Vec3::ZERO).with_id(NetId(5)))
            .unwrap();
        let id = world.spawn_pawn(Pawn::new("y", Vec3::ZERO)).unwrap();
        assert_eq!(id, NetId(6));
    }

    #[test]
    fn test_duplicate_pawn_id_fails_without_mutation() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        world
            .spawn_pawn(Pawn::new("x", Vec3::ZERO).with_id(NetId(0)))
            .unwrap();
        let err = world
            .spawn_pawn(Pawn::new("y", Vec3::ZERO).with_id(NetId(0)))
            .unwrap_err();
        assert_eq!(err, WorldError::DuplicatePawnId(NetId(0)));
        assert_eq!(world.pawns().count(), 1);
        assert_eq!(world.pawn(NetId(0)).unwrap().name, "x");
    }

    #[test]
    fn test_team_rejects_unknown_pawn() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        let err = world.spawn_team(Team::new(vec![NetId(9)])).unwrap_err();
        assert_eq!(err, WorldError::UnknownPawn(NetId(9)));
        assert!(world.turn_order().is_empty());
    }

    #[test]
    fn test_team_rejects_already_owned_pawn() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        let pawn = world.spawn_pawn(Pawn::new("x", Vec3::ZERO)).unwrap();
        world.spawn_team(Team::new(vec![pawn])).unwrap();

        let err = world.spawn_team(Team::new(vec![pawn])).unwrap_err();
        assert_eq!(err, WorldError::PawnAlreadyOwned(pawn));
        assert_eq!(world.teams().count(), 1);
        assert_eq!(world.turn_order().len(), 1);
    }

    #[test]
    fn test_team_rejects_pawn_listed_twice() {
        let mut world = GameWorld::new(player("p1"), Role::Host);
        let pawn = world.spawn_pawn(Pawn::new("x", Vec3::ZERO)).unwrap();

        let err = world.spawn_team(Team::new(vec![pawn, pawn])).unwrap_err();
        assert_eq!(err, WorldError::PawnAlreadyOwned(pawn));
        assert_eq!(world.teams().count(), 0);
        assert!(world.turn_order().is_empty());
        assert!(world.pawn(pawn).unwrap().team().is_none());
    }

    #[test]
    fn test_turn_rotation() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        for k in 0u64..7 {
            assert_eq!(world.turn_count(), k);
            let team = world.current_turn_team().unwrap();
            assert_eq!(team.id, Some(NetId((k % 2) as u32)));
            world.play_action_local(cast(&world, &p1)).unwrap();
        }
    }

    #[test]
    fn test_has_local_turn_alternates() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        assert!(world.has_local_turn());
        world.play_action_local(cast(&world, &p1)).unwrap();
        assert!(!world.has_local_turn());
        world.play_action_local(cast(&world, &p2)).unwrap();
        assert!(world.has_local_turn());
    }

    #[test]
    fn test_input_gated_while_any_team_unassigned() {
        let p1 = player("p1");
        let mut world = two_team_world(p1.clone(), Role::Host);

        // team0 assigned to the local player, team1 still unassigned.
        world
            .play_action_local(PlayerAction::AssignPlayers {
                assignments: vec![Assignment {
                    player: p1,
                    team_id: NetId(0),
                }],
                turn_order: vec![NetId(0), NetId(1)],
            })
            .unwrap();

        assert!(!world.match_is_ready());
        assert!(!world.has_local_turn());

        let played = world.play_move(NetId(0), Vec3::ONE).unwrap();
        assert!(!played);
        assert!(world.drain_outbox().is_empty());
        assert_eq!(world.turn_count(), 0);
    }

    #[test]
    fn test_move_sets_target_and_advances_turn() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        let played = world.play_move(NetId(0), Vec3::new(3.0, 0.0, 4.0)).unwrap();
        assert!(played);
        assert_eq!(world.turn_count(), 1);
        assert_eq!(
            world.pawn(NetId(0)).unwrap().move_target(),
            Some(Vec3::new(3.0, 0.0, 4.0))
        );

        // The broadcast copy is queued for the session driver.
        let outbox = world.drain_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].kind(), "move");
    }

    #[test]
    fn test_move_unknown_pawn_is_fatal_and_atomic() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);
        let history_len = world.history().len();

        let err = world
            .play_action_local(PlayerAction::Move {
                meta: ActionMeta {
                    turn: world.turn_count(),
                    player_id: p1.id.clone(),
                },
                team_id: NetId(0),
                pawn_id: NetId(999),
                target: Vec3::ZERO,
            })
            .unwrap_err();

        assert_eq!(err, WorldError::UnknownPawn(NetId(999)));
        assert_eq!(world.turn_count(), 0);
        assert_eq!(world.history().len(), history_len);
    }

    #[test]
    fn test_attack_applies_fixed_damage() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        let played = world.play_attack(NetId(0), NetId(2)).unwrap();
        assert!(played);
        assert_eq!(world.turn_count(), 1);
        assert_eq!(
            world.pawn(NetId(2)).unwrap().health,
            crate::pawn::MAX_HEALTH - ATTACK_DAMAGE
        );
    }

    #[test]
    fn test_assign_players_unknown_team_fully_rejected() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);

        let err = world
            .play_action_local(PlayerAction::AssignPlayers {
                assignments: vec![
                    Assignment {
                        player: p1,
                        team_id: NetId(0),
                    },
                    Assignment {
                        player: p2,
                        team_id: NetId(42),
                    },
                ],
                turn_order: vec![NetId(0), NetId(1)],
            })
            .unwrap_err();

        assert_eq!(err, WorldError::UnknownTeam(NetId(42)));
        // No partial assignment: team0 must still be unassigned.
        assert!(!world.team(NetId(0)).unwrap().is_assigned());
        assert!(world.history().is_empty());
    }

    #[test]
    fn test_join_handshake_convergence() {
        let host_player = player("host");
        let joiner = player("joiner");

        // Identically registered worlds on both sides.
        let mut host = two_team_world(host_player.clone(), Role::Host);
        let mut replica = two_team_world(joiner.clone(), Role::Client);

        // The joiner originates the request: applied locally, then queued.
        replica
            .play_action(PlayerAction::JoinRequest {
                player: joiner.clone(),
            })
            .unwrap();
        let mut sent = replica.drain_outbox();
        assert_eq!(sent.len(), 1);

        // The host applies the request and synthesizes the assignment.
        host.play_action_local(sent.remove(0)).unwrap();
        let mut broadcast = host.drain_outbox();
        assert_eq!(broadcast.len(), 1);
        assert_eq!(broadcast[0].kind(), "assign_players");

        // The replica applies the broadcast assignment.
        replica.play_action_local(broadcast.remove(0)).unwrap();

        // Both sides converge on identical (team, controller) pairs and the
        // same replicated turn order.
        assert!(host.match_is_ready());
        assert!(replica.match_is_ready());
        assert_eq!(host.turn_order(), replica.turn_order());
        for id in [NetId(0), NetId(1)] {
            let host_controller = host.team(id).unwrap().controller.clone().unwrap();
            let replica_controller = replica.team(id).unwrap().controller.clone().unwrap();
            assert_eq!(host_controller.id, replica_controller.id);
        }
        assert_eq!(
            host.team(NetId(0)).unwrap().controller.as_ref().unwrap().id,
            host_player.id
        );
        assert_eq!(
            host.team(NetId(1)).unwrap().controller.as_ref().unwrap().id,
            joiner.id
        );

        // Exactly one side has the turn.
        assert!(host.has_local_turn());
        assert!(!replica.has_local_turn());
    }

    #[test]
    fn test_host_waits_for_enough_requesters() {
        let host_player = player("host");
        let mut world = GameWorld::new(host_player, Role::Host);
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                world
                    .spawn_pawn(Pawn::new(format!("p{i}"), Vec3::ZERO))
                    .unwrap(),
            );
        }
        for id in ids {
            world.spawn_team(Team::new(vec![id])).unwrap();
        }

        // Three teams, one requester plus the host: not enough yet.
        world
            .play_action_local(PlayerAction::JoinRequest {
                player: player("joiner-a"),
            })
            .unwrap();
        assert!(!world.match_is_ready());
        assert!(world.drain_outbox().is_empty());

        // The second requester completes the seating.
        world
            .play_action_local(PlayerAction::JoinRequest {
                player: player("joiner-b"),
            })
            .unwrap();
        assert!(world.match_is_ready());
        let broadcast = world.drain_outbox();
        assert_eq!(broadcast.len(), 1);
        assert_eq!(broadcast[0].kind(), "assign_players");
    }

    #[test]
    fn test_duplicate_join_requests_ignored() {
        let host_player = player("host");
        let joiner = player("joiner");
        let mut world = two_team_world(host_player.clone(), Role::Host);

        world
            .play_action_local(PlayerAction::JoinRequest {
                player: joiner.clone(),
            })
            .unwrap();
        assert!(world.match_is_ready());

        // A replayed request after seating changes nothing.
        world
            .play_action_local(PlayerAction::JoinRequest { player: joiner })
            .unwrap();
        assert!(world.drain_outbox().len() <= 1);
        assert_eq!(
            world.teams().filter(|t| t.is_assigned()).count(),
            2
        );
    }

    #[test]
    fn test_client_keeps_join_requests_as_history_only() {
        let local = player("p2");
        let mut world = two_team_world(local.clone(), Role::Client);

        world
            .play_action_local(PlayerAction::JoinRequest {
                player: player("p3"),
            })
            .unwrap();

        // The request lands in history but does not queue a joiner; seating
        // is the host's job.
        assert_eq!(world.history().last().map(PlayerAction::kind), Some("join_request"));
        assert!(world.pending_joiners.is_empty());
        assert!(world.drain_outbox().is_empty());
    }

    #[test]
    fn test_determinism_of_replay() {
        let p1 = player("p1");
        let p2 = player("p2");

        let script = vec![
            PlayerAction::AssignPlayers {
                assignments: vec![
                    Assignment {
                        player: p1.clone(),
                        team_id: NetId(0),
                    },
                    Assignment {
                        player: p2.clone(),
                        team_id: NetId(1),
                    },
                ],
                turn_order: vec![NetId(0), NetId(1)],
            },
            PlayerAction::Move {
                meta: ActionMeta {
                    turn: 0,
                    player_id: p1.id.clone(),
                },
                team_id: NetId(0),
                pawn_id: NetId(1),
                target: Vec3::new(2.0, 0.0, 2.0),
            },
            PlayerAction::Attack {
                meta: ActionMeta {
                    turn: 1,
                    player_id: p2.id.clone(),
                },
                pawn_id: NetId(2),
                target_id: NetId(0),
            },
            PlayerAction::Cast {
                meta: ActionMeta {
                    turn: 2,
                    player_id: p1.id.clone(),
                },
            },
            PlayerAction::None,
        ];

        // Independently constructed, identically registered, different
        // local players — the replicated state must still converge.
        let mut a = two_team_world(p1.clone(), Role::Host);
        let mut b = two_team_world(p2.clone(), Role::Client);
        for action in &script {
            a.play_action_local(action.clone()).unwrap();
            b.play_action_local(action.clone()).unwrap();
        }

        assert_eq!(a.turn_count(), b.turn_count());
        assert_eq!(a.turn_order(), b.turn_order());
        assert_eq!(a.history(), b.history());
        assert!(a.pawns().eq(b.pawns()));
        assert!(a.teams().eq(b.teams()));
    }

    #[test]
    fn test_history_records_every_applied_action() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        world.play_action_local(PlayerAction::None).unwrap();
        world.play_action_local(cast(&world, &p1)).unwrap();

        let kinds: Vec<&str> = world.history().iter().map(PlayerAction::kind).collect();
        assert_eq!(kinds, vec!["assign_players", "none", "cast"]);
    }

    #[test]
    fn test_world_update_interpolates_pawns() {
        let p1 = player("p1");
        let p2 = player("p2");
        let mut world = two_team_world(p1.clone(), Role::Host);
        assign_both(&mut world, &p1, &p2);

        world.play_move(NetId(0), Vec3::new(10.0, 0.0, 0.0)).unwrap();
        let before = world.pawn(NetId(0)).unwrap().position;
        world.update(0.5);
        let after = world.pawn(NetId(0)).unwrap().position;
        assert!(after.x > before.x);
        // Replicated counters untouched by presentation updates.
        assert_eq!(world.turn_count(), 1);
    }
}
