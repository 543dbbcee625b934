//! The fixed level script.
//!
//! World content is constructed from a fixed, non-randomized script before
//! the session attaches, on both participants — registries must agree
//! before any action is exchanged, and this is where that is guaranteed.

use winterboard_core::{Player, Vec3};
use winterboard_net::{Assignment, PlayerAction};
use winterboard_world::{GameWorld, Pawn, Role, Team, WorldError};

/// Board dimensions, in tiles.
const BOARD_SIZE: i32 = 8;
/// World-space edge length of one tile.
const TILE_SIZE: f32 = 1.0;
/// Movement speed shared by every hero pawn.
const HERO_MOVE_SPEED: f32 = 5.0;

/// The two fixed rosters, placed on opposite home rows.
const TEAM_A: [&str; 3] = ["Scar", "Hades", "Captain Hook"];
const TEAM_B: [&str; 3] = ["Maleficent", "Thumper", "Mulan"];

/// World-space anchor of the tile at `(x, z)`, board centred on the origin.
fn tile_anchor(x: i32, z: i32) -> Vec3 {
    Vec3::new(
        (x as f32 - BOARD_SIZE as f32 / 2.0 + 0.5) * TILE_SIZE,
        0.0,
        (z as f32 - BOARD_SIZE as f32 / 2.0 + 0.5) * TILE_SIZE,
    )
}

/// Build the standard two-team level.
///
/// With `player_count == 1` both teams are assigned to the local player
/// immediately (hot-seat play); otherwise controllers stay unset until the
/// join handshake seats everyone.
///
/// # Errors
///
/// Returns a [`WorldError`] if registration fails — with this fixed script
/// that would be a bug, not a runtime condition.
pub fn create_level(
    local_player: &Player,
    player_count: usize,
    role: Role,
) -> Result<GameWorld, WorldError> {
    let mut world = GameWorld::new(local_player.clone(), role);

    let mut team_a = Vec::new();
    for (i, name) in TEAM_A.iter().enumerate() {
        let pawn = Pawn::new(*name, tile_anchor(i as i32 + 2, 0))
            .with_move_speed(HERO_MOVE_SPEED);
        team_a.push(world.spawn_pawn(pawn)?);
    }

    let mut team_b = Vec::new();
    for (i, name) in TEAM_B.iter().enumerate() {
        let pawn = Pawn::new(*name, tile_anchor(i as i32 + 2, BOARD_SIZE - 1))
            .with_move_speed(HERO_MOVE_SPEED);
        team_b.push(world.spawn_pawn(pawn)?);
    }

    let team_a_id = world.spawn_team(Team::new(team_a))?;
    let team_b_id = world.spawn_team(Team::new(team_b))?;

    if player_count == 1 {
        world.play_action_local(PlayerAction::AssignPlayers {
            assignments: vec![
                Assignment {
                    player: local_player.clone(),
                    team_id: team_a_id,
                },
                Assignment {
                    player: local_player.clone(),
                    team_id: team_b_id,
                },
            ],
            turn_order: world.turn_order().to_vec(),
        })?;
    }

    Ok(world)
}
