//! # winterboard — match binary
//!
//! Hosts or joins a two-player match over a NATS data channel and drives
//! the replicated world, or plays a solo match with no session at all:
//!
//! ```text
//! winterboard host <session> [player-name]
//! winterboard join <session> [player-name]
//! winterboard solo [player-name]
//! ```
//!
//! The NATS URL comes from the `NATS_URL` environment variable (default
//! `nats://localhost:4222`). Rendering and input are external collaborators;
//! this binary composes the peer session with the game world, runs the
//! handshake, and ticks presentation state.

mod level;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use winterboard_core::Player;
use winterboard_net::{PeerSession, PlayerAction, SessionConfig, SessionEvent};
use winterboard_world::{GameWorld, Role};

/// Presentation tick rate.
const TICK_RATE: f64 = 30.0;

/// A parsed invocation.
#[derive(Debug, PartialEq)]
enum Command {
    Host {
        session: String,
        player: Option<String>,
    },
    Join {
        session: String,
        player: Option<String>,
    },
    Solo {
        player: Option<String>,
    },
}

fn parse_args(args: &[String]) -> Option<Command> {
    match (args.first().map(String::as_str), args.get(1)) {
        (Some("host"), Some(session)) => Some(Command::Host {
            session: session.clone(),
            player: args.get(2).cloned(),
        }),
        (Some("join"), Some(session)) => Some(Command::Join {
            session: session.clone(),
            player: args.get(2).cloned(),
        }),
        (Some("solo"), _) => Some(Command::Solo {
            player: args.get(1).cloned(),
        }),
        _ => None,
    }
}

fn local_player(name: Option<String>) -> Player {
    match name {
        Some(name) => Player::new(name),
        None => Player::anonymous(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("winterboard_app=info".parse()?)
                .add_directive("winterboard_net=info".parse()?)
                .add_directive("winterboard_world=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("usage: winterboard <host|join> <session> [player-name] | solo [player-name]");
        std::process::exit(2);
    };

    match command {
        Command::Host { session, player } => run(Role::Host, &session, player).await,
        Command::Join { session, player } => run(Role::Client, &session, player).await,
        Command::Solo { player } => run_solo(player).await,
    }
}

/// Set up the world and session, then drive the event/tick loop until
/// ctrl-c or a fatal consistency violation.
async fn run(role: Role, session_name: &str, player_name: Option<String>) -> Result<()> {
    let local_player = local_player(player_name);
    info!(
        player = %local_player.id,
        name = local_player.name,
        ?role,
        "starting match"
    );

    // World content comes from the fixed script before the session attaches,
    // so both participants' registries agree before any action is exchanged.
    let mut world = level::create_level(&local_player, 2, role)?;

    let config = SessionConfig::new();
    let (session, mut events) = match role {
        Role::Host => PeerSession::host(session_name, &config).await?,
        Role::Client => PeerSession::join(session_name, &config, None).await?,
    };
    info!(address = session.local_address(), "session up");

    let tick = Duration::from_secs_f64(1.0 / TICK_RATE);
    let mut interval = tokio::time::interval(tick);
    let mut logged_turn = u64::MAX;

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break Ok(());
            }
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("session event channel closed");
                    break Ok(());
                };
                // Consistency violations are fatal: the registries have
                // diverged and continuing would entrench it.
                if let Err(e) = handle_event(&mut world, &session, event).await {
                    break Err(e);
                }
            }
            _ = interval.tick() => {
                world.update(tick.as_secs_f32());
                if let Err(e) = flush_outbox(&mut world, &session).await {
                    break Err(e);
                }
                if world.turn_count() != logged_turn {
                    logged_turn = world.turn_count();
                    info!(
                        turn = world.turn_count(),
                        ready = world.match_is_ready(),
                        local_turn = world.has_local_turn(),
                        "state"
                    );
                }
            }
        }
    };

    session.dispose().await;
    outcome
}

/// Drive a solo match: one local player controlling every team, no
/// session and nothing to broadcast.
async fn run_solo(player_name: Option<String>) -> Result<()> {
    let local_player = local_player(player_name);
    info!(
        player = %local_player.id,
        name = local_player.name,
        "starting solo match"
    );

    let mut world = level::create_level(&local_player, 1, Role::Host)?;

    let tick = Duration::from_secs_f64(1.0 / TICK_RATE);
    let mut interval = tokio::time::interval(tick);
    let mut logged_turn = u64::MAX;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break Ok(());
            }
            _ = interval.tick() => {
                world.update(tick.as_secs_f32());
                // No peers to notify.
                world.drain_outbox();
                if world.turn_count() != logged_turn {
                    logged_turn = world.turn_count();
                    info!(
                        turn = world.turn_count(),
                        local_turn = world.has_local_turn(),
                        "state"
                    );
                }
            }
        }
    }
}

/// Apply one session event to the world and flush anything it produced.
async fn handle_event(
    world: &mut GameWorld,
    session: &PeerSession,
    event: SessionEvent,
) -> Result<()> {
    match event {
        SessionEvent::Ready => {
            info!(connections = session.connection_count(), "connection ready");
            // The joiner announces itself as soon as its connection opens;
            // the host answers with the assignment broadcast.
            if world.role() == Role::Client {
                world.play_action(PlayerAction::JoinRequest {
                    player: world.local_player().clone(),
                })?;
            }
        }
        SessionEvent::Action(action) => {
            world.play_action_local(action)?;
        }
        SessionEvent::PeerClosed(address) => {
            info!(peer = address, "peer left the session");
        }
        SessionEvent::Error(message) => {
            anyhow::bail!("session failed: {message}");
        }
    }
    flush_outbox(world, session).await
}

/// Broadcast every queued locally-originated action.
///
/// Per-connection delivery failures are handled inside the session; an
/// error here means the action could not be encoded at all.
async fn flush_outbox(world: &mut GameWorld, session: &PeerSession) -> Result<()> {
    for action in world.drain_outbox() {
        let recipients = session.send(&action).await?;
        if recipients == 0 {
            warn!(kind = action.kind(), "action had no recipients");
        }
    }
    Ok(())
}
