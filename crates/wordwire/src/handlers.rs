//! Standard request handlers and the collaborator traits they call into.
//!
//! The session layer never reaches into gameplay or menu state directly.
//! Everything it needs from the rest of the application comes through two
//! small traits — [`GameHooks`] for the running game, [`ConfigSource`] for
//! the menu configuration — implemented by the application and handed to
//! [`Session`](crate::Session) at construction.
//!
//! [`standard_registry`] wires those collaborators into the full handler
//! set a client connection answers with; [`host_registry`] is the subset
//! the server's router dispatches through (roster aggregation is stateful
//! and lives in the router itself, and a game-start request from a joiner
//! is deliberately left to the no-op fallback — only the host may start).

use std::sync::Arc;

use tracing::{info, trace};
use wordwire_protocol::{MessageKind, Request, Response};
use wordwire_transport::{HandlerError, HandlerRegistry};

/// What the session layer needs from the running game.
///
/// Methods are called from background worker threads, so implementations
/// must be thread-safe and `start_game` must not block.
pub trait GameHooks: Send + Sync {
    /// Whether a game is currently in progress locally.
    fn is_running(&self) -> bool;

    /// A snapshot of the local player's live state.
    fn local_player(&self) -> wordwire_protocol::PlayerSnapshot;

    /// Start the local game in response to a remote `GameStart` signal.
    fn start_game(&self);
}

/// What the session layer needs from the menu/configuration side.
pub trait ConfigSource: Send + Sync {
    /// The current session configuration snapshot.
    fn current(&self) -> wordwire_protocol::SessionConfig;
}

/// The handler set every client connection answers inbound requests with.
pub fn standard_registry(
    hooks: Arc<dyn GameHooks>,
    config: Arc<dyn ConfigSource>,
) -> HandlerRegistry {
    HandlerRegistry::new()
        .with(MessageKind::WordUnit, word_echo())
        .with(
            MessageKind::PlayerState,
            player_state(Arc::clone(&hooks), Arc::clone(&config)),
        )
        .with(MessageKind::Configuration, configuration(config))
        .with(MessageKind::GameStart, game_start(hooks))
}

/// The handler set the server's router dispatches through.
///
/// No `PlayersList` entry: roster aggregation needs the peer registry and
/// is handled inside the router. No `GameStart` entry either, so a joiner
/// trying to start the game falls through to the no-op fallback.
pub fn host_registry(config: Arc<dyn ConfigSource>) -> HandlerRegistry {
    HandlerRegistry::new()
        .with(MessageKind::WordUnit, word_echo())
        .with(MessageKind::Configuration, configuration(config))
}

/// Echoes the enclosed word back. Who receives the echo is the router's
/// decision, not the handler's.
fn word_echo()
-> impl Fn(&Request) -> Result<Option<Response>, HandlerError> + Send + Sync {
    |request| match request.word() {
        Some(word) => Ok(Some(Response::word_unit(word.clone()))),
        None => Err(wrong_kind(MessageKind::WordUnit, request)),
    }
}

/// Answers with the live local snapshot while a game runs, otherwise with
/// a fresh snapshot synthesized from the configuration.
fn player_state(
    hooks: Arc<dyn GameHooks>,
    config: Arc<dyn ConfigSource>,
) -> impl Fn(&Request) -> Result<Option<Response>, HandlerError> + Send + Sync
{
    move |request| {
        expect_kind(MessageKind::PlayerState, request)?;
        let player = if hooks.is_running() {
            hooks.local_player()
        } else {
            config.current().player()
        };
        Ok(Some(Response::player_state(player)))
    }
}

fn configuration(
    config: Arc<dyn ConfigSource>,
) -> impl Fn(&Request) -> Result<Option<Response>, HandlerError> + Send + Sync
{
    move |request| {
        expect_kind(MessageKind::Configuration, request)?;
        Ok(Some(Response::configuration(config.current())))
    }
}

/// One-way notification: triggers the start hook and produces no response.
fn game_start(
    hooks: Arc<dyn GameHooks>,
) -> impl Fn(&Request) -> Result<Option<Response>, HandlerError> + Send + Sync
{
    move |request| {
        expect_kind(MessageKind::GameStart, request)?;
        if hooks.is_running() {
            trace!("game already running, ignoring start signal");
        } else {
            info!("starting game on remote signal");
            hooks.start_game();
        }
        Ok(None)
    }
}

fn expect_kind(
    expected: MessageKind,
    request: &Request,
) -> Result<(), HandlerError> {
    if request.kind() == expected {
        Ok(())
    } else {
        Err(wrong_kind(expected, request))
    }
}

fn wrong_kind(expected: MessageKind, request: &Request) -> HandlerError {
    HandlerError::WrongKind { expected, got: request.kind() }
}

// =========================================================================
// Tests
// =========================================================================
