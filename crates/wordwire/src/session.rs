//! The session façade.
//!
//! A [`Session`] is the one object the rest of the application drives the
//! network through, hiding the host/join role difference. It has exactly
//! two shapes:
//!
//! - **Joined** — one client [`Connection`] to a remote host;
//! - **Hosting** — a [`Server`] bound to a local port, plus a perfectly
//!   ordinary client connection the host opens to its own address.
//!
//! The self-connecting host is the point: because the host participates in
//! its own session as a regular client, exactly one code path produces and
//! consumes session messages regardless of role. There is no "am I the
//! host" branch anywhere below this module.
//!
//! A session is an explicit object owned by the application's composition
//! root; construct it with [`host`](Session::host) or
//! [`join`](Session::join), tear it down with [`stop`](Session::stop).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};
use wordwire_protocol::{
    MessageKind, PlayerSnapshot, Request, Response, SessionConfig, Word,
    validate_player_name,
};
use wordwire_transport::Connection;

use crate::handlers::{ConfigSource, GameHooks, host_registry, standard_registry};
use crate::server::{Server, ServerConfig};
use crate::{SessionError, WordwireError};

/// Bounded wait for the TCP connect during session bootstrap.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bounded wait for one round-trip query. Generous enough to cover
/// a full roster recompute on the server side.
const ROUND_TRIP_WAIT: Duration = Duration::from_secs(3);

enum Role {
    Hosting { server: Server },
    Joined,
}

/// One live multiplayer session, hosting or joined.
pub struct Session {
    role: Role,
    connection: Connection,
    round_trip_wait: Duration,
}

impl Session {
    /// Hosts a session on `port` (0 picks an ephemeral port) with default
    /// timing knobs.
    ///
    /// # Errors
    /// Fails on an invalid configured player name, an unbindable port, or
    /// a loopback connect failure.
    pub fn host(
        port: u16,
        hooks: Arc<dyn GameHooks>,
        config: Arc<dyn ConfigSource>,
    ) -> Result<Self, WordwireError> {
        Self::host_with(port, hooks, config, ServerConfig::default())
    }

    /// Hosts a session with explicit timing knobs.
    pub fn host_with(
        port: u16,
        hooks: Arc<dyn GameHooks>,
        config: Arc<dyn ConfigSource>,
        server_config: ServerConfig,
    ) -> Result<Self, WordwireError> {
        validate_player_name(&config.current().player_name)?;

        // Server first, then a plain client against its own bound address.
        let server = Server::bind(
            port,
            host_registry(Arc::clone(&config)),
            server_config,
        )?;
        let port = server.port();

        let connection = match Connection::connect(
            "127.0.0.1",
            port,
            standard_registry(hooks, config),
            CONNECT_TIMEOUT,
        ) {
            Ok(connection) => connection,
            Err(err) => {
                server.stop();
                return Err(err.into());
            }
        };
        if let Err(err) = connection.start() {
            connection.stop();
            server.stop();
            return Err(err.into());
        }

        info!(port, "hosting session");
        Ok(Self {
            role: Role::Hosting { server },
            connection,
            round_trip_wait: ROUND_TRIP_WAIT,
        })
    }

    /// Joins the session hosted at `address:port`.
    ///
    /// # Errors
    /// Fails on an invalid configured player name or if the host is
    /// unreachable; no background worker is left running on failure.
    pub fn join(
        address: &str,
        port: u16,
        hooks: Arc<dyn GameHooks>,
        config: Arc<dyn ConfigSource>,
    ) -> Result<Self, WordwireError> {
        validate_player_name(&config.current().player_name)?;

        let connection = Connection::connect(
            address,
            port,
            standard_registry(hooks, config),
            CONNECT_TIMEOUT,
        )?;
        if let Err(err) = connection.start() {
            connection.stop();
            return Err(err.into());
        }

        info!(host = %connection.peer_addr(), "joined session");
        Ok(Self {
            role: Role::Joined,
            connection,
            round_trip_wait: ROUND_TRIP_WAIT,
        })
    }

    /// Overrides the bounded wait used by the round-trip queries.
    pub fn set_round_trip_wait(&mut self, wait: Duration) {
        self.round_trip_wait = wait;
    }

    /// Sends one word into the session.
    ///
    /// The server fans it out to every other peer; the sender never gets
    /// its own word back.
    ///
    /// # Errors
    /// Surfaces connection faults; recoverable from the caller's side.
    pub fn send(&self, word: Word) -> Result<(), WordwireError> {
        trace!(%word, "sending word");
        self.connection.send(Request::word_unit(word))?;
        Ok(())
    }

    /// Pops the oldest word received from other players, if any.
    ///
    /// Never blocks and never errors, so UI-adjacent callers can poll it
    /// in a loop.
    pub fn try_receive_word(&self) -> Option<Word> {
        self.connection.try_receive(MessageKind::WordUnit)?.into_word()
    }

    /// Fetches the current roster from the host.
    ///
    /// Round trip: send a `PlayersList` request, wait (bounded) for the
    /// response. The host serves a cached roster inside its freshness
    /// window, so two calls in quick succession are cheap and identical.
    ///
    /// # Errors
    /// A connection fault, or a timeout if no response arrives.
    pub fn players_list(&self) -> Result<Vec<PlayerSnapshot>, WordwireError> {
        let response = self.round_trip(
            Request::players_list(),
            MessageKind::PlayersList,
        )?;
        response.into_players().ok_or_else(|| {
            SessionError::BadReply { kind: MessageKind::PlayersList }.into()
        })
    }

    /// Fetches the host's session configuration.
    ///
    /// # Errors
    /// A connection fault, or a timeout if no response arrives.
    pub fn configuration(&self) -> Result<SessionConfig, WordwireError> {
        let response = self.round_trip(
            Request::configuration(),
            MessageKind::Configuration,
        )?;
        response.into_config().ok_or_else(|| {
            SessionError::BadReply { kind: MessageKind::Configuration }.into()
        })
    }

    /// Size of the current roster, or 0 when it cannot be fetched.
    ///
    /// The sentinel keeps "not enough players yet" polling loops free of
    /// error handling.
    pub fn number_of_players(&self) -> usize {
        match self.players_list() {
            Ok(players) => players.len(),
            Err(err) => {
                debug!(error = %err, "roster unavailable");
                0
            }
        }
    }

    /// Broadcasts the start signal to every joined peer. Host only.
    ///
    /// The host's own loopback client is excluded: the host starts its
    /// game directly, not through its own notification.
    ///
    /// # Errors
    /// [`SessionError::NotHosting`] on a joined session.
    pub fn game_started(&self) -> Result<(), WordwireError> {
        let Role::Hosting { server } = &self.role else {
            return Err(SessionError::NotHosting.into());
        };

        let own = self.connection.local_addr();
        info!("broadcasting game start");
        server.send_all(&Request::game_start(), |peer| peer != own);
        Ok(())
    }

    /// True while this session hosts the server (rather than having
    /// joined someone else's).
    pub fn is_hosting(&self) -> bool {
        matches!(self.role, Role::Hosting { .. })
    }

    /// True while the session's own connection is up.
    pub fn is_running(&self) -> bool {
        match &self.role {
            Role::Hosting { server } => {
                server.is_running() && self.connection.is_running()
            }
            Role::Joined => self.connection.is_running(),
        }
    }

    /// The session's address: the bound local address when hosting, the
    /// host's address when joined.
    pub fn address(&self) -> SocketAddr {
        match &self.role {
            Role::Hosting { server } => server.local_addr(),
            Role::Joined => self.connection.peer_addr(),
        }
    }

    pub fn port(&self) -> u16 {
        self.address().port()
    }

    /// Tears the session down: client connection first, then the server
    /// when hosting. Idempotent; afterwards no background worker of this
    /// session is running.
    pub fn stop(&self) {
        self.connection.stop();
        if let Role::Hosting { server } = &self.role {
            server.stop();
        }
    }

    /// One request/response exchange of a single kind.
    ///
    /// Leftover responses of the kind (an earlier timed-out exchange, or
    /// an unsolicited roster push from the join notification) are drained
    /// first so the reply consumed is the reply to this request.
    fn round_trip(
        &self,
        request: Request,
        kind: MessageKind,
    ) -> Result<Response, WordwireError> {
        let stale = self.connection.drain_responses(kind);
        if stale > 0 {
            trace!(%kind, stale, "dropped stale responses before query");
        }

        self.connection.send(request)?;
        self.connection.receive(kind, self.round_trip_wait).ok_or_else(
            || {
                SessionError::Timeout { kind, timeout: self.round_trip_wait }
                    .into()
            },
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("hosting", &self.is_hosting())
            .field("address", &self.address())
            .field("running", &self.is_running())
            .finish()
    }
}
