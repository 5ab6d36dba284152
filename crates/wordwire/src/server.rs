//! Listening server and request router.
//!
//! The [`Server`] accepts joining peers, keeps one [`Connection`] per peer
//! in a concurrent registry, and runs a single router thread that drains
//! each peer's inbound-request queue, dispatches through the handler
//! registry, and fans responses out:
//!
//! - `WordUnit` responses go to every peer **except** the requester, so a
//!   word never echoes back to its sender;
//! - every other response kind goes only to the requester;
//! - `PlayersList` requests are answered by the router itself through the
//!   [`RosterCache`], because building the roster needs a fan-out round
//!   trip over the whole registry.
//!
//! Registry entries are added on accept and never removed until shutdown.
//! A peer that drops off keeps its (dead) entry; sends to it fail and are
//! logged, and roster sweeps stop counting it once its replies time out.
//! If a later accept arrives under the same address — necessarily a reused
//! ephemeral port, since live TCP address tuples are unique — the fresh
//! connection replaces the stale entry.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};
use wordwire_protocol::{MessageKind, Request, Response};
use wordwire_transport::{Connection, HandlerRegistry};

use crate::ServerError;
use crate::roster::RosterCache;

/// Tunable timing knobs for a hosted session.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum age at which a cached roster is served without recomputation.
    pub roster_freshness: Duration,
    /// Bounded wait for one peer's reply during a fan-out collection.
    pub reply_wait: Duration,
    /// Idle sleep of the accept and router loops between sweeps.
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            roster_freshness: Duration::from_millis(500),
            reply_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// The listening half of a hosted session.
///
/// Bound once with [`bind`](Server::bind), stopped exactly once with
/// [`stop`](Server::stop) (idempotent); never reused afterwards.
pub struct Server {
    inner: Arc<Inner>,
    local_addr: SocketAddr,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    peers: DashMap<SocketAddr, Arc<Connection>>,
    registry: HandlerRegistry,
    roster: RosterCache,
    config: ServerConfig,
    running: AtomicBool,
}

impl Server {
    /// Binds a listener on `port` (0 picks an ephemeral port) and spawns
    /// the accept and router workers.
    ///
    /// `registry` answers the routed request kinds; `PlayersList` is
    /// handled internally and needs no entry.
    ///
    /// # Errors
    /// Fails if the port cannot be bound or a worker cannot be spawned.
    pub fn bind(
        port: u16,
        registry: HandlerRegistry,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .map_err(|source| ServerError::Bind { port, source })?;
        // Non-blocking accept lets the loop poll a shutdown flag instead of
        // parking forever in accept().
        listener.set_nonblocking(true).map_err(ServerError::Setup)?;
        let local_addr = listener.local_addr().map_err(ServerError::Setup)?;

        let inner = Arc::new(Inner {
            peers: DashMap::new(),
            registry,
            roster: RosterCache::new(config.roster_freshness),
            config,
            running: AtomicBool::new(true),
        });

        let accept = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("wordwire-accept".into())
                .spawn(move || inner.accept_loop(listener))
                .map_err(ServerError::Spawn)?
        };
        let router = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("wordwire-router".into())
                .spawn(move || inner.router_loop())
                .map_err(ServerError::Spawn)?
        };

        info!(%local_addr, "server listening");
        Ok(Self {
            inner,
            local_addr,
            workers: Mutex::new(vec![accept, router]),
        })
    }

    /// Writes `request` to every connected peer matching `filter`.
    ///
    /// Sends to dead peers fail quietly; their registry entries stay until
    /// shutdown.
    pub fn send_all(
        &self,
        request: &Request,
        filter: impl Fn(SocketAddr) -> bool,
    ) {
        self.inner.send_all(request, &filter);
    }

    /// Collects, for each connected peer matching `filter`, the first
    /// buffered reply of `kind` within the configured per-peer wait.
    /// Peers that time out are skipped, not retried.
    pub fn receive_all(
        &self,
        kind: MessageKind,
        filter: impl Fn(SocketAddr) -> bool,
    ) -> Vec<(SocketAddr, Response)> {
        self.inner.receive_all(kind, &filter)
    }

    /// Number of registered peers, dead entries included.
    pub fn peer_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// True from bind until [`stop`](Server::stop).
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Signals the workers, joins them, then closes every peer connection.
    ///
    /// Idempotent; after it returns no server worker is running.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::AcqRel) {
            debug!("server stopping");
        }

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
        for peer in self.inner.peers.iter() {
            peer.value().stop();
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn accept_loop(&self, listener: TcpListener) {
        while self.running.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.config.poll_interval);
                }
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    thread::sleep(self.config.poll_interval);
                }
            }
        }
        debug!("accept loop ended");
    }

    /// Registers a freshly accepted peer and nudges every session to
    /// refresh its roster view.
    fn admit(&self, stream: TcpStream, addr: SocketAddr) {
        // The stream inherits the listener's non-blocking flag; the decode
        // worker needs blocking reads.
        if let Err(err) = stream.set_nonblocking(false) {
            warn!(peer = %addr, error = %err, "cannot configure peer socket");
            return;
        }

        let connection = match Connection::accepted(stream) {
            Ok(connection) => connection,
            Err(err) => {
                warn!(peer = %addr, error = %err, "cannot wrap peer socket");
                return;
            }
        };
        if let Err(err) = connection.start() {
            warn!(peer = %addr, error = %err, "cannot start peer workers");
            return;
        }

        // Registered before anything can reference it. TCP address tuples
        // are unique per live connection, so a hit here is a disconnected
        // peer whose ephemeral port came back around.
        if let Some(stale) = self.peers.insert(addr, Arc::new(connection)) {
            debug!(peer = %addr, "replacing stale peer entry");
            stale.stop();
        }
        info!(peer = %addr, peers = self.peers.len(), "peer joined");

        // Notify on join: a synthetic roster request per peer, so every
        // connected session is promptly sent a refreshed view.
        for peer in self.peers.iter() {
            peer.value().push_request(Request::players_list());
        }
    }

    fn router_loop(&self) {
        while self.running.load(Ordering::Acquire) {
            let mut idle = true;
            for (addr, connection) in self.snapshot() {
                if let Some(request) = connection.try_pop_request() {
                    idle = false;
                    self.dispatch(addr, request);
                }
            }
            if idle {
                thread::sleep(self.config.poll_interval);
            }
        }
        debug!("router loop ended");
    }

    /// Resolves one request and fans the result out to the right peers.
    fn dispatch(&self, requester: SocketAddr, request: Request) {
        trace!(peer = %requester, kind = %request.kind(), "routing request");

        if request.kind() == MessageKind::PlayersList {
            let response =
                self.roster.get_or_recompute(|| self.compute_roster());
            self.send_to(requester, response);
            return;
        }

        match self.registry.dispatch(&request) {
            Ok(Some(response)) => match response.kind() {
                MessageKind::WordUnit => {
                    self.send_all_responses(response, |peer| {
                        peer != requester
                    });
                }
                _ => self.send_to(requester, response),
            },
            Ok(None) => {}
            Err(err) => {
                // Wrong-kind dispatch is a wiring bug, not a peer problem.
                error!(peer = %requester, error = %err, "handler misuse");
            }
        }
    }

    /// One full roster sweep: ask every peer for its state, keep whoever
    /// answers within the per-peer wait.
    fn compute_roster(&self) -> Response {
        debug!(peers = self.peers.len(), "recomputing roster");

        // Leftover replies from a sweep that already gave up on a peer
        // must not be counted as fresh answers.
        for peer in self.peers.iter() {
            let stale = peer.value().drain_responses(MessageKind::PlayerState);
            if stale > 0 {
                debug!(peer = %peer.key(), stale, "dropped stale state replies");
            }
        }

        self.send_all(&Request::player_state(), &|_| true);

        let replies = self.receive_all(MessageKind::PlayerState, &|_| true);
        let players = replies
            .into_iter()
            .filter_map(|(_, response)| response.into_player())
            .collect::<Vec<_>>();
        debug!(players = players.len(), "roster computed");
        Response::players_list(players)
    }

    fn send_all(
        &self,
        request: &Request,
        filter: &dyn Fn(SocketAddr) -> bool,
    ) {
        for (addr, connection) in self.snapshot() {
            if !filter(addr) {
                continue;
            }
            if let Err(err) = connection.send(request.clone()) {
                debug!(peer = %addr, error = %err, "send to peer failed");
            }
        }
    }

    fn receive_all(
        &self,
        kind: MessageKind,
        filter: &dyn Fn(SocketAddr) -> bool,
    ) -> Vec<(SocketAddr, Response)> {
        let mut replies = Vec::new();
        for (addr, connection) in self.snapshot() {
            if !filter(addr) {
                continue;
            }
            match connection.receive(kind, self.config.reply_wait) {
                Some(response) => replies.push((addr, response)),
                None => {
                    warn!(peer = %addr, %kind, "no reply within deadline, skipping peer");
                }
            }
        }
        replies
    }

    fn send_all_responses(
        &self,
        response: Response,
        filter: impl Fn(SocketAddr) -> bool,
    ) {
        for (addr, connection) in self.snapshot() {
            if !filter(addr) {
                continue;
            }
            if let Err(err) = connection.send(response.clone()) {
                debug!(peer = %addr, error = %err, "send to peer failed");
            }
        }
    }

    fn send_to(&self, addr: SocketAddr, response: Response) {
        let Some(connection) = self.peers.get(&addr) else {
            debug!(peer = %addr, "requester vanished before reply");
            return;
        };
        if let Err(err) = connection.send(response) {
            debug!(peer = %addr, error = %err, "reply to peer failed");
        }
    }

    /// Copies the registry out so no shard lock is held across blocking
    /// dispatch or fan-out work.
    fn snapshot(&self) -> Vec<(SocketAddr, Arc<Connection>)> {
        self.peers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect()
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr)
            .field("peers", &self.inner.peers.len())
            .field("running", &self.is_running())
            .finish()
    }
}
