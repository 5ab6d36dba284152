//! One bidirectional channel to one peer.
//!
//! A [`Connection`] wraps a single TCP stream and owns the background
//! workers that service it:
//!
//! - the **decode worker** (both roles) reads one packet at a time off the
//!   wire, buffering responses into per-kind queues and inbound requests
//!   into a FIFO;
//! - the **request-drain worker** (active/client role only) pops inbound
//!   requests, dispatches them through a [`HandlerRegistry`], and writes any
//!   produced response back on the same connection.
//!
//! On the passive role (a server-accepted peer) there is no drain worker:
//! the server's router consumes the request FIFO through
//! [`Connection::try_pop_request`] and replies through [`Connection::send`].
//!
//! Writes are atomic per message: packets are encoded to a buffer first and
//! written under one lock, so concurrent senders never interleave bytes.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use wordwire_protocol::{
    MessageKind, Packet, PacketStream, Request, Response, encode_packet,
};

use crate::{HandlerRegistry, ResponseQueues, TransportError};

/// How often the request-drain worker rechecks the shutdown flag while idle.
const DRAIN_POLL: Duration = Duration::from_millis(25);

/// A point-to-point channel to one peer.
///
/// Created by [`connect`](Connection::connect) (active role) or
/// [`accepted`](Connection::accepted) (passive role), then
/// [`start`](Connection::start)ed to spawn its workers and
/// [`stop`](Connection::stop)ped exactly once to tear them down. A stopped
/// connection is never reused.
pub struct Connection {
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    stream: TcpStream,
    writer: Arc<Mutex<TcpStream>>,
    // Taken by start(); also serves as the started-once guard.
    reader: Mutex<Option<TcpStream>>,
    registry: Option<HandlerRegistry>,
    responses: ResponseQueues,
    requests_tx: Sender<Request>,
    requests_rx: Receiver<Request>,
    running: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    /// Opens the active (client) side of a session channel.
    ///
    /// Inbound requests will be answered through `registry` once the
    /// connection is started.
    ///
    /// # Errors
    /// Fails with a connection-level fault if `host:port` does not resolve,
    /// refuses, or does not complete the handshake within `connect_timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        registry: HandlerRegistry,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(TransportError::ConnectFailed)?
            .next()
            .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))?;

        let stream = TcpStream::connect_timeout(&target, connect_timeout)
            .map_err(TransportError::ConnectFailed)?;
        tracing::debug!(peer = %target, "connected");

        Self::new(stream, Some(registry))
    }

    /// Wraps the passive (server-accepted) side of a session channel.
    pub fn accepted(stream: TcpStream) -> Result<Self, TransportError> {
        Self::new(stream, None)
    }

    fn new(
        stream: TcpStream,
        registry: Option<HandlerRegistry>,
    ) -> Result<Self, TransportError> {
        stream.set_nodelay(true).map_err(TransportError::Setup)?;
        let peer_addr = stream.peer_addr().map_err(TransportError::Setup)?;
        let local_addr = stream.local_addr().map_err(TransportError::Setup)?;
        let writer = stream.try_clone().map_err(TransportError::Setup)?;
        let reader = stream.try_clone().map_err(TransportError::Setup)?;
        let (requests_tx, requests_rx) = unbounded();

        Ok(Self {
            peer_addr,
            local_addr,
            stream,
            writer: Arc::new(Mutex::new(writer)),
            reader: Mutex::new(Some(reader)),
            registry,
            responses: ResponseQueues::new(),
            requests_tx,
            requests_rx,
            running: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Spawns the background workers. Calling it again is a no-op.
    ///
    /// # Errors
    /// Fails only if the OS refuses to spawn a thread.
    pub fn start(&self) -> Result<(), TransportError> {
        let Some(reader) = self.reader.lock().take() else {
            return Ok(());
        };
        self.running.store(true, Ordering::Release);

        let mut workers = self.workers.lock();
        workers.push(self.spawn_decode_worker(reader)?);
        if let Some(registry) = self.registry.clone() {
            workers.push(self.spawn_drain_worker(registry)?);
        }
        Ok(())
    }

    fn spawn_decode_worker(
        &self,
        reader: TcpStream,
    ) -> Result<JoinHandle<()>, TransportError> {
        let peer = self.peer_addr;
        let responses = self.responses.clone();
        let requests_tx = self.requests_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name(format!("wordwire-decode-{peer}"))
            .spawn(move || {
                let mut packets = PacketStream::new(reader);
                loop {
                    match packets.next_packet() {
                        Ok(Some(Packet::Response(response))) => {
                            tracing::trace!(%peer, kind = %response.kind(), "buffered response");
                            responses.push(response);
                        }
                        Ok(Some(Packet::Request(request))) => {
                            tracing::trace!(%peer, kind = %request.kind(), "queued inbound request");
                            if requests_tx.send(request).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!(%peer, "peer closed the stream");
                            break;
                        }
                        Err(err) => {
                            // Covers both a torn connection and a stream
                            // that lost its value boundaries.
                            tracing::debug!(%peer, error = %err, "decode loop ending");
                            break;
                        }
                    }
                }
                running.store(false, Ordering::Release);
            })
            .map_err(TransportError::Setup)
    }

    fn spawn_drain_worker(
        &self,
        registry: HandlerRegistry,
    ) -> Result<JoinHandle<()>, TransportError> {
        let peer = self.peer_addr;
        let writer = Arc::clone(&self.writer);
        let requests_rx = self.requests_rx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name(format!("wordwire-respond-{peer}"))
            .spawn(move || {
                loop {
                    let request = match requests_rx.recv_timeout(DRAIN_POLL) {
                        Ok(request) => request,
                        Err(RecvTimeoutError::Timeout) => {
                            if running.load(Ordering::Acquire) {
                                continue;
                            }
                            break;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    };

                    match registry.dispatch(&request) {
                        Ok(Some(response)) => {
                            let packet = Packet::from(response);
                            if let Err(err) = write_packet(&writer, &packet) {
                                tracing::debug!(%peer, error = %err, "reply failed");
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::error!(%peer, error = %err, "handler misuse");
                        }
                    }
                }
            })
            .map_err(TransportError::Setup)
    }

    /// Serializes and writes one message, atomically with respect to other
    /// senders on this connection.
    ///
    /// # Errors
    /// Surfaces encode failures and socket write failures to the caller;
    /// both are recoverable from the session's point of view.
    pub fn send(&self, packet: impl Into<Packet>) -> Result<(), TransportError> {
        write_packet(&self.writer, &packet.into())
    }

    /// Pops the oldest buffered response of `kind` without blocking.
    pub fn try_receive(&self, kind: MessageKind) -> Option<Response> {
        self.responses.try_pop(kind)
    }

    /// Waits up to `timeout` for a response of `kind`. Returns `None` on
    /// timeout; never waits materially past the deadline.
    pub fn receive(
        &self,
        kind: MessageKind,
        timeout: Duration,
    ) -> Option<Response> {
        self.responses.pop_timeout(kind, timeout)
    }

    /// Discards every buffered response of `kind`.
    pub fn drain_responses(&self, kind: MessageKind) -> usize {
        self.responses.drain(kind)
    }

    /// Appends a request to this connection's inbound FIFO, as if the peer
    /// had sent it. The server uses this to nudge peers on roster changes.
    pub fn push_request(&self, request: Request) {
        let _ = self.requests_tx.send(request);
    }

    /// Pops the oldest inbound request, if any. Passive-role API: on the
    /// active role the drain worker already consumes this FIFO.
    pub fn try_pop_request(&self) -> Option<Request> {
        self.requests_rx.try_recv().ok()
    }

    /// True from [`start`](Connection::start) until [`stop`](Connection::stop)
    /// or until the decode worker notices the peer is gone.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Closes the socket and joins the workers.
    ///
    /// Idempotent, and safe to call on a connection a prior fault left
    /// half-open. After it returns no worker of this connection is running.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Unblocks the decode worker's read. Errors are expected when the
        // socket is already gone.
        let _ = self.stream.shutdown(Shutdown::Both);

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.join();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("peer_addr", &self.peer_addr)
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Encode-then-write under one lock, keeping each message contiguous on the
/// wire.
fn write_packet(
    writer: &Mutex<TcpStream>,
    packet: &Packet,
) -> Result<(), TransportError> {
    use std::io::Write;

    let bytes = encode_packet(packet)?;
    let mut stream = writer.lock();
    stream
        .write_all(&bytes)
        .and_then(|()| stream.flush())
        .map_err(TransportError::SendFailed)
}
