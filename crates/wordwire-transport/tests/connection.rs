//! Integration tests for the TCP connection.
//!
//! These drive a real [`Connection`] against a raw loopback socket playing
//! the part of the remote peer, so the decode worker, per-kind buffering,
//! and the request-drain worker are exercised over an actual stream.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use wordwire_protocol::{
    MessageKind, Packet, PacketStream, PlayerSnapshot, Request, Response,
    Word, encode_packet,
};
use wordwire_transport::{Connection, HandlerError, HandlerRegistry};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RECV_WAIT: Duration = Duration::from_secs(2);

/// Helper: a listener on an OS-assigned loopback port.
fn listener() -> (TcpListener, u16) {
    let listener =
        TcpListener::bind("127.0.0.1:0").expect("should bind loopback");
    let port = listener.local_addr().expect("should have addr").port();
    (listener, port)
}

/// Helper: connects a started client `Connection` and hands back the raw
/// peer socket for scripting the remote side.
fn connected_pair(registry: HandlerRegistry) -> (Connection, TcpStream) {
    let (listener, port) = listener();
    let client = Connection::connect("127.0.0.1", port, registry, CONNECT_TIMEOUT)
        .expect("should connect");
    client.start().expect("should start workers");
    let (remote, _) = listener.accept().expect("should accept");
    (client, remote)
}

fn write_raw(remote: &mut TcpStream, packet: &Packet) {
    let bytes = encode_packet(packet).expect("should encode");
    remote.write_all(&bytes).expect("should write");
    remote.flush().expect("should flush");
}

#[test]
fn test_receive_routes_responses_by_kind() {
    let (client, mut remote) = connected_pair(HandlerRegistry::new());

    // A word arrives first, then a roster. Waiting on the roster must not
    // be disturbed by the earlier word.
    write_raw(&mut remote, &Response::word_unit(Word::normal("noise")).into());
    write_raw(
        &mut remote,
        &Response::players_list(vec![PlayerSnapshot::casual("ada")]).into(),
    );

    let roster = client
        .receive(MessageKind::PlayersList, RECV_WAIT)
        .expect("roster should arrive");
    assert_eq!(roster.into_players().unwrap().len(), 1);

    let word = client
        .receive(MessageKind::WordUnit, RECV_WAIT)
        .expect("word should still be buffered");
    assert_eq!(word.into_word().unwrap().content(), "noise");

    client.stop();
}

#[test]
fn test_try_receive_never_blocks() {
    let (client, _remote) = connected_pair(HandlerRegistry::new());

    let start = Instant::now();
    assert!(client.try_receive(MessageKind::WordUnit).is_none());
    assert!(start.elapsed() < Duration::from_millis(50));

    client.stop();
}

#[test]
fn test_receive_times_out_within_bound() {
    let (client, _remote) = connected_pair(HandlerRegistry::new());
    let wait = Duration::from_millis(100);

    let start = Instant::now();
    let got = client.receive(MessageKind::Configuration, wait);
    let elapsed = start.elapsed();

    assert!(got.is_none());
    assert!(elapsed >= wait, "returned before the deadline");
    assert!(
        elapsed < wait + Duration::from_millis(250),
        "overshot the deadline: {elapsed:?}"
    );

    client.stop();
}

#[test]
fn test_drain_worker_answers_inbound_requests() {
    // The remote pushes a PlayerState request; the client's registry must
    // produce the snapshot and write it back on the same connection.
    let registry = HandlerRegistry::new().with(
        MessageKind::PlayerState,
        |request: &Request| match request.kind() {
            MessageKind::PlayerState => Ok(Some(Response::player_state(
                PlayerSnapshot::ranked("ada", 3),
            ))),
            other => Err(HandlerError::WrongKind {
                expected: MessageKind::PlayerState,
                got: other,
            }),
        },
    );
    let (client, mut remote) = connected_pair(registry);

    write_raw(&mut remote, &Request::player_state().into());

    let mut packets = PacketStream::new(
        remote.try_clone().expect("should clone remote"),
    );
    remote
        .set_read_timeout(Some(RECV_WAIT))
        .expect("should set timeout");
    let reply = packets
        .next_packet()
        .expect("stream should stay healthy")
        .expect("reply should arrive");

    match reply {
        Packet::Response(response) => {
            let player = response.into_player().expect("player state reply");
            assert_eq!(player.name, "ada");
            assert_eq!(player.lives, Some(3));
        }
        Packet::Request(_) => panic!("expected a response, got a request"),
    }

    client.stop();
}

#[test]
fn test_unknown_request_kind_gets_no_reply() {
    // No handler registered: the request must be swallowed, not answered
    // and not fatal.
    let (client, mut remote) = connected_pair(HandlerRegistry::new());

    write_raw(&mut remote, &Request::configuration().into());
    write_raw(&mut remote, &Response::word_unit(Word::normal("after")).into());

    // The later word still flows, so the drain worker survived.
    let word = client
        .receive(MessageKind::WordUnit, RECV_WAIT)
        .expect("word should arrive");
    assert_eq!(word.into_word().unwrap().content(), "after");

    client.stop();
}

#[test]
fn test_foreign_json_is_skipped_silently() {
    let (client, mut remote) = connected_pair(HandlerRegistry::new());

    remote
        .write_all(br#"{"telemetry": true}"#)
        .expect("should write");
    write_raw(&mut remote, &Response::word_unit(Word::bonus("real")).into());

    let word = client
        .receive(MessageKind::WordUnit, RECV_WAIT)
        .expect("valid traffic should survive foreign values");
    assert!(word.into_word().unwrap().is_bonus());

    client.stop();
}

#[test]
fn test_accepted_connection_queues_requests_for_external_pop() {
    // Passive role: no drain worker, the FIFO is consumed from outside.
    let (listener, port) = listener();
    let client = Connection::connect(
        "127.0.0.1",
        port,
        HandlerRegistry::new(),
        CONNECT_TIMEOUT,
    )
    .expect("should connect");
    client.start().expect("should start");

    let (stream, _) = listener.accept().expect("should accept");
    let peer = Connection::accepted(stream).expect("should wrap");
    peer.start().expect("should start");

    client
        .send(Request::players_list())
        .expect("send should succeed");

    let deadline = Instant::now() + RECV_WAIT;
    let popped = loop {
        if let Some(request) = peer.try_pop_request() {
            break Some(request);
        }
        if Instant::now() > deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(5));
    };

    let request = popped.expect("request should reach the passive FIFO");
    assert_eq!(request.kind(), MessageKind::PlayersList);

    client.stop();
    peer.stop();
}

#[test]
fn test_push_request_feeds_the_same_fifo() {
    let (listener, port) = listener();
    let client = Connection::connect(
        "127.0.0.1",
        port,
        HandlerRegistry::new(),
        CONNECT_TIMEOUT,
    )
    .expect("should connect");
    let (stream, _) = listener.accept().expect("should accept");
    let peer = Connection::accepted(stream).expect("should wrap");

    // Never started: the push is purely local.
    peer.push_request(Request::players_list());
    let request = peer.try_pop_request().expect("pushed request is buffered");
    assert_eq!(request.kind(), MessageKind::PlayersList);

    client.stop();
    peer.stop();
}

#[test]
fn test_stop_is_idempotent_and_halts_workers() {
    let (client, _remote) = connected_pair(HandlerRegistry::new());
    assert!(client.is_running());

    client.stop();
    assert!(!client.is_running());

    // Second stop must not fault. If a worker were still alive it would
    // hold the joined handles, so returning at all is the liveness probe.
    client.stop();
    assert!(!client.is_running());
}

#[test]
fn test_send_after_stop_fails_with_connection_fault() {
    let (client, _remote) = connected_pair(HandlerRegistry::new());
    client.stop();

    let result = client.send(Request::players_list());
    assert!(result.is_err());
}

#[test]
fn test_peer_disconnect_ends_decode_worker() {
    let (client, remote) = connected_pair(HandlerRegistry::new());
    drop(remote);

    let deadline = Instant::now() + RECV_WAIT;
    while client.is_running() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!client.is_running(), "decode worker should notice the close");

    // Teardown after a fault must still be clean.
    client.stop();
}

#[test]
fn test_connect_to_dead_port_fails_fast() {
    let (listener, port) = listener();
    drop(listener);

    let result = Connection::connect(
        "127.0.0.1",
        port,
        HandlerRegistry::new(),
        CONNECT_TIMEOUT,
    );
    assert!(result.is_err(), "connecting to a closed port should fail");
}
