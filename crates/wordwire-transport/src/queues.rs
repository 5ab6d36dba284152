//! Per-kind response queues.
//!
//! Incoming responses are buffered by their [`MessageKind`] so that a caller
//! waiting on one kind is never disturbed by a burst of another. One slot
//! exists per kind, created up front; the decode worker pushes, callers pop.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::trace;
use wordwire_protocol::{MessageKind, Response};

/// One unbounded FIFO of unconsumed responses per message kind.
///
/// Push and pop are safe from any thread; cloning is cheap and all clones
/// share the same queues.
#[derive(Clone)]
pub struct ResponseQueues {
    slots: HashMap<MessageKind, Slot>,
}

#[derive(Clone)]
struct Slot {
    tx: Sender<Response>,
    rx: Receiver<Response>,
}

impl ResponseQueues {
    pub fn new() -> Self {
        let mut slots = HashMap::with_capacity(MessageKind::ALL.len());
        for kind in MessageKind::ALL {
            let (tx, rx) = unbounded();
            slots.insert(kind, Slot { tx, rx });
        }
        Self { slots }
    }

    /// Buffers a response on the queue of its kind.
    pub fn push(&self, response: Response) {
        let kind = response.kind();
        if let Some(slot) = self.slots.get(&kind) {
            // All receivers live as long as self, so this cannot fail.
            let _ = slot.tx.send(response);
        } else {
            trace!(%kind, "dropping response with no queue slot");
        }
    }

    /// Pops the oldest buffered response of `kind` without blocking.
    pub fn try_pop(&self, kind: MessageKind) -> Option<Response> {
        self.slots.get(&kind)?.rx.try_recv().ok()
    }

    /// Pops the oldest buffered response of `kind`, waiting up to `timeout`
    /// for one to arrive. Returns `None` on timeout or when the pushing
    /// side is gone.
    pub fn pop_timeout(
        &self,
        kind: MessageKind,
        timeout: Duration,
    ) -> Option<Response> {
        let slot = self.slots.get(&kind)?;
        match slot.rx.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout)
            | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Discards everything buffered for `kind`, returning how many responses
    /// were thrown away.
    pub fn drain(&self, kind: MessageKind) -> usize {
        let Some(slot) = self.slots.get(&kind) else {
            return 0;
        };
        let mut dropped = 0;
        while slot.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for ResponseQueues {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wordwire_protocol::{PlayerSnapshot, Word};

    #[test]
    fn test_push_and_try_pop_same_kind() {
        let queues = ResponseQueues::new();
        queues.push(wordwire_protocol::Response::word_unit(Word::normal("a")));

        let popped = queues.try_pop(MessageKind::WordUnit).unwrap();
        assert_eq!(popped.into_word().unwrap().content(), "a");
        assert!(queues.try_pop(MessageKind::WordUnit).is_none());
    }

    #[test]
    fn test_kinds_are_isolated() {
        let queues = ResponseQueues::new();
        queues.push(wordwire_protocol::Response::players_list(vec![
            PlayerSnapshot::casual("ada"),
        ]));

        // A roster response must not satisfy a word receive.
        assert!(queues.try_pop(MessageKind::WordUnit).is_none());
        assert!(queues.try_pop(MessageKind::PlayersList).is_some());
    }

    #[test]
    fn test_pop_preserves_fifo_order_within_kind() {
        let queues = ResponseQueues::new();
        for content in ["one", "two", "three"] {
            queues.push(wordwire_protocol::Response::word_unit(Word::normal(
                content,
            )));
        }

        for expected in ["one", "two", "three"] {
            let word = queues
                .try_pop(MessageKind::WordUnit)
                .unwrap()
                .into_word()
                .unwrap();
            assert_eq!(word.content(), expected);
        }
    }

    #[test]
    fn test_pop_timeout_returns_none_after_deadline() {
        let queues = ResponseQueues::new();
        let wait = Duration::from_millis(30);

        let start = Instant::now();
        let popped = queues.pop_timeout(MessageKind::Configuration, wait);
        let elapsed = start.elapsed();

        assert!(popped.is_none());
        assert!(elapsed >= wait);
        // Generous ceiling: the wait must be bounded, not indefinite.
        assert!(elapsed < wait + Duration::from_millis(250));
    }

    #[test]
    fn test_pop_timeout_wakes_up_when_value_arrives() {
        let queues = ResponseQueues::new();
        let pusher = queues.clone();

        let waiter = std::thread::spawn(move || {
            queues.pop_timeout(MessageKind::WordUnit, Duration::from_secs(5))
        });
        std::thread::sleep(Duration::from_millis(20));
        pusher.push(wordwire_protocol::Response::word_unit(Word::normal(
            "late",
        )));

        let popped = waiter.join().unwrap();
        assert_eq!(popped.unwrap().into_word().unwrap().content(), "late");
    }

    #[test]
    fn test_drain_empties_one_kind_only() {
        let queues = ResponseQueues::new();
        for _ in 0..3 {
            queues.push(wordwire_protocol::Response::player_state(
                PlayerSnapshot::casual("ada"),
            ));
        }
        queues.push(wordwire_protocol::Response::word_unit(Word::normal("x")));

        assert_eq!(queues.drain(MessageKind::PlayerState), 3);
        assert!(queues.try_pop(MessageKind::PlayerState).is_none());
        assert!(queues.try_pop(MessageKind::WordUnit).is_some());
    }
}
