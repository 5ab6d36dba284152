//! Request handlers and their dispatch table.
//!
//! A handler answers one kind of inbound request. The registry is built once
//! at startup and then only read, so dispatch is a plain table lookup over
//! the closed kind enum. Kinds with no registered handler fall back to a
//! no-op: the request is dropped and nothing is sent back.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;
use wordwire_protocol::{MessageKind, Request, Response};

/// A handler turns one request into at most one response.
///
/// Handlers run on worker threads (the client's request-drain worker or the
/// server's router), so they must not block on anything unbounded.
pub type Handler =
    Arc<dyn Fn(&Request) -> Result<Option<Response>, HandlerError> + Send + Sync>;

/// A handler was used incorrectly. This is a programming error in the
/// registration wiring, not a network condition, and is never retried.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The handler received a request of a kind it does not answer.
    #[error("handler for {expected} invoked with a {got} request")]
    WrongKind {
        expected: MessageKind,
        got: MessageKind,
    },
}

/// Dispatch table from message kind to handler, resolved at startup.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<MessageKind, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registers `handler` for `kind`, replacing any previous registration.
    pub fn with(
        mut self,
        kind: MessageKind,
        handler: impl Fn(&Request) -> Result<Option<Response>, HandlerError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Looks up the handler for a request's kind and invokes it.
    ///
    /// An unregistered kind is answered by the no-op fallback: `Ok(None)`.
    pub fn dispatch(
        &self,
        request: &Request,
    ) -> Result<Option<Response>, HandlerError> {
        match self.handlers.get(&request.kind()) {
            Some(handler) => handler(request),
            None => {
                trace!(kind = %request.kind(), "no handler registered, dropping request");
                Ok(None)
            }
        }
    }

    /// True if a handler is registered for `kind`.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wordwire_protocol::Word;

    fn echo() -> impl Fn(&Request) -> Result<Option<Response>, HandlerError> {
        |request: &Request| match request.word() {
            Some(word) => Ok(Some(Response::word_unit(word.clone()))),
            None => Err(HandlerError::WrongKind {
                expected: MessageKind::WordUnit,
                got: request.kind(),
            }),
        }
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        let registry =
            HandlerRegistry::new().with(MessageKind::WordUnit, echo());

        let request = Request::word_unit(Word::normal("ping"));
        let response = registry.dispatch(&request).unwrap().unwrap();
        assert_eq!(response.into_word().unwrap().content(), "ping");
    }

    #[test]
    fn test_unregistered_kind_falls_back_to_noop() {
        let registry =
            HandlerRegistry::new().with(MessageKind::WordUnit, echo());

        let response = registry.dispatch(&Request::game_start()).unwrap();
        assert!(response.is_none());
    }

    #[test]
    fn test_misregistered_handler_reports_wrong_kind() {
        // Registering the word echo under PlayersList is a wiring bug; the
        // handler must refuse the mismatched request rather than answer it.
        let registry =
            HandlerRegistry::new().with(MessageKind::PlayersList, echo());

        let err = registry
            .dispatch(&Request::players_list())
            .unwrap_err();
        assert!(matches!(err, HandlerError::WrongKind { .. }));
        assert!(err.to_string().contains("PlayersList"));
    }

    #[test]
    fn test_with_replaces_previous_registration() {
        let registry = HandlerRegistry::new()
            .with(MessageKind::GameStart, |_| Ok(None))
            .with(MessageKind::GameStart, |_| {
                Ok(Some(Response::word_unit(Word::normal("second"))))
            });

        let response =
            registry.dispatch(&Request::game_start()).unwrap().unwrap();
        assert_eq!(response.into_word().unwrap().content(), "second");
    }

    #[test]
    fn test_handles_reports_registration() {
        let registry =
            HandlerRegistry::new().with(MessageKind::WordUnit, echo());
        assert!(registry.handles(MessageKind::WordUnit));
        assert!(!registry.handles(MessageKind::Configuration));
    }
}
