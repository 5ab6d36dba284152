//! # Wordwire
//!
//! Multiplayer network synchronization for a typing game: typed words sent
//! between players, aggregate rosters, shared session configuration, and
//! start signals, over plain TCP.
//!
//! One participant hosts, the others join, and the host is also a client
//! of its own server — one code path for session messages regardless of
//! role. The application drives everything through a [`Session`] and
//! supplies its side of the contract through the [`GameHooks`] and
//! [`ConfigSource`] traits.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wordwire::prelude::*;
//!
//! # fn collaborators() -> (Arc<dyn GameHooks>, Arc<dyn ConfigSource>) { unimplemented!() }
//! # fn main() -> Result<(), WordwireError> {
//! let (hooks, config) = collaborators();
//! let session = Session::host(4242, hooks, config)?;
//!
//! session.send(Word::normal("ferris"))?;
//! while let Some(word) = session.try_receive_word() {
//!     println!("opponent sent {word}");
//! }
//!
//! session.stop();
//! # Ok(())
//! # }
//! ```

mod error;
mod handlers;
mod roster;
mod server;
mod session;

pub use error::{ServerError, SessionError, WordwireError};
pub use handlers::{ConfigSource, GameHooks, host_registry, standard_registry};
pub use roster::RosterCache;
pub use server::{Server, ServerConfig};
pub use session::Session;

// The layers below, re-exported so applications depend on one crate.
pub use wordwire_protocol::{
    GameMode, MessageKind, Packet, PlayerSnapshot, ProtocolError, Request,
    Response, SessionConfig, Word, WordKind, validate_player_name,
};
pub use wordwire_transport::{
    Connection, Handler, HandlerError, HandlerRegistry, TransportError,
};

/// Everything an application typically needs in scope.
pub mod prelude {
    pub use crate::{
        ConfigSource, GameHooks, GameMode, PlayerSnapshot, ServerConfig,
        Session, SessionConfig, Word, WordKind, WordwireError,
    };
}
