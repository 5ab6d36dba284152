//! Core protocol types for Wordwire's wire format.
//!
//! Everything in this module travels on the wire: the two message families
//! ([`Request`] and [`Response`]), the kind tag that correlates them
//! ([`MessageKind`]), and the payload values they carry ([`Word`],
//! [`PlayerSnapshot`], [`SessionConfig`]).
//!
//! Payloads are value copies owned by the gameplay/menu side of the
//! application. This layer transports them and never mutates them.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch, stamped on every message at creation.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The closed set of message kinds.
///
/// Every request and every response carries exactly one kind, and a response
/// always carries the kind of the request that produced it. `GameStart` is
/// the one exception: it is a one-way notification with no response variant.
///
/// The enum doubles as the key of per-kind receive queues and of the handler
/// dispatch table, so it derives `Hash`/`Eq` and exposes [`MessageKind::ALL`]
/// for building one slot per kind up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    WordUnit,
    PlayersList,
    PlayerState,
    Configuration,
    GameStart,
}

impl MessageKind {
    /// Every kind, in a fixed order.
    pub const ALL: [MessageKind; 5] = [
        MessageKind::WordUnit,
        MessageKind::PlayersList,
        MessageKind::PlayerState,
        MessageKind::Configuration,
        MessageKind::GameStart,
    ];
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::WordUnit => "WordUnit",
            MessageKind::PlayersList => "PlayersList",
            MessageKind::PlayerState => "PlayerState",
            MessageKind::Configuration => "Configuration",
            MessageKind::GameStart => "GameStart",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Word
// ---------------------------------------------------------------------------

/// What a word does to the player who types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WordKind {
    /// Scores normally.
    Normal,
    /// Grants an extra life / bonus effect.
    Bonus,
    /// Sent to opponents as a penalty.
    Malus,
}

/// One typed word, the unit of game data exchanged between players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    kind: WordKind,
    content: String,
}

impl Word {
    pub fn normal(content: impl Into<String>) -> Self {
        Self { kind: WordKind::Normal, content: content.into() }
    }

    pub fn bonus(content: impl Into<String>) -> Self {
        Self { kind: WordKind::Bonus, content: content.into() }
    }

    pub fn malus(content: impl Into<String>) -> Self {
        Self { kind: WordKind::Malus, content: content.into() }
    }

    pub fn kind(&self) -> WordKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_bonus(&self) -> bool {
        self.kind == WordKind::Bonus
    }

    pub fn is_malus(&self) -> bool {
        self.kind == WordKind::Malus
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

// ---------------------------------------------------------------------------
// PlayerSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time copy of one player's visible state.
///
/// Two shapes exist, mirroring the game's modes: casual players carry no
/// lives or level (`None`, always alive), ranked players carry both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub score: u32,
    pub correct_words: u32,
    pub correct_words_level: u32,
    pub lives: Option<u32>,
    pub level: Option<u32>,
}

impl PlayerSnapshot {
    /// A fresh casual-mode snapshot: no lives, no level, always alive.
    pub fn casual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            correct_words: 0,
            correct_words_level: 0,
            lives: None,
            level: None,
        }
    }

    /// A fresh ranked-mode snapshot with a starting life count.
    pub fn ranked(name: impl Into<String>, lives: u32) -> Self {
        Self {
            name: name.into(),
            score: 0,
            correct_words: 0,
            correct_words_level: 0,
            lives: Some(lives),
            level: Some(0),
        }
    }

    /// Casual players are always alive; ranked players until lives hit zero.
    pub fn is_alive(&self) -> bool {
        self.lives.map_or(true, |lives| lives > 0)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// How the session was configured in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Normal,
    Competitive,
    Host,
    Join,
}

/// The configuration snapshot a host shares with joining players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub players: u32,
    pub lives: u32,
    pub words: u32,
    pub player_name: String,
}

impl SessionConfig {
    /// Synthesizes a starting snapshot for the configured local player.
    ///
    /// `Normal` mode plays casual; every multiplayer mode plays ranked with
    /// the configured life count.
    pub fn player(&self) -> PlayerSnapshot {
        match self.mode {
            GameMode::Normal => PlayerSnapshot::casual(self.player_name.clone()),
            GameMode::Competitive | GameMode::Host | GameMode::Join => {
                PlayerSnapshot::ranked(self.player_name.clone(), self.lives)
            }
        }
    }

    /// Checks the player name rule: present, 3 to 20 characters.
    pub fn validate_player_name(&self) -> Result<(), crate::ProtocolError> {
        validate_player_name(&self.player_name)
    }
}

/// Player name rule shared by the config form and the session bootstrap.
pub fn validate_player_name(name: &str) -> Result<(), crate::ProtocolError> {
    use crate::ProtocolError::InvalidPlayerName;
    if name.is_empty() {
        return Err(InvalidPlayerName("a name is required".into()));
    }
    let chars = name.chars().count();
    if chars < 3 {
        return Err(InvalidPlayerName(
            "the name must be at least 3 characters long".into(),
        ));
    }
    if chars > 20 {
        return Err(InvalidPlayerName(
            "the name must be at most 20 characters long".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The payload of a request, tagged by kind.
///
/// `#[serde(tag = "kind")]` produces internally tagged JSON, so a word
/// request looks like:
///
/// ```json
/// { "kind": "WordUnit", "word": { "kind": "Malus", "content": "ferris" } }
/// ```
///
/// and a payload-free request is just `{ "kind": "PlayersList" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RequestBody {
    WordUnit { word: Word },
    PlayersList,
    PlayerState,
    Configuration,
    GameStart,
}

impl RequestBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            RequestBody::WordUnit { .. } => MessageKind::WordUnit,
            RequestBody::PlayersList => MessageKind::PlayersList,
            RequestBody::PlayerState => MessageKind::PlayerState,
            RequestBody::Configuration => MessageKind::Configuration,
            RequestBody::GameStart => MessageKind::GameStart,
        }
    }
}

/// An immutable query or notification sent to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    created: u64,
    #[serde(flatten)]
    body: RequestBody,
}

impl Request {
    pub fn word_unit(word: Word) -> Self {
        Self::from_body(RequestBody::WordUnit { word })
    }

    pub fn players_list() -> Self {
        Self::from_body(RequestBody::PlayersList)
    }

    pub fn player_state() -> Self {
        Self::from_body(RequestBody::PlayerState)
    }

    pub fn configuration() -> Self {
        Self::from_body(RequestBody::Configuration)
    }

    pub fn game_start() -> Self {
        Self::from_body(RequestBody::GameStart)
    }

    fn from_body(body: RequestBody) -> Self {
        Self { created: now_millis(), body }
    }

    /// When the request was created, in milliseconds since the epoch.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// The enclosed word, if this is a `WordUnit` request.
    pub fn word(&self) -> Option<&Word> {
        match &self.body {
            RequestBody::WordUnit { word } => Some(word),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The payload of a response, tagged by kind. Same wire shape as
/// [`RequestBody`]; `GameStart` has no response variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ResponseBody {
    WordUnit { word: Word },
    PlayersList { players: Vec<PlayerSnapshot> },
    PlayerState { player: PlayerSnapshot },
    Configuration { config: SessionConfig },
}

impl ResponseBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            ResponseBody::WordUnit { .. } => MessageKind::WordUnit,
            ResponseBody::PlayersList { .. } => MessageKind::PlayersList,
            ResponseBody::PlayerState { .. } => MessageKind::PlayerState,
            ResponseBody::Configuration { .. } => MessageKind::Configuration,
        }
    }
}

/// An immutable reply correlated to a request by its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    created: u64,
    #[serde(flatten)]
    body: ResponseBody,
}

impl Response {
    pub fn word_unit(word: Word) -> Self {
        Self::from_body(ResponseBody::WordUnit { word })
    }

    pub fn players_list(players: Vec<PlayerSnapshot>) -> Self {
        Self::from_body(ResponseBody::PlayersList { players })
    }

    pub fn player_state(player: PlayerSnapshot) -> Self {
        Self::from_body(ResponseBody::PlayerState { player })
    }

    pub fn configuration(config: SessionConfig) -> Self {
        Self::from_body(ResponseBody::Configuration { config })
    }

    fn from_body(body: ResponseBody) -> Self {
        Self { created: now_millis(), body }
    }

    /// When the response was created, in milliseconds since the epoch.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The enclosed word, if this is a `WordUnit` response.
    pub fn into_word(self) -> Option<Word> {
        match self.body {
            ResponseBody::WordUnit { word } => Some(word),
            _ => None,
        }
    }

    /// The enclosed roster, if this is a `PlayersList` response.
    pub fn into_players(self) -> Option<Vec<PlayerSnapshot>> {
        match self.body {
            ResponseBody::PlayersList { players } => Some(players),
            _ => None,
        }
    }

    /// The enclosed snapshot, if this is a `PlayerState` response.
    pub fn into_player(self) -> Option<PlayerSnapshot> {
        match self.body {
            ResponseBody::PlayerState { player } => Some(player),
            _ => None,
        }
    }

    /// The enclosed configuration, if this is a `Configuration` response.
    pub fn into_config(self) -> Option<SessionConfig> {
        match self.body {
            ResponseBody::Configuration { config } => Some(config),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Packet — the top-level wire unit
// ---------------------------------------------------------------------------

/// The unit of transmission: every value on the wire is exactly one packet,
/// discriminated at read time.
///
/// `#[serde(tag = "packet", rename_all = "lowercase")]` keeps the family tag
/// alongside the flattened message fields, so one wire value is one flat
/// JSON object:
///
/// ```json
/// { "packet": "request", "created": 1700000000000, "kind": "PlayersList" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "packet", rename_all = "lowercase")]
pub enum Packet {
    Request(Request),
    Response(Response),
}

impl Packet {
    pub fn kind(&self) -> MessageKind {
        match self {
            Packet::Request(request) => request.kind(),
            Packet::Response(response) => response.kind(),
        }
    }
}

impl From<Request> for Packet {
    fn from(request: Request) -> Self {
        Packet::Request(request)
    }
}

impl From<Response> for Packet {
    fn from(response: Response) -> Self {
        Packet::Response(response)
    }
}

// =========================================================================
// Tests
// =========================================================================
