//! Typing duel: a terminal demo driving a full Wordwire session.
//!
//! Host a duel:
//!
//! ```text
//! typing-duel host 4242 ada
//! ```
//!
//! Join it from another terminal or machine:
//!
//! ```text
//! typing-duel join 127.0.0.1 4242 grace
//! ```
//!
//! The host waits for the configured number of players, broadcasts the
//! start signal, and both sides then trade randomly generated words for a
//! fixed number of rounds, printing everything they receive.

mod words;

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{error, info};
use wordwire::prelude::*;

enum Launch {
    Host { port: u16, name: String },
    Join { address: String, port: u16, name: String },
}

/// The demo's side of the session contract: a player snapshot behind a
/// lock and a start flag the remote signal flips.
struct Duel {
    config: SessionConfig,
    player: Mutex<PlayerSnapshot>,
    running: AtomicBool,
}

impl Duel {
    fn new(config: SessionConfig) -> Self {
        let player = config.player();
        Self {
            config,
            player: Mutex::new(player),
            running: AtomicBool::new(false),
        }
    }

    fn score_word(&self, word: &Word) {
        let mut player = self.player.lock();
        player.correct_words += 1;
        player.score += word.len() as u32;
    }
}

impl GameHooks for Duel {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn local_player(&self) -> PlayerSnapshot {
        self.player.lock().clone()
    }

    fn start_game(&self) {
        self.running.store(true, Ordering::SeqCst);
        println!("** game on! **");
    }
}

impl ConfigSource for Duel {
    fn current(&self) -> SessionConfig {
        self.config.clone()
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(launch) = parse(&args) else {
        eprintln!("usage: typing-duel host <port> <name>");
        eprintln!("       typing-duel join <address> <port> <name>");
        return ExitCode::FAILURE;
    };

    match run(launch) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "session failed");
            eprintln!("typing-duel: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse(args: &[String]) -> Option<Launch> {
    match args {
        [command, port, name] if command == "host" => Some(Launch::Host {
            port: port.parse().ok()?,
            name: name.clone(),
        }),
        [command, address, port, name] if command == "join" => {
            Some(Launch::Join {
                address: address.clone(),
                port: port.parse().ok()?,
                name: name.clone(),
            })
        }
        _ => None,
    }
}

fn run(launch: Launch) -> Result<(), WordwireError> {
    let (session, duel) = match launch {
        Launch::Host { port, name } => {
            let duel = Arc::new(Duel::new(config(GameMode::Host, &name)));
            let session = Session::host(
                port,
                Arc::clone(&duel) as Arc<dyn GameHooks>,
                Arc::clone(&duel) as Arc<dyn ConfigSource>,
            )?;
            println!("hosting on port {}", session.port());
            (session, duel)
        }
        Launch::Join { address, port, name } => {
            let duel = Arc::new(Duel::new(config(GameMode::Join, &name)));
            let session = Session::join(
                &address,
                port,
                Arc::clone(&duel) as Arc<dyn GameHooks>,
                Arc::clone(&duel) as Arc<dyn ConfigSource>,
            )?;
            println!("joined {address}:{port}");
            (session, duel)
        }
    };

    if session.is_hosting() {
        wait_for_players(&session, &duel)?;
    } else {
        wait_for_start(&session, &duel);
    }

    play(&session, &duel)?;

    print_roster(&session);
    session.stop();
    Ok(())
}

fn config(mode: GameMode, name: &str) -> SessionConfig {
    SessionConfig {
        mode,
        players: 2,
        lives: 3,
        words: 20,
        player_name: name.into(),
    }
}

/// Host side: poll the roster until enough players joined, then start.
fn wait_for_players(
    session: &Session,
    duel: &Duel,
) -> Result<(), WordwireError> {
    let wanted = duel.config.players as usize;
    println!("waiting for {wanted} players...");
    while session.is_running() {
        if session.number_of_players() >= wanted {
            session.game_started()?;
            // The broadcast skips the host's own client on purpose.
            duel.start_game();
            return Ok(());
        }
        thread::sleep(Duration::from_millis(500));
    }

    // The session died while waiting; the next send surfaces the fault.
    Ok(())
}

/// Joiner side: the remote start signal flips the flag through GameHooks.
fn wait_for_start(session: &Session, duel: &Duel) {
    println!("waiting for the host to start...");
    while !duel.is_running() && session.is_running() {
        thread::sleep(Duration::from_millis(200));
    }
}

fn play(session: &Session, duel: &Duel) -> Result<(), WordwireError> {
    let mut rng = rand::rng();

    for _ in 0..duel.config.words {
        while let Some(word) = session.try_receive_word() {
            show(&word);
        }

        let word = words::random_word(&mut rng);
        println!("-> {word}");
        duel.score_word(&word);
        session.send(word)?;

        thread::sleep(Duration::from_millis(400));
    }

    // Let the last words cross before the final drain.
    thread::sleep(Duration::from_secs(1));
    while let Some(word) = session.try_receive_word() {
        show(&word);
    }
    Ok(())
}

fn show(word: &Word) {
    let tag = match word.kind() {
        WordKind::Bonus => "bonus!",
        WordKind::Malus => "malus!",
        WordKind::Normal => "word",
    };
    println!("<- {tag} {word}");
}

fn print_roster(session: &Session) {
    match session.players_list() {
        Ok(players) => {
            println!("final roster:");
            for player in players {
                println!(
                    "  {} - score {}, {} words",
                    player.name, player.score, player.correct_words
                );
            }
        }
        Err(err) => info!(error = %err, "no final roster"),
    }
}
