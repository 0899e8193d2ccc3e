//! Protocol-level UCI responder.
//!
//! Handles the handshake, readiness, option and position bookkeeping of the
//! UCI command loop without a search behind it: `go` is answered with a null
//! move. Used when no real engine is linked in, and as the engine the bridge
//! is exercised against.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::debug;

use crate::engines::engine_trait::{CommandLoop, EngineContext};
use crate::resolver::resolver_chain::{BIG_NETWORK_FILE, SMALL_NETWORK_FILE};

const UCI_ENGINE_NAME: &str = "Stockfish Bridge";
const UCI_ENGINE_AUTHOR: &str = "the bridge authors";

/// Position as last set by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionSpec {
    /// `None` means the standard start position.
    pub fen: Option<String>,
    pub moves: Vec<String>,
}

#[derive(Debug)]
pub struct ProtocolEngine {
    eval_file: PathBuf,
    eval_file_small: PathBuf,
    hash_mb: usize,
    threads: usize,
    multi_pv: u8,
    skill_level: u8,
    ponder: bool,
    debug_mode: bool,
    position: PositionSpec,
}

impl Default for ProtocolEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEngine {
    pub fn new() -> Self {
        Self {
            eval_file: PathBuf::from(BIG_NETWORK_FILE),
            eval_file_small: PathBuf::from(SMALL_NETWORK_FILE),
            hash_mb: 16,
            threads: 1,
            multi_pv: 1,
            skill_level: 20,
            ponder: false,
            debug_mode: false,
            position: PositionSpec::default(),
        }
    }

    pub fn position(&self) -> &PositionSpec {
        &self.position
    }

    /// Current option values, as reported while debug mode is on.
    pub fn settings_summary(&self) -> String {
        format!(
            "threads {} hash {} multipv {} skill {} ponder {}",
            self.threads, self.hash_mb, self.multi_pv, self.skill_level, self.ponder
        )
    }

    /// Handles one command line. Returns `true` once `quit` was seen.
    pub fn handle_command(&mut self, line: &str, out: &mut dyn Write) -> io::Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or_default();

        match cmd {
            "uci" => {
                writeln!(out, "id name {}", UCI_ENGINE_NAME)?;
                writeln!(out, "id author {}", UCI_ENGINE_AUTHOR)?;
                writeln!(out)?;
                writeln!(out, "option name Threads type spin default 1 min 1 max 1024")?;
                writeln!(out, "option name Hash type spin default 16 min 1 max 33554432")?;
                writeln!(out, "option name MultiPV type spin default 1 min 1 max 256")?;
                writeln!(out, "option name Skill Level type spin default 20 min 0 max 20")?;
                writeln!(out, "option name Ponder type check default false")?;
                writeln!(
                    out,
                    "option name EvalFile type string default {}",
                    self.eval_file.display()
                )?;
                writeln!(
                    out,
                    "option name EvalFileSmall type string default {}",
                    self.eval_file_small.display()
                )?;
                writeln!(out, "uciok")?;
            }
            "isready" => {
                writeln!(out, "readyok")?;
            }
            "setoption" => {
                if let Err(err) = self.handle_setoption(trimmed) {
                    writeln!(out, "info string setoption error: {}", err)?;
                }
            }
            "ucinewgame" => {
                self.position = PositionSpec::default();
            }
            "position" => {
                if let Err(err) = self.handle_position(trimmed) {
                    writeln!(out, "info string position error: {}", err)?;
                }
            }
            "go" => {
                if self.debug_mode {
                    writeln!(out, "info string {}", self.settings_summary())?;
                }
                writeln!(out, "info string no search backend attached")?;
                writeln!(out, "bestmove 0000")?;
            }
            "stop" | "ponderhit" | "register" => {
                // No search runs, so there is nothing to interrupt or resume.
            }
            "debug" => {
                let mode = parts.next().unwrap_or_default();
                self.debug_mode = mode.eq_ignore_ascii_case("on");
                if self.debug_mode {
                    writeln!(out, "info string debug on, {}", self.settings_summary())?;
                }
            }
            "quit" => {
                return Ok(true);
            }
            _ => {
                writeln!(out, "Unknown command: '{}'. Type help for more information.", trimmed)?;
            }
        }

        Ok(false)
    }

    fn handle_setoption(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace();
        let _ = tokens.next(); // setoption

        let mut name_tokens = Vec::<&str>::new();
        let mut value_tokens = Vec::<&str>::new();
        let mut mode = "";

        for tok in tokens {
            match tok {
                "name" => mode = "name",
                "value" => mode = "value",
                _ if mode == "name" => name_tokens.push(tok),
                _ if mode == "value" => value_tokens.push(tok),
                _ => {}
            }
        }

        let name = name_tokens.join(" ");
        let value = value_tokens.join(" ");

        if name.eq_ignore_ascii_case("Hash") {
            let parsed = value
                .parse::<usize>()
                .map_err(|_| format!("invalid Hash value '{}'", value))?;
            self.hash_mb = parsed.max(1);
        } else if name.eq_ignore_ascii_case("Threads") {
            let parsed = value
                .parse::<usize>()
                .map_err(|_| format!("invalid Threads value '{}'", value))?;
            self.threads = parsed.max(1);
        } else if name.eq_ignore_ascii_case("MultiPV") {
            let parsed = value
                .parse::<u8>()
                .map_err(|_| format!("invalid MultiPV value '{}'", value))?;
            self.multi_pv = parsed.max(1);
        } else if name.eq_ignore_ascii_case("Skill Level") {
            let parsed = value
                .parse::<u8>()
                .map_err(|_| format!("invalid Skill Level value '{}'", value))?;
            self.skill_level = parsed.min(20);
        } else if name.eq_ignore_ascii_case("Ponder") {
            let lower = value.to_ascii_lowercase();
            self.ponder = matches!(lower.as_str(), "true" | "1" | "yes" | "on");
        } else if name.eq_ignore_ascii_case("EvalFile") {
            self.eval_file = PathBuf::from(value);
        } else if name.eq_ignore_ascii_case("EvalFileSmall") {
            self.eval_file_small = PathBuf::from(value);
        } else {
            return Err(format!("No such option: {}", name));
        }

        Ok(())
    }

    fn handle_position(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace().peekable();
        let _ = tokens.next(); // "position"

        let fen = match tokens.next() {
            Some("startpos") => None,
            Some("fen") => {
                let mut fen_parts = Vec::<&str>::new();
                while let Some(next) = tokens.peek() {
                    if *next == "moves" {
                        break;
                    }
                    fen_parts.extend(tokens.next());
                }
                if fen_parts.is_empty() {
                    return Err("missing FEN after 'position fen'".to_owned());
                }
                Some(fen_parts.join(" "))
            }
            Some(other) => return Err(format!("unsupported position token '{}'", other)),
            None => return Err("incomplete position command".to_owned()),
        };

        let mut moves = Vec::new();
        if tokens.peek().copied() == Some("moves") {
            let _ = tokens.next();
            for lan in tokens {
                if !is_coordinate_move(lan) {
                    return Err(format!("invalid move '{}'", lan));
                }
                moves.push(lan.to_owned());
            }
        }

        self.position = PositionSpec { fen, moves };
        Ok(())
    }
}

/// Long-algebraic move such as `e2e4` or `e7e8q`.
pub fn is_coordinate_move(token: &str) -> bool {
    let b = token.as_bytes();
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);
    match b.len() {
        4 => square(b[0], b[1]) && square(b[2], b[3]),
        5 => square(b[0], b[1]) && square(b[2], b[3]) && b"qrbnk".contains(&b[4]),
        _ => false,
    }
}

impl CommandLoop for ProtocolEngine {
    fn initialize(&mut self, context: &EngineContext) -> io::Result<()> {
        debug!("engine arguments: {:?}", context.args());
        let nets = context.network_files();
        debug!(
            "evaluation networks: big={} small={}",
            nets.big.display(),
            nets.small.display()
        );
        self.eval_file = nets.big;
        self.eval_file_small = nets.small;
        Ok(())
    }

    fn run_loop(&mut self, input: &mut dyn BufRead, output: &mut dyn Write) -> io::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                debug!("engine input closed without quit");
                return Ok(());
            }
            let should_quit = self.handle_command(&line, output)?;
            output.flush()?;
            if should_quit {
                return Ok(());
            }
        }
    }
}
