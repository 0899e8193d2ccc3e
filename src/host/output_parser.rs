//! Typed view of engine output lines.
//!
//! Raw chunks from `Session::read` may carry several lines; `split_lines`
//! separates them and `parse_line` classifies each one.

use std::fmt;

use crate::engines::protocol_engine::is_coordinate_move;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// Centipawn scores in pawns; `None` for mate scores.
    pub fn pawns(self) -> Option<f32> {
        match self {
            Score::Centipawns(cp) => Some(cp as f32 / 100.0),
            Score::Mate(_) => None,
        }
    }
}

/// An `info` line carrying a score and a principal variation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInfo {
    pub multipv: u32,
    pub depth: Option<u32>,
    pub score: Option<Score>,
    /// First move of the principal variation.
    pub best_move: Option<String>,
    /// Everything after `pv`.
    pub line: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    UciOk,
    ReadyOk,
    /// The completion sentinel: the engine loop has ended.
    QuitOk,
    BestMove {
        best_move: String,
        ponder: Option<String>,
    },
    Info(AnalysisInfo),
    Raw(String),
}

impl fmt::Display for EngineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMessage::UciOk => f.write_str("uciok"),
            EngineMessage::ReadyOk => f.write_str("readyok"),
            EngineMessage::QuitOk => f.write_str("quitok"),
            EngineMessage::BestMove {
                best_move,
                ponder: Some(ponder),
            } => write!(f, "bestmove {} ponder {}", best_move, ponder),
            EngineMessage::BestMove { best_move, .. } => write!(f, "bestmove {}", best_move),
            EngineMessage::Info(info) => f.write_str(&info.raw),
            EngineMessage::Raw(line) => f.write_str(line),
        }
    }
}

/// Non-empty lines of a chunk, without line terminators.
pub fn split_lines(chunk: &str) -> impl Iterator<Item = &str> {
    chunk
        .split('\n')
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
}

pub fn parse_line(line: &str) -> Option<EngineMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let message = match trimmed {
        "uciok" => EngineMessage::UciOk,
        "readyok" => EngineMessage::ReadyOk,
        "quitok" => EngineMessage::QuitOk,
        _ if trimmed.starts_with("bestmove") => parse_bestmove(trimmed),
        _ if is_analysis_line(trimmed) => EngineMessage::Info(parse_info(trimmed)),
        _ => EngineMessage::Raw(trimmed.to_owned()),
    };
    Some(message)
}

fn is_analysis_line(line: &str) -> bool {
    let mut tokens = line.split_whitespace();
    tokens.next() == Some("info") && {
        let rest: Vec<&str> = tokens.collect();
        rest.contains(&"score") && rest.contains(&"pv")
    }
}

fn parse_bestmove(line: &str) -> EngineMessage {
    // bestmove e7e6 ponder c2c3
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [_, best, "ponder", ponder, ..] => EngineMessage::BestMove {
            best_move: (*best).to_owned(),
            ponder: Some((*ponder).to_owned()),
        },
        [_, best, ..] => EngineMessage::BestMove {
            best_move: (*best).to_owned(),
            ponder: None,
        },
        _ => EngineMessage::Raw(line.to_owned()),
    }
}

fn parse_info(line: &str) -> AnalysisInfo {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut info = AnalysisInfo {
        multipv: 1,
        depth: None,
        score: None,
        best_move: None,
        line: None,
        raw: line.to_owned(),
    };

    let mut i = 0usize;
    while i < tokens.len() {
        match tokens[i] {
            "multipv" => {
                i += 1;
                if let Some(n) = tokens.get(i).and_then(|x| x.parse::<u32>().ok()) {
                    info.multipv = n;
                }
            }
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|x| x.parse::<u32>().ok());
            }
            "score" => {
                let kind = tokens.get(i + 1).copied();
                let value = tokens.get(i + 2).and_then(|x| x.parse::<i32>().ok());
                info.score = match (kind, value) {
                    (Some("cp"), Some(v)) => Some(Score::Centipawns(v)),
                    (Some("mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => info.score,
                };
                i += 2;
            }
            "pv" => {
                let moves = &tokens[i + 1..];
                info.best_move = moves
                    .first()
                    .filter(|m| is_coordinate_move(m))
                    .map(|m| (*m).to_owned());
                info.line = Some(moves.join(" "));
                break;
            }
            _ => {}
        }
        i += 1;
    }
    info
}
