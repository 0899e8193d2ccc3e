//! Command sequences for the common host requests.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub depth: u32,
    pub multi_pv: u32,
    pub movetime_ms: Option<u64>,
    pub nodes: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            depth: 20,
            multi_pv: 1,
            movetime_ms: None,
            nodes: None,
        }
    }
}

impl AnalysisOptions {
    pub fn go_command(&self) -> String {
        let mut go = format!("go depth {} multipv {}", self.depth, self.multi_pv);
        if let Some(movetime) = self.movetime_ms {
            go.push_str(&format!(" movetime {}", movetime));
        }
        if let Some(nodes) = self.nodes {
            go.push_str(&format!(" nodes {}", nodes));
        }
        go
    }
}

/// Handshake, fresh game, position and search for an analysis request.
pub fn analysis_commands(fen: &str, options: &AnalysisOptions) -> Vec<String> {
    vec![
        "uci".to_owned(),
        "isready".to_owned(),
        "ucinewgame".to_owned(),
        format!("position fen {}", fen),
        options.go_command(),
    ]
}

/// Handshake, position and a time-bounded search for the engine's move.
pub fn computer_move_commands(fen: &str, movetime_ms: u64, depth: u32) -> Vec<String> {
    vec![
        "uci".to_owned(),
        "isready".to_owned(),
        format!("position fen {}", fen),
        format!("go movetime {} depth {}", movetime_ms, depth),
    ]
}

#[cfg(test)]
mod tests {
    use super::{analysis_commands, computer_move_commands, AnalysisOptions};

    const FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn default_analysis_sequence() {
        let commands = analysis_commands(FEN, &AnalysisOptions::default());
        assert_eq!(
            commands,
            vec![
                "uci".to_owned(),
                "isready".to_owned(),
                "ucinewgame".to_owned(),
                format!("position fen {}", FEN),
                "go depth 20 multipv 1".to_owned(),
            ]
        );
    }

    #[test]
    fn optional_limits_are_appended() {
        let options = AnalysisOptions {
            depth: 12,
            multi_pv: 3,
            movetime_ms: Some(1500),
            nodes: Some(200_000),
        };
        assert_eq!(
            options.go_command(),
            "go depth 12 multipv 3 movetime 1500 nodes 200000"
        );
    }

    #[test]
    fn computer_move_sequence() {
        let commands = computer_move_commands(FEN, 1000, 15);
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[3], "go movetime 1000 depth 15");
    }
}
