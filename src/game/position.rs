//! Board position backed by `shakmaty`. Legality, notation and FEN all come
//! from the library; this wrapper only picks the notation rules the game
//! server speaks.

use serde::{Deserialize, Serialize};
use shakmaty::{fen::Fen, san::San, CastlingMode, Chess, Color, EnPassantMode, Move, Position};
use thiserror::Error;

use crate::shared::AppError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

impl From<PositionError> for AppError {
    fn from(error: PositionError) -> Self {
        match error {
            PositionError::InvalidFen(fen) => AppError::BadRequest(format!("Invalid FEN: {}", fen)),
            PositionError::IllegalMove(text) => {
                AppError::IllegalMove(format!("Illegal move: {}", text))
            }
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameStatus {
    AwaitingMove,
    Checkmate,
    Stalemate,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::AwaitingMove)
    }
}

/// A move that has been played, in both notations plus the FEN after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedMove {
    pub uci: String,
    pub san: String,
    pub fen: String,
}

#[derive(Debug, Clone, Default)]
pub struct GamePosition {
    pos: Chess,
}

impl GamePosition {
    /// Standard starting position
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|_| PositionError::InvalidFen(fen.to_string()))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|_| PositionError::InvalidFen(fen.to_string()))?;
        Ok(Self { pos })
    }

    /// The en passant square is always written after a double pawn push,
    /// whether or not a capture is available.
    pub fn fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Always).to_string()
    }

    pub fn white_to_move(&self) -> bool {
        self.pos.turn() == Color::White
    }

    pub fn fullmoves(&self) -> u32 {
        self.pos.fullmoves().get()
    }

    pub fn legal_moves_uci(&self) -> Vec<String> {
        self.pos
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
            .collect()
    }

    /// Resolves move text against the position: UCI first, then SAN.
    fn resolve(&self, text: &str) -> Result<Move, PositionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PositionError::IllegalMove(text.to_string()));
        }

        let uci = text.to_ascii_lowercase();
        let legal = self.pos.legal_moves();
        if let Some(m) = legal
            .iter()
            .find(|m| m.to_uci(CastlingMode::Standard).to_string() == uci)
        {
            return Ok(m.clone());
        }

        text.trim_end_matches(['+', '#'])
            .parse::<San>()
            .ok()
            .and_then(|san| san.to_move(&self.pos).ok())
            .ok_or_else(|| PositionError::IllegalMove(text.to_string()))
    }

    /// Plays `text` if it is legal here. On error the position is unchanged.
    pub fn apply(&mut self, text: &str) -> Result<AppliedMove, PositionError> {
        let m = self.resolve(text)?;
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        let mut san = San::from_move(&self.pos, &m).to_string();

        self.pos.play_unchecked(&m);

        if self.pos.is_checkmate() {
            san.push('#');
        } else if self.pos.is_check() {
            san.push('+');
        }

        Ok(AppliedMove {
            uci,
            san,
            fen: self.fen(),
        })
    }

    /// Draw covers insufficient material and the seventy-five-move rule.
    /// Repetition is not tracked.
    pub fn status(&self) -> GameStatus {
        if self.pos.is_checkmate() {
            GameStatus::Checkmate
        } else if self.pos.is_stalemate() {
            GameStatus::Stalemate
        } else if self.pos.is_insufficient_material() || self.pos.halfmoves() >= 150 {
            GameStatus::Draw
        } else {
            GameStatus::AwaitingMove
        }
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    /// `1-0`, `0-1` or `1/2-1/2` once the game is over
    pub fn result(&self) -> Option<&'static str> {
        match self.status() {
            GameStatus::AwaitingMove => None,
            GameStatus::Checkmate if self.white_to_move() => Some("0-1"),
            GameStatus::Checkmate => Some("1-0"),
            GameStatus::Stalemate | GameStatus::Draw => Some("1/2-1/2"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const FOOLS_MATE_SETUP: &str = "rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2";

    #[test]
    fn test_start_position_fen() {
        assert_eq!(GamePosition::new().fen(), START);
        assert!(GamePosition::new().white_to_move());
        assert_eq!(GamePosition::new().legal_moves_uci().len(), 20);
    }

    #[test]
    fn test_e2e4_from_start() {
        let mut position = GamePosition::new();
        let applied = position.apply("e2e4").unwrap();
        assert_eq!(applied.uci, "e2e4");
        assert_eq!(applied.san, "e4");
        assert_eq!(
            applied.fen,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert!(!position.white_to_move());
    }

    #[rstest]
    #[case("e4")]
    #[case("E2E4")]
    #[case(" e2e4 ")]
    fn test_accepts_san_and_case_insensitive_uci(#[case] text: &str) {
        let mut position = GamePosition::new();
        let applied = position.apply(text).unwrap();
        assert_eq!(applied.uci, "e2e4");
    }

    #[rstest]
    #[case("e2e5")]
    #[case("Ke2")]
    #[case("zzz")]
    #[case("")]
    fn test_illegal_move_leaves_position_untouched(#[case] text: &str) {
        let mut position = GamePosition::new();
        let before = position.fen();
        let result = position.apply(text);
        assert!(matches!(result, Err(PositionError::IllegalMove(_))));
        assert_eq!(position.fen(), before);
    }

    #[test]
    fn test_fen_round_trip_after_moves() {
        let mut position = GamePosition::new();
        for text in ["e2e4", "c7c5", "Nf3", "d6", "d4", "cxd4"] {
            let applied = position.apply(text).unwrap();
            let reparsed = GamePosition::from_fen(&applied.fen).unwrap();
            assert_eq!(reparsed.fen(), applied.fen);
            assert_eq!(reparsed.legal_moves_uci(), position.legal_moves_uci());
        }
    }

    #[test]
    fn test_invalid_fen_rejected() {
        assert!(matches!(
            GamePosition::from_fen("not a fen"),
            Err(PositionError::InvalidFen(_))
        ));
        // Both kings missing
        assert!(GamePosition::from_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err());
    }

    #[test]
    fn test_checkmate_detected() {
        let mut position = GamePosition::from_fen(FOOLS_MATE_SETUP).unwrap();
        let applied = position.apply("d8h4").unwrap();
        assert_eq!(applied.san, "Qh4#");
        assert_eq!(position.status(), GameStatus::Checkmate);
        assert!(position.status().is_terminal());
        assert!(position.is_check());
        assert_eq!(position.result(), Some("0-1"));
    }

    #[test]
    fn test_stalemate_detected() {
        let position = GamePosition::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(position.status(), GameStatus::Stalemate);
        assert_eq!(position.result(), Some("1/2-1/2"));
    }

    #[test]
    fn test_insufficient_material_is_draw() {
        let position = GamePosition::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert_eq!(position.status(), GameStatus::Draw);
    }

    #[test]
    fn test_seventy_five_move_rule_is_draw() {
        let position =
            GamePosition::from_fen("r3k3/8/8/8/8/8/8/R3K3 w - - 150 120").unwrap();
        assert_eq!(position.status(), GameStatus::Draw);
    }

    #[test]
    fn test_check_suffix_in_san() {
        let mut position =
            GamePosition::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let applied = position.apply("a1a8").unwrap();
        assert_eq!(applied.san, "Ra8+");
        assert_eq!(position.status(), GameStatus::AwaitingMove);
        assert!(position.is_check());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(GameStatus::AwaitingMove.to_string(), "awaiting_move");
        assert_eq!("checkmate".parse::<GameStatus>().unwrap(), GameStatus::Checkmate);
    }
}
