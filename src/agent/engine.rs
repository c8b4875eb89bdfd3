use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument};

use super::types::{Agent, AgentError};
use crate::game::GamePosition;

/// UCI engine (e.g. Stockfish) driven over stdin/stdout. One process per
/// request; it is killed if the request is dropped.
pub struct EngineAgent {
    path: PathBuf,
    skill_level: Option<u8>,
    movetime_ms: u64,
}

impl EngineAgent {
    pub fn new(path: PathBuf, skill_level: Option<u8>, movetime_ms: u64) -> Self {
        Self {
            path,
            skill_level,
            movetime_ms,
        }
    }
}

struct UciSession {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

impl UciSession {
    async fn send(&mut self, command: &str) -> Result<(), AgentError> {
        debug!(command = %command, "-> engine");
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Reads until a line satisfies `done`, returning that line
    async fn read_until(&mut self, done: impl Fn(&str) -> bool) -> Result<String, AgentError> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim().to_string();
            if done(&line) {
                debug!(line = %line, "<- engine");
                return Ok(line);
            }
        }
        Err(AgentError::Unavailable(
            "engine closed its output".to_string(),
        ))
    }
}

/// Move from a `bestmove <uci> [ponder <uci>]` line
fn parse_bestmove(line: &str) -> Result<String, AgentError> {
    match line.split_whitespace().nth(1) {
        Some("(none)") | None => Err(AgentError::BadReply(line.to_string())),
        Some(mv) => Ok(mv.to_string()),
    }
}

#[async_trait]
impl Agent for EngineAgent {
    #[instrument(skip(self, position), fields(engine = %self.path.display()))]
    async fn propose_move(&self, position: &GamePosition) -> Result<String, AgentError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::Unavailable(format!("failed to start engine: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Unavailable("engine stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Unavailable("engine stdout not captured".to_string()))?;
        let mut session = UciSession {
            stdin,
            lines: BufReader::new(stdout).lines(),
        };

        session.send("uci").await?;
        session.read_until(|l| l == "uciok").await?;

        if let Some(skill) = self.skill_level {
            session
                .send(&format!("setoption name Skill Level value {}", skill))
                .await?;
        }

        session.send("isready").await?;
        session.read_until(|l| l == "readyok").await?;

        session
            .send(&format!("position fen {}", position.fen()))
            .await?;
        session.send(&format!("go movetime {}", self.movetime_ms)).await?;

        let line = session.read_until(|l| l.starts_with("bestmove")).await?;
        let best = parse_bestmove(&line)?;

        // Best effort; kill_on_drop covers an engine that ignores it
        let _ = session.send("quit").await;

        Ok(best)
    }

    fn name(&self) -> String {
        match self.skill_level {
            Some(skill) => format!("Stockfish (Skill: {})", skill),
            None => "Stockfish".to_string(),
        }
    }
}
