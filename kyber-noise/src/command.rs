//! Line protocol between a capture host and a harness device.
//!
//! The host sends one command per line:
//!
//! - `RUN` runs the pipeline with a seed drawn by the device,
//! - `RUN <64 hex chars>` runs it with the given seed.
//!
//! The device answers each command with one report (see [`crate::report`]).

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

use crate::error::ConfigError;
use crate::seed::Seed;

/// Longest accepted command line: `RUN ` plus 64 hex chars, with slack.
pub const MAX_COMMAND_LEN: usize = 96;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Option<Seed>),
}

/// Wire form without the line terminator.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Run(None) => f.write_str("RUN"),
            Command::Run(Some(seed)) => write!(f, "RUN {}", seed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command is not ASCII")]
    NotAscii,

    #[error("command longer than {} bytes", MAX_COMMAND_LEN)]
    TooLong,

    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("bad seed: {0}")]
    Seed(#[from] ConfigError),
}

/// Parse one line, without its terminator.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let text = line.trim();
    match text.split_once(' ') {
        None if text == "RUN" => Ok(Command::Run(None)),
        Some(("RUN", hex)) => Ok(Command::Run(Some(Seed::from_hex(hex)?))),
        _ => Err(CommandError::Unknown(text.to_string())),
    }
}

/// Reassembles command lines from arbitrarily split input.
///
/// Bytes after a complete line stay queued for the next call, so several
/// commands arriving in one transfer are all delivered in order.
#[derive(Debug, Default)]
pub struct CommandReader {
    pending: VecDeque<u8>,
}

impl CommandReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Whether queued bytes remain to be looked at.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Next complete line as a command. `None` until a terminator arrives;
    /// blank lines are skipped.
    pub fn next_command(&mut self) -> Option<Result<Command, CommandError>> {
        loop {
            let Some(end) = self.pending.iter().position(|&b| b == b'\n' || b == b'\r') else {
                if self.pending.len() > MAX_COMMAND_LEN {
                    self.pending.clear();
                    return Some(Err(CommandError::TooLong));
                }
                return None;
            };

            let line: Vec<u8> = self.pending.drain(..end).collect();
            self.pending.pop_front();
            if line.is_empty() {
                continue;
            }
            if line.len() > MAX_COMMAND_LEN {
                return Some(Err(CommandError::TooLong));
            }
            return Some(match core::str::from_utf8(&line) {
                Ok(text) if text.is_ascii() => parse_command(text),
                _ => Err(CommandError::NotAscii),
            });
        }
    }
}
