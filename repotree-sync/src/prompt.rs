//! Interactive confirmation, decoded once into closed answers.

use std::future::Future;
use std::time::Duration;

use crate::SyncError;

/// Reads one line of user input.
///
/// With a timeout, an implementation returns [`SyncError::PromptTimeout`] when
/// no line arrives in time. End of input reads as an empty line.
pub trait LineReader {
    fn read_line(
        &mut self,
        question: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAnswer {
    Accept,
    Decline,
}

impl MoveAnswer {
    /// `y`/`yes` accepts; anything else declines.
    pub fn decode(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Self::Accept,
            _ => Self::Decline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneAnswer {
    Https,
    Ssh,
    Decline,
}

impl CloneAnswer {
    /// `h`/`https` or `s`/`ssh`; anything else declines.
    pub fn decode(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "h" | "https" => Self::Https,
            "s" | "ssh" => Self::Ssh,
            _ => Self::Decline,
        }
    }
}
