//! Speech recognition backends
//!
//! Recognition is line oriented: one line of console input stands in for
//! one recognized utterance, which keeps the conversation loop testable on
//! any machine with a keyboard or a pipe.

use std::io::IsTerminal;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::{Error, Result};
use crate::speech::SpeechRecognizer;

/// Recognizer reading utterances as lines from standard input
pub struct ConsoleRecognizer<R = BufReader<Stdin>> {
    lines: tokio::sync::Mutex<Lines<R>>,
}

impl ConsoleRecognizer {
    /// Attach to standard input.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible so construction slots into the
    /// same resolution path as the other capabilities.
    pub fn new() -> Result<Self> {
        if !std::io::stdin().is_terminal() {
            tracing::debug!("stdin is not a terminal, reading piped input");
        }
        Ok(Self::from_reader(BufReader::new(tokio::io::stdin())))
    }
}

impl<R: AsyncBufRead + Send + Unpin> ConsoleRecognizer<R> {
    /// Wrap an arbitrary line source. `new` wires standard input through
    /// here.
    fn from_reader(reader: R) -> Self {
        Self {
            lines: tokio::sync::Mutex::new(reader.lines()),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Send + Unpin> SpeechRecognizer for ConsoleRecognizer<R> {
    async fn listen(&self, window: Duration) -> Result<Option<String>> {
        let mut lines = self.lines.lock().await;
        match tokio::time::timeout(window, lines.next_line()).await {
            // Window elapsed with no input.
            Err(_) => Ok(None),
            Ok(Ok(Some(line))) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(line))
                }
            }
            Ok(Ok(None)) => {
                // Input closed. Pace like silence so the caller's listen
                // loop does not spin.
                tokio::time::sleep(window).await;
                Ok(None)
            }
            Ok(Err(e)) => Err(Error::Recognition(format!("console read failed: {e}"))),
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Recognizer that hears nothing. Every listen window elapses silently.
#[derive(Debug, Default)]
pub struct SilentRecognizer;

impl SilentRecognizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechRecognizer for SilentRecognizer {
    async fn listen(&self, window: Duration) -> Result<Option<String>> {
        tokio::time::sleep(window).await;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}
