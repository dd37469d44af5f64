//! Conversation transcripts
//!
//! Appends one JSON line per spoken exchange to a shared log under the
//! data directory. Each record is tagged with a session id so a single
//! file can hold many visits. Transcript writes never interrupt a
//! session: failures are logged and dropped.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One spoken line, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// When the line was spoken.
    pub timestamp: DateTime<Utc>,

    /// Session this line belongs to.
    pub session: Uuid,

    /// Who spoke: `visitor` or the persona's name.
    pub speaker: String,

    /// The words themselves.
    pub text: String,
}

/// Append-only conversation log for one session.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    session: Uuid,
}

impl Transcript {
    /// Create a transcript writing into `data_dir/conversations.jsonl`
    /// under a fresh session id.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("conversations.jsonl"),
            session: Uuid::new_v4(),
        }
    }

    /// Session id stamped on every record.
    #[must_use]
    pub const fn session(&self) -> Uuid {
        self.session
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one spoken line. Failures are logged, never propagated.
    pub fn append(&self, speaker: &str, text: &str) {
        if let Err(e) = self.try_append(speaker, text) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to record transcript line"
            );
        }
    }

    fn try_append(&self, speaker: &str, text: &str) -> crate::Result<()> {
        let record = TranscriptRecord {
            timestamp: Utc::now(),
            session: self.session,
            speaker: speaker.to_string(),
            text: text.to_string(),
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
