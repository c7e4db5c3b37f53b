use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::pricing::Usage;

/// One line of the cost log.
#[derive(Debug, Clone, PartialEq)]
pub struct CostRecord {
    pub timestamp: DateTime<Utc>,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// A name was generated (and possibly applied).
    Named {
        cost: f64,
        usage: Usage,
        name: String,
        rename_error: Option<String>,
    },
    /// Generation was paid for but produced nothing usable.
    Unusable {
        cost: f64,
        usage: Usage,
        reason: String,
    },
    /// Nothing was generated.
    Failed { reason: String },
}

impl CostRecord {
    pub fn now(outcome: RecordOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::now(RecordOutcome::Failed {
            reason: reason.into(),
        })
    }
}

impl fmt::Display for CostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, false);
        match &self.outcome {
            RecordOutcome::Named {
                cost,
                usage,
                name,
                rename_error,
            } => {
                write!(
                    f,
                    "{ts} cost=${cost:.6} input={} output={} name=\"{}\"",
                    usage.input_tokens,
                    usage.output_tokens,
                    escape(name)
                )?;
                if let Some(err) = rename_error {
                    write!(f, " rename_error=\"{}\"", escape(err))?;
                }
                Ok(())
            }
            RecordOutcome::Unusable {
                cost,
                usage,
                reason,
            } => write!(
                f,
                "{ts} cost=${cost:.6} input={} output={} error=\"{}\"",
                usage.input_tokens,
                usage.output_tokens,
                escape(reason)
            ),
            RecordOutcome::Failed { reason } => write!(f, "{ts} error=\"{}\"", escape(reason)),
        }
    }
}

/// Keep a record on one line and its quoted fields unambiguous.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace(['\n', '\r'], " ")
}

/// Append-only cost log at a fixed path.
#[derive(Debug, Clone)]
pub struct CostLog {
    path: PathBuf,
}

impl CostLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record (creates file + dir if needed).
    ///
    /// The line is written with a single `write_all` on an `O_APPEND` handle,
    /// so concurrent hook processes never interleave within a line.
    pub fn append(&self, record: &CostRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = format!("{record}\n");
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
