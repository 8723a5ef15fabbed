//! Append-only audit log of brewery actions.
//!
//! Every state change made through the workspace is appended as one
//! human-readable line:
//!
//! ```text
//! 2026-10-18T09:30:00+00:00 - batch - Added 500L of Organic Pilsner (3f2a9c1b), brewing
//! ```
//!
//! Appends take an exclusive file lock so concurrent invocations never
//! interleave partial lines.

use crate::{types::short_id, Result, Stage};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Something that happened to the brewery's state
#[derive(Clone, Debug, PartialEq)]
pub enum AuditEvent {
    BatchAdded {
        id: Uuid,
        beer: String,
        volume: u32,
        stage: Stage,
    },
    BatchAdvanced {
        id: Uuid,
        beer: String,
        from: Stage,
        to: Stage,
    },
    BatchBottled {
        id: Uuid,
        beer: String,
        bottles: u32,
    },
    TankAssigned {
        tank: String,
        batch: Uuid,
        stage: Stage,
    },
    TankReleased {
        tank: String,
        batch: Uuid,
    },
    OrderAdded {
        id: Uuid,
        beer: String,
        bottles: u32,
        due: NaiveDate,
    },
    OrderDelivered {
        id: Uuid,
        beer: String,
        bottles: u32,
        remaining: u32,
    },
    OrderCancelled {
        id: Uuid,
        beer: String,
        bottles: u32,
    },
    SalesImported {
        source: String,
        rows: usize,
        beers: usize,
    },
}

impl AuditEvent {
    pub fn category(&self) -> &'static str {
        match self {
            AuditEvent::BatchAdded { .. }
            | AuditEvent::BatchAdvanced { .. }
            | AuditEvent::BatchBottled { .. } => "batch",
            AuditEvent::TankAssigned { .. } | AuditEvent::TankReleased { .. } => "tank",
            AuditEvent::OrderAdded { .. }
            | AuditEvent::OrderDelivered { .. }
            | AuditEvent::OrderCancelled { .. } => "order",
            AuditEvent::SalesImported { .. } => "sales",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditEvent::BatchAdded {
                id,
                beer,
                volume,
                stage,
            } => write!(f, "Added {}L of {} ({}), {}", volume, beer, short_id(id), stage),
            AuditEvent::BatchAdvanced { id, beer, from, to } => write!(
                f,
                "Moved {} ({}) from {} to {}",
                beer,
                short_id(id),
                from,
                to
            ),
            AuditEvent::BatchBottled { id, beer, bottles } => write!(
                f,
                "Bottled {} ({}): {} bottles added to inventory",
                beer,
                short_id(id),
                bottles
            ),
            AuditEvent::TankAssigned { tank, batch, stage } => {
                write!(f, "{} now {} batch {}", tank, stage, short_id(batch))
            }
            AuditEvent::TankReleased { tank, batch } => {
                write!(f, "{} released by batch {}", tank, short_id(batch))
            }
            AuditEvent::OrderAdded {
                id,
                beer,
                bottles,
                due,
            } => write!(
                f,
                "Order {} for {} bottles of {} due {}",
                short_id(id),
                bottles,
                beer,
                due.format("%d/%m/%Y")
            ),
            AuditEvent::OrderDelivered {
                id,
                beer,
                bottles,
                remaining,
            } => write!(
                f,
                "Delivered order {}: {} bottles of {}, {} left",
                short_id(id),
                bottles,
                beer,
                remaining
            ),
            AuditEvent::OrderCancelled { id, beer, bottles } => write!(
                f,
                "Cancelled order {} for {} bottles of {}",
                short_id(id),
                bottles,
                beer
            ),
            AuditEvent::SalesImported {
                source,
                rows,
                beers,
            } => write!(f, "Imported {} sales rows for {} beers from {}", rows, beers, source),
        }
    }
}

/// Sink for audit events
pub trait AuditSink {
    fn record(&mut self, at: DateTime<Utc>, event: &AuditEvent) -> Result<()>;
}

/// Line-oriented audit log file with file locking
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    /// Create a new audit log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// Render one event as it appears in the log file
pub fn format_entry(at: DateTime<Utc>, event: &AuditEvent) -> String {
    format!("{} - {} - {}", at.to_rfc3339(), event.category(), event)
}

impl AuditSink for FileAuditLog {
    fn record(&mut self, at: DateTime<Utc>, event: &AuditEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // A crash mid-append leaves a fragment; start a fresh line after it
        let torn = if file.metadata()?.len() > 0 {
            let mut last = [0u8; 1];
            (&file).seek(SeekFrom::End(-1))?;
            (&file).read_exact(&mut last)?;
            last[0] != b'\n'
        } else {
            false
        };

        let mut writer = std::io::BufWriter::new(&file);
        if torn {
            tracing::warn!("Audit log {:?} ends mid-line, starting a new line", self.path);
            writer.write_all(b"\n")?;
        }
        writer.write_all(format_entry(at, event).as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Recorded {} event in audit log", event.category());
        Ok(())
    }
}

/// Read every line of an audit log, oldest first
pub fn read_entries(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            entries.push(line);
        }
    }

    file.unlock()?;
    Ok(entries)
}
