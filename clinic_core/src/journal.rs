//! Append-only appointment journal.
//!
//! Every committed booking is appended to a JSONL (JSON Lines) file with
//! file locking so several processes can write to it safely. The journal
//! is an audit trail; the store snapshot stays authoritative.

use crate::{Appointment, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Sink for committed appointments
pub trait AppointmentSink {
    fn append(&mut self, appointment: &Appointment) -> Result<()>;
}

/// JSONL-based appointment sink with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    /// Create a new journal for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl AppointmentSink for JsonlJournal {
    fn append(&mut self, appointment: &Appointment) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(appointment)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        tracing::debug!("Journaled appointment {}", appointment.id);
        Ok(())
    }
}

/// Read all appointments from a journal file
///
/// Unparseable lines (e.g. a torn final write) are skipped with a warning.
pub fn read_appointments(path: &Path) -> Result<Vec<Appointment>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut appointments = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Appointment>(&line) {
            Ok(appointment) => appointments.push(appointment),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse appointment at line {}: {}",
                    line_num + 1,
                    e
                );
            }
        }
    }

    tracing::debug!("Read {} appointments from journal", appointments.len());
    Ok(appointments)
}
