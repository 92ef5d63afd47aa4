//! CSV export of an operator-selected subset of devices
//!
//! The operator picks devices by 1-based index into a registry snapshot; the
//! selection string is comma-separated, tolerant of junk tokens, and preserves
//! operator order including duplicates. The sink file is only touched when at
//! least one index resolves to a device.

use crate::error::ClientResult;
use crate::telemetry::Device;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of one export request.
#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Rows written to the sink (file truncated and rewritten).
    Written(usize),
    /// No selection token resolved to a device; the sink was left untouched.
    NoValidSelection,
}

/// Writes selected devices to a CSV file.
#[derive(Debug, Clone)]
pub struct SelectionExporter {
    path: PathBuf,
}

impl SelectionExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a raw selection string against a snapshot.
    ///
    /// Tokens that do not parse as integers or fall outside `1..=len` are
    /// discarded with a warning; surviving indices keep the operator's order
    /// and multiplicity.
    pub fn resolve_selection<'a>(input: &str, snapshot: &'a [Device]) -> Vec<&'a Device> {
        let mut selected = Vec::new();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.parse::<usize>() {
                Ok(index) if (1..=snapshot.len()).contains(&index) => {
                    selected.push(&snapshot[index - 1]);
                }
                Ok(index) => {
                    warn!(index, "selection index out of range, skipping");
                }
                Err(_) => {
                    warn!(token, "selection token is not a number, skipping");
                }
            }
        }
        selected
    }

    /// Export the devices selected by `input` out of `snapshot`.
    ///
    /// Writes a header row plus one row per selected device. An existing file
    /// is truncated; with no valid selection nothing is created or modified.
    pub fn export(&self, snapshot: &[Device], input: &str) -> ClientResult<ExportOutcome> {
        let selected = Self::resolve_selection(input, snapshot);
        if selected.is_empty() {
            warn!("no valid devices selected, export skipped");
            return Ok(ExportOutcome::NoValidSelection);
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for device in &selected {
            writer.serialize(device)?;
        }
        writer.flush()?;

        info!(
            path = %self.path.display(),
            rows = selected.len(),
            "device selection exported"
        );
        Ok(ExportOutcome::Written(selected.len()))
    }
}
