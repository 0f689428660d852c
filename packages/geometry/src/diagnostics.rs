//! Aggregated per-record diagnostics.
//!
//! Batch operations never abort on a single bad record. Instead they skip
//! or repair it and push a [`Diagnostic`] here, so the caller can report a
//! summary once the batch is done.

use std::collections::BTreeMap;

use strum::{AsRefStr, Display};

use crate::GeometryError;

/// Category of a recoverable, per-record problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticKind {
    /// Record violated the kind/coordinate-count invariant and was dropped.
    InvalidGeometry,
    /// Simplification would have produced a degenerate ring; the original
    /// ring was kept.
    DegenerateSimplification,
    /// Erosion removed a polygon entirely; the feature was dropped.
    EmptyAfterBuffer,
    /// Polygon ring crosses itself; passed through uncorrected.
    SelfIntersection,
}

/// A single recorded problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// What went wrong.
    pub kind: DiagnosticKind,
    /// Identifier of the affected record or feature.
    pub id: String,
    /// Optional human-readable detail.
    pub detail: Option<String>,
}

/// Collection of [`Diagnostic`]s from one or more batch operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a problem.
    pub fn record(&mut self, kind: DiagnosticKind, id: impl Into<String>, detail: Option<String>) {
        self.entries.push(Diagnostic {
            kind,
            id: id.into(),
            detail,
        });
    }

    /// Records a [`GeometryError`] under the matching kind.
    pub fn record_error(&mut self, fallback_id: &str, error: &GeometryError) {
        match error {
            GeometryError::InvalidGeometry { id, reason } => {
                self.record(DiagnosticKind::InvalidGeometry, id.clone(), Some(reason.to_string()));
            }
            GeometryError::InvalidTolerance(_) => {
                self.record(DiagnosticKind::InvalidGeometry, fallback_id, Some(error.to_string()));
            }
        }
    }

    /// All recorded entries in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of the given kind.
    #[must_use]
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Identifiers recorded under the given kind, in recording order.
    #[must_use]
    pub fn ids(&self, kind: DiagnosticKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.id.as_str())
            .collect()
    }

    /// Counts per kind, omitting kinds with no entries.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Appends all entries of `other`.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Logs one warning line per kind, with a few example identifiers.
    /// Every entry is logged individually at debug level.
    pub fn log_summary(&self, stage: &str) {
        const EXAMPLES: usize = 5;

        for (kind, count) in self.summary() {
            let ids = self.ids(kind);
            let examples = ids[..ids.len().min(EXAMPLES)].join(", ");
            let more = if ids.len() > EXAMPLES { ", ..." } else { "" };
            log::warn!("{stage}: {count} {kind} ({examples}{more})");
        }

        for entry in &self.entries {
            match &entry.detail {
                Some(detail) => log::debug!("{stage}: {} {}: {detail}", entry.kind, entry.id),
                None => log::debug!("{stage}: {} {}", entry.kind, entry.id),
            }
        }
    }
}
