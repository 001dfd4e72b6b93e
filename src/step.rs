//! Step outcome types shared by the runner and the individual steps
//!
//! Every external operation the runner performs is classified into one of the
//! `StepStatus` variants below. The classification is the contract: only
//! `FailedFatal` stops the sequence, everything else lets the run continue.

use serde::Serialize;

/// Outcome classification for one bootstrap step
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum StepStatus {
    /// The step performed its work
    #[strum(serialize = "succeeded")]
    Succeeded,
    /// The step's effect was already in place; nothing was done
    #[strum(serialize = "skipped_already_satisfied")]
    SkippedAlreadySatisfied,
    /// A prerequisite (config value, upstream artifact) was absent
    #[strum(serialize = "skipped_dependency_missing")]
    SkippedDependencyMissing,
    /// The step failed but the run continues
    #[strum(serialize = "failed_non_fatal")]
    FailedNonFatal,
    /// The step failed and the run must stop
    #[strum(serialize = "failed_fatal")]
    FailedFatal,
}

impl StepStatus {
    /// Whether the runner may proceed to the next step
    pub fn allows_continuation(self) -> bool {
        !matches!(self, Self::FailedFatal)
    }
}

// Audit lines and tracing output must show the same token for a status, so
// serialization goes through the strum string form rather than the variant
// name.
impl Serialize for StepStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// Status plus optional human-readable detail for the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub detail: Option<String>,
}

impl StepOutcome {
    /// The step did its work
    pub fn succeeded() -> Self {
        Self {
            status: StepStatus::Succeeded,
            detail: None,
        }
    }

    /// The step did its work; `detail` records something worth auditing
    pub fn succeeded_with(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Succeeded,
            detail: Some(detail.into()),
        }
    }

    /// The step's effect was already in place
    pub fn already_satisfied(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::SkippedAlreadySatisfied,
            detail: Some(detail.into()),
        }
    }

    /// A prerequisite was absent; this is an expected skip, not an error
    pub fn dependency_missing(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::SkippedDependencyMissing,
            detail: Some(detail.into()),
        }
    }

    /// The step failed but the run continues
    pub fn failed_non_fatal(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::FailedNonFatal,
            detail: Some(detail.into()),
        }
    }

    /// The step failed and the run must stop
    pub fn failed_fatal(detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::FailedFatal,
            detail: Some(detail.into()),
        }
    }
}

/// One audit record, serialized as a JSON line in the host log
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// UTC timestamp when the step finished
    pub finished_at: chrono::DateTime<chrono::Utc>,
    /// Step name
    pub step: &'static str,
    /// Outcome classification
    pub status: StepStatus,
    /// Optional error or skip detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Step duration in seconds
    pub duration_secs: f64,
}

/// Accumulated outcome of one bootstrap run
#[derive(Debug, Default)]
pub struct RunReport {
    records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished step
    pub fn push(&mut self, record: StepRecord) {
        self.records.push(record);
    }

    /// All records, in execution order
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Whether any step failed fatally
    pub fn has_fatal(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.status == StepStatus::FailedFatal)
    }

    /// Count of records with the given status
    pub fn count(&self, status: StepStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// One-line summary for the end of the run
    pub fn summary(&self) -> String {
        format!(
            "{} steps: {} succeeded, {} already satisfied, {} skipped, {} non-fatal failures, {} fatal",
            self.records.len(),
            self.count(StepStatus::Succeeded),
            self.count(StepStatus::SkippedAlreadySatisfied),
            self.count(StepStatus::SkippedDependencyMissing),
            self.count(StepStatus::FailedNonFatal),
            self.count(StepStatus::FailedFatal),
        )
    }
}
