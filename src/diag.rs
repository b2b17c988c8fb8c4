//! Diagnostic records and the compile report
//!
//! Every pass reports issues through the same record shape: a severity, a
//! stable code, a human-readable message naming subjects by their qualified
//! names, and the uid of the offending element. The [`Report`] deduplicates
//! per subject and code so an issue surfaces once even when several passes
//! would notice it.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable diagnostic codes emitted by the compile passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Structural
    CyclicPortBinding,
    UnconnectedPort,
    DuplicateName,
    UnknownComponent,
    UnknownFunction,
    // Binding
    UnsatisfiablePinAssignment,
    NoDeviceForComponent,
    // Soft binding
    RandomDeviceSelected,
    MissingRequiredPin,
    UnconnectedNet,
    UnusedPort,
    // Electrical
    ErcConflict,
    UnresolvedErcRole,
}

impl DiagnosticCode {
    /// The severity this code always carries
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::CyclicPortBinding
            | DiagnosticCode::UnconnectedPort
            | DiagnosticCode::DuplicateName
            | DiagnosticCode::UnknownComponent
            | DiagnosticCode::UnknownFunction
            | DiagnosticCode::UnsatisfiablePinAssignment
            | DiagnosticCode::NoDeviceForComponent => Severity::Error,
            DiagnosticCode::RandomDeviceSelected
            | DiagnosticCode::MissingRequiredPin
            | DiagnosticCode::UnconnectedNet
            | DiagnosticCode::UnusedPort => Severity::Warning,
            // Electrical issues are reported but never abort the pipeline.
            DiagnosticCode::ErcConflict | DiagnosticCode::UnresolvedErcRole => Severity::Error,
        }
    }

    /// Whether this code aborts its pass once the pass has completed
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticCode::CyclicPortBinding
                | DiagnosticCode::UnconnectedPort
                | DiagnosticCode::DuplicateName
                | DiagnosticCode::UnknownComponent
                | DiagnosticCode::UnknownFunction
                | DiagnosticCode::UnsatisfiablePinAssignment
                | DiagnosticCode::NoDeviceForComponent
        )
    }
}

/// A single reported issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// uid of the offending element
    pub subject: u64,
    /// uids of further involved elements (e.g. the second assign of a conflict)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<u64>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:?}]: {}", self.severity, self.code, self.message)
    }
}

/// Accumulated diagnostics of one compile run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    seen: AHashSet<(DiagnosticCode, u64)>,
}

impl Report {
    pub fn new() -> Self {
        Report::default()
    }

    /// Record a diagnostic; one per subject and code
    pub fn push(&mut self, code: DiagnosticCode, subject: u64, message: impl Into<String>) {
        self.push_related(code, subject, Vec::new(), message);
    }

    /// Record a diagnostic with further involved elements attached
    pub fn push_related(
        &mut self,
        code: DiagnosticCode,
        subject: u64,
        related: Vec<u64>,
        message: impl Into<String>,
    ) {
        if !self.seen.insert((code, subject)) {
            return;
        }
        let diag = Diagnostic {
            severity: code.severity(),
            code,
            message: message.into(),
            subject,
            related,
        };
        log::debug!("{}", diag);
        self.diagnostics.push(diag);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of fatal diagnostics recorded by the currently running pass kinds
    pub fn fatal_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.code.is_fatal()).count()
    }

    /// Count of diagnostics carrying a specific code
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// Process exit code contract: nonzero iff any error-severity diagnostic
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diag in &self.diagnostics {
            writeln!(f, "{}", diag)?;
        }
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.error_count(),
            self.warning_count()
        )
    }
}
