//! Error types for the compiler core
//!
//! Builder-time and pass-level failures are typed variants here; soft issues
//! that do not abort a pass accumulate as [`crate::diag::Diagnostic`]s
//! instead.

use thiserror::Error;

use crate::diag::Report;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the builder, the registries and the compile passes
#[derive(Error, Debug)]
pub enum Error {
    /// No component with this name is registered
    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    /// No package with this name is registered
    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    /// No device with this name is registered
    #[error("unknown device '{0}'")]
    UnknownDevice(String),

    /// A registry already holds an entry with this name
    #[error("{kind} '{name}' is already registered")]
    AlreadyRegistered { kind: &'static str, name: String },

    /// The component declares no function with this name
    #[error("component '{component}' has no function '{function}'")]
    UnknownFunction {
        component: String,
        function: String,
    },

    /// Two sibling elements share a name that must be unique
    #[error("duplicate {kind} name '{name}' in '{scope}'")]
    DuplicateName {
        kind: &'static str,
        name: String,
        scope: String,
    },

    /// A function name is declared both as a bus function and a plain function
    #[error("component '{component}': function '{function}' mixes bus and non-bus declarations")]
    MixedFunctionKinds {
        component: String,
        function: String,
    },

    /// The inner circuit of a subinst declares no port with this name
    #[error("circuit '{circuit}' has no port '{port}'")]
    UnknownPort { circuit: String, port: String },

    /// A subinst port already has an external binding
    #[error("port '{port}' of '{subinst}' is already bound")]
    PortAlreadyBound { subinst: String, port: String },

    /// A bus-group assignment listed a different number of functions and targets
    #[error("bus assignment on '{inst}': {functions} function(s) but {targets} target(s)")]
    BusArityMismatch {
        inst: String,
        functions: usize,
        targets: usize,
    },

    /// A device map names a pin the component does not have
    #[error("device '{device}': component '{component}' has no pin '{pin}'")]
    UnmappedPin {
        device: String,
        component: String,
        pin: String,
    },

    /// A device map names a pad the package does not have
    #[error("device '{device}': package '{package}' has no pad '{pad}'")]
    UnmappedPad {
        device: String,
        package: String,
        pad: String,
    },

    /// A device leaves a non-optional pin without a pad
    #[error("device '{device}': pin '{pin}' is not optional and has no pad")]
    MissingPadMap { device: String, pin: String },

    /// A referenced element uid could not be resolved in its arena
    #[error("no {kind} with uid {uid}")]
    UnknownUid { kind: &'static str, uid: u64 },

    /// A compile pass finished with fatal diagnostics; the report holds them all
    #[error("{pass} failed with {errors} error(s)")]
    PassFailed {
        pass: &'static str,
        errors: usize,
        report: Report,
    },

    /// Persisted document misses a required key or holds an unexpected value
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// JSON serialization or parsing error
    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while reading or writing a document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::PassFailed`] from a finished report, draining it
    pub(crate) fn pass_failed(pass: &'static str, report: &mut Report) -> Self {
        let report = std::mem::take(report);
        Error::PassFailed {
            pass,
            errors: report.error_count(),
            report,
        }
    }
}
