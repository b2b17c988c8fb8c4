//! # Circuit Compiler
//!
//! Compiler core turning a hierarchical, under-specified circuit description
//! into a flat, fully-bound netlist with consistent pin assignments, device
//! bindings, signal-flow direction and electrical-rule checks.
//!
//! The pipeline runs as a sequence of passes over one in-memory IR:
//! the builder records a tree of [`Circuit`]s, [`netlist::elaborate`] lowers
//! the tree into a flat [`Netlist`], [`pinassign`] binds abstract pin
//! functions to concrete pins through a constraint solver, [`devmatch`]
//! picks a concrete package for every inst, and [`erc`] classifies nets,
//! resolves signal-flow roles and reports electrical violations.
//! [`compile`] drives all of it in order.

// Core modules
pub mod circuit;
pub mod compile;
pub mod component;
pub mod devmatch;
pub mod device;
pub mod diag;
pub mod erc;
pub mod errors;
pub mod library;
pub mod netlist;
pub mod package;
pub mod pinassign;
pub mod render;
pub mod solver;
pub mod units;
pub mod validate;
pub mod voltage;

// Re-export main types
pub use circuit::{
    AssignTarget, Circuit, ErcRole, Inst, InstAssign, InstId, Net, NetId, NetType, Port,
    PortAssign, PortId, PortType, SubInst, SubInstId, Target,
};
pub use compile::{compile, Compiled};
pub use component::{Component, Fun, FunSpec, Pin, PinSpec, PinType};
pub use device::Device;
pub use diag::{Diagnostic, DiagnosticCode, Report, Severity};
pub use errors::{Error, Result};
pub use netlist::{elaborate, Netlist, NetlistStats};
pub use package::Package;
