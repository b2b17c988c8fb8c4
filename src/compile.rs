//! The compile pipeline
//!
//! `compile` chains the passes in order: elaboration, then pin assignment
//! and device matching over every inst, then the electrical analysis. A
//! pass with fatal findings finishes over all its insts first, so sibling
//! failures batch into one report, and then aborts the pipeline.

use crate::circuit::Circuit;
use crate::devmatch::match_device;
use crate::diag::Report;
use crate::erc::analyze;
use crate::errors::{Error, Result};
use crate::netlist::{elaborate, Netlist};
use crate::pinassign::{assign_pins, check_required_pins};

/// A fully annotated netlist plus everything the passes reported
#[derive(Debug)]
pub struct Compiled {
    pub netlist: Netlist,
    pub report: Report,
}

impl Compiled {
    /// Nonzero iff any error-severity diagnostic was emitted
    pub fn exit_code(&self) -> i32 {
        self.report.exit_code()
    }
}

/// Compile a top-level circuit into a flat, fully-bound netlist
pub fn compile(top: &Circuit) -> Result<Compiled> {
    let mut report = Report::new();
    let mut netlist = elaborate(top, &mut report)?;
    let inst_uids: Vec<u64> = netlist.insts.iter().map(|i| i.uid).collect();

    let fatal_before = report.fatal_count();
    for &uid in &inst_uids {
        assign_pins(&mut netlist, uid, &mut report)?;
        check_required_pins(&netlist, uid, &mut report)?;
    }
    if report.fatal_count() > fatal_before {
        return Err(Error::pass_failed("pin assignment", &mut report));
    }

    let fatal_before = report.fatal_count();
    for &uid in &inst_uids {
        match_device(&mut netlist, uid, &mut report)?;
    }
    if report.fatal_count() > fatal_before {
        return Err(Error::pass_failed("device matching", &mut report));
    }

    analyze(&mut netlist, &mut report);

    log::info!(
        "compiled '{}': {} error(s), {} warning(s)",
        netlist.name,
        report.error_count(),
        report.warning_count()
    );
    Ok(Compiled { netlist, report })
}
