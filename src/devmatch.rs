//! Device matching: picking a concrete package for each inst
//!
//! An inst's free-text value conflates electrical values (`10k`) with
//! packaging hints (`0805`), so every whitespace token is probed against the
//! device inventory by device name and package name. The first matching
//! token wins; without a match the first device in declaration order is used
//! and flagged.

use crate::diag::{DiagnosticCode, Report};
use crate::errors::Result;
use crate::library;
use crate::netlist::Netlist;
use crate::units::Value;

/// Bind a device to one inst of the netlist
pub fn match_device(netlist: &mut Netlist, inst_uid: u64, report: &mut Report) -> Result<()> {
    let inst = match netlist.inst_by_uid(inst_uid) {
        Some(inst) => inst,
        None => return Ok(()),
    };
    let devices = library::devices_by_component(&inst.component);
    if devices.is_empty() {
        report.push(
            DiagnosticCode::NoDeviceForComponent,
            inst_uid,
            format!(
                "no device is registered for component '{}' of '{}'",
                inst.component.name, inst.name
            ),
        );
        return Ok(());
    }

    let value = inst.value.clone();
    let inst_name = inst.name.clone();
    let selected = match &value {
        Some(value) => {
            let mut found = None;
            for token in value.split_whitespace() {
                if let Some(parsed) = Value::parse(token) {
                    log::debug!("{}: value token '{}' = {}", inst_name, token, parsed.pretty());
                }
                let hit = devices.iter().find(|d| {
                    d.name.eq_ignore_ascii_case(token) || d.package.name.eq_ignore_ascii_case(token)
                });
                if let Some(device) = hit {
                    found = Some(device.clone());
                    break;
                }
            }
            match found {
                Some(device) => device,
                None => {
                    // Nothing in the value names a device; fall back to the
                    // first of the inventory, deterministically.
                    report.push(
                        DiagnosticCode::RandomDeviceSelected,
                        inst_uid,
                        format!(
                            "value '{}' of '{}' names no device; using '{}'",
                            value, inst_name, devices[0].name
                        ),
                    );
                    devices[0].clone()
                }
            }
        }
        None => {
            report.push(
                DiagnosticCode::RandomDeviceSelected,
                inst_uid,
                format!(
                    "'{}' has no value; using device '{}'",
                    inst_name, devices[0].name
                ),
            );
            devices[0].clone()
        }
    };

    log::debug!("{}: device '{}'", inst_name, selected.name);
    debug_assert_eq!(selected.component.name, netlist.inst_by_uid(inst_uid).unwrap().component.name);
    if let Some(inst) = netlist.inst_by_uid_mut(inst_uid) {
        inst.device = Some(selected);
    }
    Ok(())
}
