//! Pin assignment: binding abstract functions to concrete pins
//!
//! Each inst poses a small constraint problem over its assigns. An assign
//! gets three integer variables for the chosen function, that function's pin
//! and its bus, tied together by implications over the component's function
//! table. Assigns created as one bus-group share a bus variable, and
//! functions, pins and group buses are pairwise distinct across the inst.
//! The solved model is written back onto the assigns.

use indexmap::IndexMap;

use crate::diag::{DiagnosticCode, Report};
use crate::errors::Result;
use crate::netlist::Netlist;
use crate::solver::{Constraint, Satisfiability, Solver, Var};

struct AssignVars {
    /// Index into `netlist.assigns`
    assign: usize,
    fun: Var,
    pin: Var,
    bus: Var,
}

/// Solve the pin-assignment problem of one inst and write the model back
pub fn assign_pins(netlist: &mut Netlist, inst_uid: u64, report: &mut Report) -> Result<()> {
    let indices = netlist.assign_indices_of_inst(inst_uid);
    if indices.is_empty() {
        return Ok(());
    }
    let inst = match netlist.inst_by_uid(inst_uid) {
        Some(inst) => inst,
        None => return Ok(()),
    };
    let component = inst.component.clone();
    let inst_name = inst.name.clone();

    let mut solver = Solver::new();
    let mut vars: Vec<AssignVars> = Vec::new();
    for &index in &indices {
        let assign = &netlist.assigns[index];
        let fun = solver.int_var(format!("{}_fun", assign.uid));
        let pin = solver.int_var(format!("{}_pin", assign.uid));
        let bus = solver.int_var(format!("{}_bus", assign.uid));

        let mut candidates = Vec::new();
        for candidate in component.funs_by_function(&assign.function) {
            candidates.push(Constraint::EqConst(fun, candidate.id as i64));
            solver.add(Constraint::implies(
                Constraint::EqConst(fun, candidate.id as i64),
                Constraint::And(vec![
                    Constraint::EqConst(pin, candidate.pin as i64),
                    Constraint::EqConst(bus, candidate.bus_id),
                ]),
            ));
        }
        if candidates.is_empty() {
            report.push(
                DiagnosticCode::UnknownFunction,
                netlist.assigns[index].uid,
                format!(
                    "component '{}' has no function '{}' for {}",
                    component.name,
                    assign.function,
                    netlist.qualified_assign_name(assign)
                ),
            );
            return Ok(());
        }
        solver.add(Constraint::Or(candidates));
        vars.push(AssignVars {
            assign: index,
            fun,
            pin,
            bus,
        });
    }

    // Bus-groups: members share one bus variable.
    let mut groups: IndexMap<u64, Vec<usize>> = IndexMap::new();
    for (slot, &index) in indices.iter().enumerate() {
        groups
            .entry(netlist.assigns[index].guid)
            .or_default()
            .push(slot);
    }
    let mut group_vars = Vec::new();
    for (guid, members) in &groups {
        let group = solver.int_var(format!("{}_group_bus", guid));
        for &slot in members {
            solver.add(Constraint::EqVar(group, vars[slot].bus));
        }
        group_vars.push(group);
    }

    solver.add(Constraint::Distinct(vars.iter().map(|v| v.fun).collect()));
    solver.add(Constraint::Distinct(vars.iter().map(|v| v.pin).collect()));
    solver.add(Constraint::Distinct(group_vars));

    match solver.check() {
        Satisfiability::Sat(model) => {
            for var in &vars {
                let pin = model.value(var.pin) as usize;
                let assign = &mut netlist.assigns[var.assign];
                assign.pin = Some(pin);
                assign.pin_type = Some(component.pins[pin].pin_type);
                log::debug!(
                    "{}: function '{}' on pin '{}'",
                    inst_name,
                    assign.function,
                    component.pins[pin].name
                );
            }
            debug_assert!(verify_model(netlist, &indices), "inconsistent pin model");
            Ok(())
        }
        Satisfiability::Unsat => {
            report.push(
                DiagnosticCode::UnsatisfiablePinAssignment,
                inst_uid,
                format!(
                    "no consistent pin assignment for '{}' ({} assigns on '{}')",
                    inst_name,
                    indices.len(),
                    component.name
                ),
            );
            Ok(())
        }
    }
}

/// Warn about non-optional pins no assign landed on
pub fn check_required_pins(netlist: &Netlist, inst_uid: u64, report: &mut Report) -> Result<()> {
    let inst = match netlist.inst_by_uid(inst_uid) {
        Some(inst) => inst,
        None => return Ok(()),
    };
    let indices = netlist.assign_indices_of_inst(inst_uid);
    // An inst whose assigns never resolved already carries a fatal
    // diagnostic; repeating it per pin would only add noise.
    if !indices.is_empty() && indices.iter().all(|&i| netlist.assigns[i].pin.is_none()) {
        return Ok(());
    }
    let mut missing = Vec::new();
    for (pin_id, pin) in inst.component.pins.iter().enumerate() {
        if pin.optional {
            continue;
        }
        let covered = indices
            .iter()
            .any(|&i| netlist.assigns[i].pin == Some(pin_id));
        if !covered {
            missing.push(pin.name.clone());
        }
    }
    if !missing.is_empty() {
        report.push(
            DiagnosticCode::MissingRequiredPin,
            inst_uid,
            format!(
                "'{}' leaves required pin(s) unconnected: {}",
                inst.name,
                missing.join(", ")
            ),
        );
    }
    Ok(())
}

/// Mirror of the solver-side distinctness constraints over the written model
fn verify_model(netlist: &Netlist, indices: &[usize]) -> bool {
    let mut pins = Vec::new();
    let mut group_bus: IndexMap<u64, i64> = IndexMap::new();
    for &index in indices {
        let assign = &netlist.assigns[index];
        let pin = match assign.pin {
            Some(pin) => pin,
            None => return false,
        };
        if pins.contains(&pin) {
            return false;
        }
        pins.push(pin);

        let inst = match netlist.inst_by_uid(assign.inst) {
            Some(inst) => inst,
            None => return false,
        };
        let bus_id = inst
            .component
            .funs_by_function(&assign.function)
            .find(|f| f.pin == pin)
            .map(|f| f.bus_id);
        let bus_id = match bus_id {
            Some(bus_id) => bus_id,
            None => return false,
        };
        match group_bus.get(&assign.guid) {
            Some(&known) if known != bus_id => return false,
            _ => {
                group_bus.insert(assign.guid, bus_id);
            }
        }
    }
    let mut buses: Vec<i64> = group_bus.values().copied().collect();
    buses.sort_unstable();
    buses.dedup();
    buses.len() == group_bus.len()
}
