//! Post-compile invariant checks over a flat netlist
//!
//! Callers and tests can assert the contract a compiled netlist is supposed
//! to honor: every assign lands on an existing net, inst names are unique,
//! an inst's assigns occupy distinct pins, bus-grouped assigns resolve to
//! one bus, and every bound device realizes the inst's component.

use ahash::{AHashMap, AHashSet};
use std::fmt;

use crate::circuit::Target;
use crate::netlist::Netlist;

/// A broken invariant, with a human-readable description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DanglingAssign { assign: u64, detail: String },
    DuplicateInstName { name: String },
    PinCollision { inst: String, pin: String },
    IncoherentBusGroup { inst: String, guid: u64 },
    DeviceMismatch { inst: String, device: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DanglingAssign { assign, detail } => {
                write!(f, "assign {} dangles: {}", assign, detail)
            }
            Violation::DuplicateInstName { name } => {
                write!(f, "inst name '{}' occurs more than once", name)
            }
            Violation::PinCollision { inst, pin } => {
                write!(f, "'{}' binds pin '{}' more than once", inst, pin)
            }
            Violation::IncoherentBusGroup { inst, guid } => {
                write!(f, "'{}' has a bus-group ({}) spanning buses", inst, guid)
            }
            Violation::DeviceMismatch { inst, device } => {
                write!(f, "'{}' bound to device '{}' of another component", inst, device)
            }
        }
    }
}

/// Check every invariant; an empty result means the netlist is consistent
pub fn validate_netlist(netlist: &Netlist) -> Vec<Violation> {
    let mut violations = Vec::new();

    let net_uids: AHashSet<u64> = netlist.nets.iter().map(|n| n.uid).collect();
    for assign in &netlist.assigns {
        match assign.to {
            Target::Net(uid) if net_uids.contains(&uid) => {}
            Target::Net(uid) => violations.push(Violation::DanglingAssign {
                assign: assign.uid,
                detail: format!("target net {} is not in the netlist", uid),
            }),
            Target::Port(uid) => violations.push(Violation::DanglingAssign {
                assign: assign.uid,
                detail: format!("still targets port {}", uid),
            }),
        }
        if netlist.inst_by_uid(assign.inst).is_none() {
            violations.push(Violation::DanglingAssign {
                assign: assign.uid,
                detail: format!("owning inst {} is not in the netlist", assign.inst),
            });
        }
    }

    let mut names: AHashSet<&str> = AHashSet::new();
    for inst in &netlist.insts {
        if !names.insert(&inst.name) {
            violations.push(Violation::DuplicateInstName {
                name: inst.name.clone(),
            });
        }
    }

    for inst in &netlist.insts {
        let mut pins: AHashSet<usize> = AHashSet::new();
        let mut group_bus: AHashMap<u64, i64> = AHashMap::new();
        for assign in netlist.assigns.iter().filter(|a| a.inst == inst.uid) {
            let pin = match assign.pin {
                Some(pin) => pin,
                None => continue,
            };
            if !pins.insert(pin) {
                violations.push(Violation::PinCollision {
                    inst: inst.name.clone(),
                    pin: inst
                        .component
                        .pins
                        .get(pin)
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| format!("#{}", pin)),
                });
            }
            let bus_id = inst
                .component
                .funs_by_function(&assign.function)
                .find(|f| f.pin == pin)
                .map(|f| f.bus_id);
            if let Some(bus_id) = bus_id {
                match group_bus.get(&assign.guid) {
                    Some(&known) if known != bus_id => {
                        violations.push(Violation::IncoherentBusGroup {
                            inst: inst.name.clone(),
                            guid: assign.guid,
                        });
                    }
                    _ => {
                        group_bus.insert(assign.guid, bus_id);
                    }
                }
            }
        }

        if let Some(device) = &inst.device {
            if device.component.name != inst.component.name {
                violations.push(Violation::DeviceMismatch {
                    inst: inst.name.clone(),
                    device: device.name.clone(),
                });
            }
        }
    }

    violations
}
