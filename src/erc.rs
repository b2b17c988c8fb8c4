//! Electrical-rule checks and signal-path analysis
//!
//! The analysis runs in-place on a flat netlist: it types every net from the
//! voltage grammar, seeds driver/receiver roles from pin and port types,
//! walks maximal paths through two-terminal nets and passive two-terminal
//! insts to resolve unknown roles and surface conflicts, infers flow
//! direction per path, swaps the pins of two-terminal insts whose bindings
//! disagree with the flow, and finally prunes boundary ports and dead nets.
//!
//! Electrical findings never abort the pipeline; they accumulate into the
//! report and the annotated netlist is still returned.

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::circuit::{ErcRole, NetType, PortType, Target};
use crate::component::PinType;
use crate::diag::{DiagnosticCode, Report};
use crate::netlist::Netlist;
use crate::voltage;

/// An assign in the flat netlist: inst assigns and boundary-port assigns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ARef {
    Inst(usize),
    Port(usize),
}

/// How two consecutive path members relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rel {
    AcrossNet,
    ThroughInst,
}

/// Run the full analysis in-place
pub fn analyze(netlist: &mut Netlist, report: &mut Report) {
    log::info!("analyzing '{}'", netlist.name);
    classify_nets(netlist);
    seed_roles(netlist);
    walk_paths(netlist, report);
    check_drivers(netlist, report);
    prune(netlist);
}

/// Net typing: the net's own reserved name first, then the first assign
/// whose pin or port yields a voltage
fn classify_nets(netlist: &mut Netlist) {
    for index in 0..netlist.nets.len() {
        let net_uid = netlist.nets[index].uid;
        let mut volts = voltage::parse(&netlist.nets[index].name);
        if volts.is_none() {
            for assign in &netlist.assigns {
                if assign.to != Target::Net(net_uid) {
                    continue;
                }
                let inst = match netlist.inst_by_uid(assign.inst) {
                    Some(inst) => inst,
                    None => continue,
                };
                if let Some(pin) = assign.pin {
                    volts = inst.component.pin_voltage(pin);
                    if volts.is_some() {
                        break;
                    }
                }
            }
        }
        if volts.is_none() {
            for port_assign in &netlist.port_assigns {
                if port_assign.to != Target::Net(net_uid) {
                    continue;
                }
                if let Some(port) = netlist.port_by_uid(port_assign.port) {
                    volts = port.voltage();
                    if volts.is_some() {
                        break;
                    }
                }
            }
        }
        let net_type = match volts {
            Some(v) if v > 0.0 => NetType::Vcc,
            Some(v) if v < 0.0 => NetType::Vee,
            Some(_) => NetType::Gnd,
            None => NetType::Signal,
        };
        let net = &mut netlist.nets[index];
        if net_type != NetType::Signal {
            log::debug!("net '{}' typed {:?}", net.name, net_type);
        }
        net.net_type = net_type;
    }
}

/// Initial roles from declared pin types; port assigns carry the external
/// role of their port (the internal view is its inverse)
fn seed_roles(netlist: &mut Netlist) {
    for assign in &mut netlist.assigns {
        assign.role = match assign.pin_type {
            Some(PinType::Out) | Some(PinType::Gnd) => ErcRole::Output,
            Some(PinType::Power) | Some(PinType::In) => ErcRole::Input,
            _ => ErcRole::Unknown,
        };
    }
    let roles: Vec<(usize, ErcRole)> = netlist
        .port_assigns
        .iter()
        .enumerate()
        .map(|(index, port_assign)| {
            let role = netlist
                .port_by_uid(port_assign.port)
                .map(|port| match port.port_type {
                    PortType::Out => ErcRole::Output,
                    PortType::In | PortType::Power | PortType::Gnd => ErcRole::Input,
                })
                .unwrap_or(ErcRole::Unknown);
            (index, role)
        })
        .collect();
    for (index, role) in roles {
        netlist.port_assigns[index].role = role;
    }
}

fn net_uid_of(netlist: &Netlist, aref: ARef) -> Option<u64> {
    let target = match aref {
        ARef::Inst(index) => netlist.assigns[index].to,
        ARef::Port(index) => netlist.port_assigns[index].to,
    };
    match target {
        Target::Net(uid) => Some(uid),
        Target::Port(_) => None,
    }
}

fn role_of(netlist: &Netlist, aref: ARef) -> ErcRole {
    match aref {
        ARef::Inst(index) => netlist.assigns[index].role,
        ARef::Port(index) => netlist.port_assigns[index].role,
    }
}

fn set_role(netlist: &mut Netlist, aref: ARef, role: ErcRole) {
    match aref {
        ARef::Inst(index) => netlist.assigns[index].role = role,
        ARef::Port(index) => netlist.port_assigns[index].role = role,
    }
}

fn uid_of(netlist: &Netlist, aref: ARef) -> u64 {
    match aref {
        ARef::Inst(index) => netlist.assigns[index].uid,
        ARef::Port(index) => netlist.port_assigns[index].uid,
    }
}

fn describe(netlist: &Netlist, aref: ARef) -> String {
    match aref {
        ARef::Inst(index) => netlist.qualified_assign_name(&netlist.assigns[index]),
        ARef::Port(index) => {
            let port_assign = &netlist.port_assigns[index];
            netlist
                .port_by_uid(port_assign.port)
                .map(|p| format!("{}.{}", netlist.name, p.name))
                .unwrap_or_else(|| format!("port uid {}", port_assign.port))
        }
    }
}

/// Role the second member must hold given the first member's role
fn expected_role(role: ErcRole, rel: Rel, from: ARef, to: ARef) -> ErcRole {
    match rel {
        Rel::ThroughInst => role.inverse(),
        Rel::AcrossNet => match (from, to) {
            // Port roles are external-facing, which already encodes the
            // inversion at the boundary.
            (ARef::Inst(_), ARef::Port(_)) | (ARef::Port(_), ARef::Inst(_)) => role,
            _ => role.inverse(),
        },
    }
}

struct Path {
    members: Vec<ARef>,
    rels: Vec<Rel>,
    /// Net that terminated the walk, when it ended on a net
    end_net: Option<u64>,
}

fn walk_paths(netlist: &mut Netlist, report: &mut Report) {
    // Index nets and insts once; the maps hold indices, not borrows.
    let mut net_map: AHashMap<u64, SmallVec<[ARef; 4]>> = AHashMap::new();
    for (index, assign) in netlist.assigns.iter().enumerate() {
        if let Target::Net(uid) = assign.to {
            net_map.entry(uid).or_default().push(ARef::Inst(index));
        }
    }
    for (index, port_assign) in netlist.port_assigns.iter().enumerate() {
        if let Target::Net(uid) = port_assign.to {
            net_map.entry(uid).or_default().push(ARef::Port(index));
        }
    }
    let mut inst_slots: AHashMap<u64, SmallVec<[usize; 2]>> = AHashMap::new();
    for (index, assign) in netlist.assigns.iter().enumerate() {
        inst_slots.entry(assign.inst).or_default().push(index);
    }
    let two_terminal: AHashSet<u64> = netlist
        .insts
        .iter()
        .filter(|inst| {
            inst.component.pins.len() == 2
                && inst_slots.get(&inst.uid).map(|s| s.len()) == Some(2)
        })
        .map(|inst| inst.uid)
        .collect();
    let net_types: AHashMap<u64, NetType> =
        netlist.nets.iter().map(|n| (n.uid, n.net_type)).collect();

    // Entry points: insts with an assign count other than two, then the
    // design-boundary ports.
    let mut entries: Vec<ARef> = Vec::new();
    for inst in &netlist.insts {
        let slots = inst_slots.get(&inst.uid);
        if slots.map(|s| s.len()) != Some(2) {
            if let Some(slots) = slots {
                entries.extend(slots.iter().map(|&index| ARef::Inst(index)));
            }
        }
    }
    entries.extend((0..netlist.port_assigns.len()).map(ARef::Port));

    let mut visited: AHashSet<ARef> = AHashSet::new();
    for entry in entries {
        if visited.contains(&entry) {
            continue;
        }
        let path = collect_path(
            netlist,
            entry,
            &net_map,
            &inst_slots,
            &two_terminal,
            &net_types,
            &mut visited,
        );
        resolve_path(netlist, &path, &net_types, report);
    }
}

/// Walk outward from one entry assign, marking every member visited
fn collect_path(
    netlist: &Netlist,
    entry: ARef,
    net_map: &AHashMap<u64, SmallVec<[ARef; 4]>>,
    inst_slots: &AHashMap<u64, SmallVec<[usize; 2]>>,
    two_terminal: &AHashSet<u64>,
    net_types: &AHashMap<u64, NetType>,
    visited: &mut AHashSet<ARef>,
) -> Path {
    let mut path = Path {
        members: vec![entry],
        rels: Vec::new(),
        end_net: None,
    };
    visited.insert(entry);
    let mut current = entry;

    loop {
        let net_uid = match net_uid_of(netlist, current) {
            Some(uid) => uid,
            None => break,
        };
        let members = match net_map.get(&net_uid) {
            Some(members) => members,
            None => break,
        };
        // Paths chain through two-terminal signal nets; anything else is an
        // endpoint (power rails carry the flow context).
        if members.len() != 2
            || net_types.get(&net_uid).copied().unwrap_or(NetType::Signal) != NetType::Signal
        {
            path.end_net = Some(net_uid);
            break;
        }
        let other = match members.iter().find(|m| **m != current) {
            Some(&other) => other,
            None => break,
        };
        if !visited.insert(other) {
            // Revisiting an assign terminates the path at that boundary.
            break;
        }
        path.members.push(other);
        path.rels.push(Rel::AcrossNet);

        let next = match other {
            // A boundary port's far side is outside the design.
            ARef::Port(_) => break,
            ARef::Inst(index) => {
                let inst_uid = netlist.assigns[index].inst;
                if !two_terminal.contains(&inst_uid) {
                    break;
                }
                let partner = inst_slots
                    .get(&inst_uid)
                    .and_then(|slots| slots.iter().find(|&&s| s != index).copied());
                match partner {
                    Some(partner) => {
                        if !visited.insert(ARef::Inst(partner)) {
                            break;
                        }
                        ARef::Inst(partner)
                    }
                    None => break,
                }
            }
        };
        path.members.push(next);
        path.rels.push(Rel::ThroughInst);
        current = next;
    }
    path
}

/// Propagate roles over a collected path, then infer flow and swap pins
fn resolve_path(
    netlist: &mut Netlist,
    path: &Path,
    net_types: &AHashMap<u64, NetType>,
    report: &mut Report,
) {
    if path.members.len() < 2 {
        return;
    }

    propagate_roles(netlist, path, report);

    let seeded = path
        .members
        .iter()
        .any(|&m| role_of(netlist, m) != ErcRole::Unknown);
    if !seeded {
        let end_type = path
            .end_net
            .and_then(|uid| net_types.get(&uid).copied())
            .unwrap_or(NetType::Signal);
        if end_type == NetType::Signal {
            report.push_related(
                DiagnosticCode::UnresolvedErcRole,
                uid_of(netlist, path.members[0]).min(uid_of(netlist, path.members[1])),
                vec![uid_of(netlist, path.members[0]).max(uid_of(netlist, path.members[1]))],
                format!(
                    "roles of '{}' and '{}' cannot be resolved",
                    describe(netlist, path.members[0]),
                    describe(netlist, path.members[1])
                ),
            );
            return;
        }
        // All-passive path into a power rail: orient it by the rail and
        // propagate from the entry.
        let direction = rail_direction(end_type);
        let first_role = if direction > 0 {
            ErcRole::Output
        } else {
            ErcRole::Input
        };
        set_role(netlist, path.members[0], first_role);
        propagate_roles(netlist, path, report);
    }

    let direction = flow_direction(netlist, path, net_types);
    let is_signal_path = path.members.iter().all(|&m| {
        net_uid_of(netlist, m)
            .and_then(|uid| net_types.get(&uid).copied())
            .unwrap_or(NetType::Signal)
            == NetType::Signal
    });
    log::debug!(
        "path from '{}': {} member(s), direction {:?}, signal {}",
        describe(netlist, path.members[0]),
        path.members.len(),
        direction,
        is_signal_path
    );

    if let Some(direction) = direction {
        swap_pins_along(netlist, path, direction);
    }
}

/// Forward then backward propagation of known roles over the path
fn propagate_roles(netlist: &mut Netlist, path: &Path, report: &mut Report) {
    for i in 0..path.rels.len() {
        let (a, b) = (path.members[i], path.members[i + 1]);
        let role_a = role_of(netlist, a);
        if role_a == ErcRole::Unknown {
            continue;
        }
        let expected = expected_role(role_a, path.rels[i], a, b);
        match role_of(netlist, b) {
            ErcRole::Unknown => set_role(netlist, b, expected),
            actual if actual != expected => conflict(netlist, a, b, report),
            _ => {}
        }
    }
    for i in (0..path.rels.len()).rev() {
        let (a, b) = (path.members[i], path.members[i + 1]);
        let role_b = role_of(netlist, b);
        if role_b == ErcRole::Unknown || role_of(netlist, a) != ErcRole::Unknown {
            continue;
        }
        // The relations are symmetric, so the same table applies backwards.
        let expected = expected_role(role_b, path.rels[i], b, a);
        set_role(netlist, a, expected);
    }
}

fn conflict(netlist: &Netlist, a: ARef, b: ARef, report: &mut Report) {
    let (ua, ub) = (uid_of(netlist, a), uid_of(netlist, b));
    report.push_related(
        DiagnosticCode::ErcConflict,
        ua.min(ub),
        vec![ua.max(ub)],
        format!(
            "incompatible roles between '{}' ({:?}) and '{}' ({:?})",
            describe(netlist, a),
            role_of(netlist, a),
            describe(netlist, b),
            role_of(netlist, b)
        ),
    );
}

/// Walk-relative flow of a power rail endpoint: positive flows along the
/// walk (toward ground or the negative rail), negative away from a source
fn rail_direction(net_type: NetType) -> i32 {
    match net_type {
        NetType::Vcc => -1,
        _ => 1,
    }
}

/// Direction of a resolved path in walk order, when it can be inferred
fn flow_direction(
    netlist: &Netlist,
    path: &Path,
    net_types: &AHashMap<u64, NetType>,
) -> Option<i32> {
    if let Some(end_type) = path
        .end_net
        .and_then(|uid| net_types.get(&uid).copied())
        .filter(|t| *t != NetType::Signal)
    {
        return Some(rail_direction(end_type));
    }
    // Signal-to-signal: the starting assign's role decides; a port assign
    // carries its external role, so the sense inverts.
    let start = path.members[0];
    let role = role_of(netlist, start);
    let sign = match (start, role) {
        (ARef::Inst(_), ErcRole::Output) => 1,
        (ARef::Inst(_), ErcRole::Input) => -1,
        (ARef::Port(_), ErcRole::Input) => 1,
        (ARef::Port(_), ErcRole::Output) => -1,
        (_, ErcRole::Unknown) => return None,
    };
    Some(sign)
}

/// Swap the pins of two-terminal insts entered against the flow, so the
/// flow reaches the lower pin id first; only adjacent pairs are considered
fn swap_pins_along(netlist: &mut Netlist, path: &Path, direction: i32) {
    for i in 0..path.rels.len() {
        if path.rels[i] != Rel::ThroughInst {
            continue;
        }
        let (a, b) = match (path.members[i], path.members[i + 1]) {
            (ARef::Inst(a), ARef::Inst(b)) => (a, b),
            _ => continue,
        };
        let (first, second) = if direction > 0 { (a, b) } else { (b, a) };
        let (pin_first, pin_second) = match (netlist.assigns[first].pin, netlist.assigns[second].pin)
        {
            (Some(f), Some(s)) => (f, s),
            _ => continue,
        };
        if pin_first > pin_second {
            log::debug!(
                "swapping pins of '{}'",
                netlist
                    .inst_by_uid(netlist.assigns[a].inst)
                    .map(|i| i.name.clone())
                    .unwrap_or_default()
            );
            let type_first = netlist.assigns[first].pin_type;
            let type_second = netlist.assigns[second].pin_type;
            netlist.assigns[first].pin = Some(pin_second);
            netlist.assigns[first].pin_type = type_second;
            netlist.assigns[second].pin = Some(pin_first);
            netlist.assigns[second].pin_type = type_first;
        }
    }
}

/// No signal net may carry more than one driving inst assign; rails take
/// any number of returns and supplies
fn check_drivers(netlist: &Netlist, report: &mut Report) {
    // Assign order keeps the diagnostic order reproducible across runs.
    let mut drivers: IndexMap<u64, Vec<usize>> = IndexMap::new();
    for (index, assign) in netlist.assigns.iter().enumerate() {
        if assign.role != ErcRole::Output {
            continue;
        }
        if let Target::Net(uid) = assign.to {
            if netlist
                .net_by_uid(uid)
                .map(|n| n.net_type)
                .unwrap_or(NetType::Signal)
                != NetType::Signal
            {
                continue;
            }
            drivers.entry(uid).or_default().push(index);
        }
    }
    for (net_uid, outputs) in drivers {
        if outputs.len() < 2 {
            continue;
        }
        let mut uids: Vec<u64> = outputs.iter().map(|&i| netlist.assigns[i].uid).collect();
        uids.sort_unstable();
        let names: Vec<String> = outputs
            .iter()
            .map(|&i| netlist.qualified_assign_name(&netlist.assigns[i]))
            .collect();
        let net_name = netlist
            .net_by_uid(net_uid)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        report.push_related(
            DiagnosticCode::ErcConflict,
            uids[0],
            uids[1..].to_vec(),
            format!("net '{}' has multiple drivers: {}", net_name, names.join(", ")),
        );
    }
}

/// Drop the boundary ports and any net left without assigns
fn prune(netlist: &mut Netlist) {
    for port in &netlist.ports {
        log::debug!("pruning boundary port '{}'", port.name);
    }
    netlist.ports.clear();
    netlist.port_assigns.clear();

    let mut counts: AHashMap<u64, usize> = AHashMap::new();
    for assign in &netlist.assigns {
        if let Target::Net(uid) = assign.to {
            *counts.entry(uid).or_default() += 1;
        }
    }
    netlist.nets.retain(|net| {
        let keep = counts.get(&net.uid).copied().unwrap_or(0) > 0;
        if !keep {
            log::debug!("pruning dead net '{}'", net.name);
        }
        keep
    });
}
