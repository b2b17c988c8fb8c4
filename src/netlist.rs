//! Flat netlists and elaboration
//!
//! Elaboration lowers a hierarchical [`Circuit`] into a [`Netlist`]: insts are
//! renamed to unique names, all nets and insts are collected from the nested
//! circuits, and every inst assign is forwarded through subinst port bindings
//! until it lands on a concrete net. External port assigns are consumed by
//! the forwarding walk; ports of the top circuit survive as design-boundary
//! terminals for the electrical analysis.

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::circuit::{ensure_uid_floor, Circuit, Inst, InstAssign, Net, Port, PortAssign, Target};
use crate::diag::{DiagnosticCode, Report};
use crate::errors::{Error, Result};

/// A flat, fully-forwarded netlist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Netlist {
    pub name: String,
    /// All insts of the hierarchy; their assigns move into `assigns`
    pub insts: Vec<Inst>,
    pub nets: Vec<Net>,
    /// Every inst assign, with `to` always [`Target::Net`]
    pub assigns: Vec<InstAssign>,
    /// Design-boundary ports of the top circuit
    pub ports: Vec<Port>,
    /// Internal assigns of the boundary ports
    pub port_assigns: Vec<PortAssign>,
}

impl Netlist {
    pub fn inst_by_uid(&self, uid: u64) -> Option<&Inst> {
        self.insts.iter().find(|i| i.uid == uid)
    }

    pub fn inst_by_uid_mut(&mut self, uid: u64) -> Option<&mut Inst> {
        self.insts.iter_mut().find(|i| i.uid == uid)
    }

    pub fn inst_by_name(&self, name: &str) -> Option<&Inst> {
        self.insts.iter().find(|i| i.name == name)
    }

    pub fn net_by_uid(&self, uid: u64) -> Option<&Net> {
        self.nets.iter().find(|n| n.uid == uid)
    }

    pub fn net_by_uid_mut(&mut self, uid: u64) -> Option<&mut Net> {
        self.nets.iter_mut().find(|n| n.uid == uid)
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|n| n.name == name)
    }

    pub fn port_by_uid(&self, uid: u64) -> Option<&Port> {
        self.ports.iter().find(|p| p.uid == uid)
    }

    /// Indices into `assigns` belonging to one inst, in assignment order
    pub fn assign_indices_of_inst(&self, inst_uid: u64) -> Vec<usize> {
        self.assigns
            .iter()
            .enumerate()
            .filter(|(_, a)| a.inst == inst_uid)
            .map(|(i, _)| i)
            .collect()
    }

    /// The net an assign landed on
    pub fn net_of_assign(&self, assign: &InstAssign) -> Option<&Net> {
        match assign.to {
            Target::Net(uid) => self.net_by_uid(uid),
            Target::Port(_) => None,
        }
    }

    /// Qualified name for diagnostics, e.g. `R1.~`
    pub fn qualified_assign_name(&self, assign: &InstAssign) -> String {
        match self.inst_by_uid(assign.inst) {
            Some(inst) => inst.qualified_assign_name(assign),
            None => format!("?.{}", assign.function),
        }
    }

    /// Element counts for logging and rendering
    pub fn stats(&self) -> NetlistStats {
        use crate::circuit::NetType;
        NetlistStats {
            insts: self.insts.len(),
            nets: self.nets.len(),
            power_nets: self
                .nets
                .iter()
                .filter(|n| n.net_type != NetType::Signal)
                .count(),
            assigns: self.assigns.len(),
            ports: self.ports.len(),
        }
    }

    /// Serialize to a structured document
    pub fn to_object(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from a structured document
    pub fn from_object(value: serde_json::Value) -> Result<Netlist> {
        let netlist: Netlist = serde_json::from_value(value)?;
        let mut max = 0u64;
        for inst in &netlist.insts {
            max = max.max(inst.uid);
        }
        for net in &netlist.nets {
            max = max.max(net.uid);
        }
        for assign in &netlist.assigns {
            max = max.max(assign.uid).max(assign.guid);
        }
        for port in &netlist.ports {
            max = max.max(port.uid);
        }
        for assign in &netlist.port_assigns {
            max = max.max(assign.uid).max(assign.guid);
        }
        ensure_uid_floor(max);
        Ok(netlist)
    }

    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_object()?)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Netlist> {
        let text = std::fs::read_to_string(path)?;
        Netlist::from_object(serde_json::from_str(&text)?)
    }
}

/// Summary counts of a netlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetlistStats {
    pub insts: usize,
    pub nets: usize,
    pub power_nets: usize,
    pub assigns: usize,
    pub ports: usize,
}

/// Where a port lives, for forwarding and diagnostics
struct PortRecord {
    qualified: String,
    internal_net: Option<u64>,
    is_top: bool,
}

enum ResolveIssue {
    Cycle(u64),
    Unconnected(u64),
}

/// Lower a hierarchical circuit into a flat netlist
///
/// Structural failures (cyclic port bindings, unconnected ports, duplicate
/// names) are reported for every offender before the pass fails.
pub fn elaborate(top: &Circuit, report: &mut Report) -> Result<Netlist> {
    let fatal_before = report.fatal_count();
    let mut top = top.clone();
    log::info!("elaborating '{}'", top.name);

    rename_insts(&mut top, report);

    // Index ports and external bindings across the whole tree.
    let mut ports: AHashMap<u64, PortRecord> = AHashMap::new();
    let mut external: AHashMap<u64, Target> = AHashMap::new();
    let mut internal_owner: AHashMap<u64, u64> = AHashMap::new();
    index_ports(&top, top.uid, &mut ports, &mut external, &mut internal_owner);

    let resolve = |start: Target| -> std::result::Result<u64, ResolveIssue> {
        let mut visited: AHashSet<u64> = AHashSet::new();
        let mut target = start;
        loop {
            match target {
                Target::Port(port_uid) => {
                    if !visited.insert(port_uid) {
                        return Err(ResolveIssue::Cycle(port_uid));
                    }
                    let record = match ports.get(&port_uid) {
                        Some(record) => record,
                        None => return Err(ResolveIssue::Unconnected(port_uid)),
                    };
                    if let Some(binding) = external.get(&port_uid) {
                        target = *binding;
                    } else if record.is_top {
                        match record.internal_net {
                            Some(net) => return Ok(net),
                            None => return Err(ResolveIssue::Unconnected(port_uid)),
                        }
                    } else {
                        return Err(ResolveIssue::Unconnected(port_uid));
                    }
                }
                Target::Net(net_uid) => match internal_owner.get(&net_uid) {
                    Some(&owner) => {
                        if let Some(binding) = external.get(&owner) {
                            if !visited.insert(owner) {
                                return Err(ResolveIssue::Cycle(owner));
                            }
                            target = *binding;
                        } else if ports.get(&owner).is_some_and(|r| r.is_top) {
                            return Ok(net_uid);
                        } else {
                            return Err(ResolveIssue::Unconnected(owner));
                        }
                    }
                    None => return Ok(net_uid),
                },
            }
        }
    };

    // Flatten the tree, forwarding every inst assign to its final net.
    let name = top.name.clone();
    let top_uid = top.uid;
    let mut netlist = Netlist {
        name,
        insts: Vec::new(),
        nets: Vec::new(),
        assigns: Vec::new(),
        ports: Vec::new(),
        port_assigns: Vec::new(),
    };
    flatten(top, top_uid, &mut netlist, &resolve, &ports, report);

    // Conduit nets lost all their assigns to forwarding; drop them silently.
    let mut assign_counts: AHashMap<u64, usize> = AHashMap::new();
    for assign in &netlist.assigns {
        if let Target::Net(net) = assign.to {
            *assign_counts.entry(net).or_default() += 1;
        }
    }
    for assign in &netlist.port_assigns {
        if let Target::Net(net) = assign.to {
            *assign_counts.entry(net).or_default() += 1;
        }
    }
    netlist.nets.retain(|net| {
        let count = assign_counts.get(&net.uid).copied().unwrap_or(0);
        if count == 0 && internal_owner.contains_key(&net.uid) {
            log::debug!("dropping forwarded conduit net '{}'", net.name);
            return false;
        }
        true
    });
    for net in &netlist.nets {
        let count = assign_counts.get(&net.uid).copied().unwrap_or(0);
        if count < 2 {
            report.push(
                DiagnosticCode::UnconnectedNet,
                net.uid,
                format!("net '{}' has {} assign(s)", net.name, count),
            );
        }
    }

    if report.fatal_count() > fatal_before {
        return Err(Error::pass_failed("elaboration", report));
    }
    log::info!(
        "elaborated '{}': {} insts, {} nets, {} assigns",
        netlist.name,
        netlist.insts.len(),
        netlist.nets.len(),
        netlist.assigns.len()
    );
    Ok(netlist)
}

/// Enumerate insts pre-order and suffix repeated names with a 1-based index
fn rename_insts(top: &mut Circuit, report: &mut Report) {
    let mut insts: Vec<&mut Inst> = Vec::new();
    collect_insts(top, &mut insts);

    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (index, inst) in insts.iter().enumerate() {
        groups.entry(inst.name.clone()).or_default().push(index);
    }
    for (name, members) in &groups {
        if members.len() < 2 {
            continue;
        }
        for (ordinal, &index) in members.iter().enumerate() {
            let renamed = format!("{}{}", name, ordinal + 1);
            log::debug!("renaming inst '{}' to '{}'", name, renamed);
            insts[index].name = renamed;
        }
    }

    let mut seen: AHashSet<String> = AHashSet::new();
    for inst in &insts {
        if !seen.insert(inst.name.clone()) {
            report.push(
                DiagnosticCode::DuplicateName,
                inst.uid,
                format!("inst name '{}' is not unique after renaming", inst.name),
            );
        }
    }
}

fn collect_insts<'a>(circuit: &'a mut Circuit, out: &mut Vec<&'a mut Inst>) {
    for inst in &mut circuit.insts {
        out.push(inst);
    }
    for sub in &mut circuit.subinsts {
        collect_insts(&mut sub.circuit, out);
    }
}

fn qualified_port(ports: &AHashMap<u64, PortRecord>, uid: u64) -> String {
    ports
        .get(&uid)
        .map(|r| r.qualified.clone())
        .unwrap_or_else(|| format!("uid {}", uid))
}

fn index_ports(
    circuit: &Circuit,
    top_uid: u64,
    ports: &mut AHashMap<u64, PortRecord>,
    external: &mut AHashMap<u64, Target>,
    internal_owner: &mut AHashMap<u64, u64>,
) {
    for port in &circuit.ports {
        ports.insert(
            port.uid,
            PortRecord {
                qualified: format!("{}.{}", circuit.name, port.name),
                internal_net: port.internal_net,
                is_top: circuit.uid == top_uid,
            },
        );
        if let Some(net) = port.internal_net {
            internal_owner.insert(net, port.uid);
        }
    }
    for assign in &circuit.port_assigns {
        if assign.external {
            external.insert(assign.port, assign.to);
        }
    }
    for sub in &circuit.subinsts {
        index_ports(&sub.circuit, top_uid, ports, external, internal_owner);
    }
}

fn flatten(
    circuit: Circuit,
    top_uid: u64,
    netlist: &mut Netlist,
    resolve: &dyn Fn(Target) -> std::result::Result<u64, ResolveIssue>,
    ports: &AHashMap<u64, PortRecord>,
    report: &mut Report,
) {
    let is_top = circuit.uid == top_uid;
    netlist.nets.extend(circuit.nets);

    for port in circuit.ports {
        if port.internal_net.is_none() {
            report.push(
                DiagnosticCode::UnusedPort,
                port.uid,
                format!(
                    "port '{}' is never assigned internally",
                    qualified_port(ports, port.uid)
                ),
            );
            continue;
        }
        if is_top {
            netlist.ports.push(port);
        }
    }
    for assign in circuit.port_assigns {
        if !assign.external && is_top {
            netlist.port_assigns.push(assign);
        }
    }

    for mut inst in circuit.insts {
        for mut assign in inst.assigns.drain(..) {
            match resolve(assign.to) {
                Ok(net) => {
                    assign.to = Target::Net(net);
                    netlist.assigns.push(assign);
                }
                Err(ResolveIssue::Cycle(port)) => {
                    report.push(
                        DiagnosticCode::CyclicPortBinding,
                        port,
                        format!(
                            "port '{}' participates in a binding cycle",
                            qualified_port(ports, port)
                        ),
                    );
                }
                Err(ResolveIssue::Unconnected(port)) => {
                    report.push(
                        DiagnosticCode::UnconnectedPort,
                        port,
                        format!(
                            "port '{}' has no external binding",
                            qualified_port(ports, port)
                        ),
                    );
                }
            }
        }
        netlist.insts.push(inst);
    }

    for sub in circuit.subinsts {
        flatten(sub.circuit, top_uid, netlist, resolve, ports, report);
    }
}
