//! Plain-text rendering of circuits and netlists
//!
//! Debugging output in the shape front ends print: a hierarchical listing
//! for circuits and a flat listing with resolved pins, net types and roles
//! for netlists.

use crate::circuit::{Circuit, ErcRole, Target};
use crate::netlist::Netlist;

/// Hierarchical listing of a circuit and its subcircuits
pub fn render_circuit(circuit: &Circuit) -> String {
    let mut lines = Vec::new();
    render_circuit_into(circuit, 0, &mut lines);
    lines.join("\n")
}

fn render_circuit_into(circuit: &Circuit, depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    lines.push(format!("{}circuit {} {{", pad, circuit.name));
    for port in &circuit.ports {
        lines.push(format!("{}  port {} ({:?})", pad, port.name, port.port_type));
    }
    for net in &circuit.nets {
        lines.push(format!("{}  net {}", pad, net.name));
    }
    for inst in &circuit.insts {
        if inst.assigns.is_empty() {
            lines.push(format!("{}  inst {} of {}", pad, inst.name, inst.component.name));
            continue;
        }
        lines.push(format!(
            "{}  inst {} of {} {{",
            pad, inst.name, inst.component.name
        ));
        for assign in &inst.assigns {
            let target = match assign.to {
                Target::Net(uid) => circuit
                    .net_by_uid(uid)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| format!("net#{}", uid)),
                Target::Port(uid) => circuit
                    .port_by_uid(uid)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("port#{}", uid)),
            };
            lines.push(format!("{}    {} = {}", pad, assign.function, target));
        }
        lines.push(format!("{}  }}", pad));
    }
    for sub in &circuit.subinsts {
        lines.push(format!("{}  subinst {} of:", pad, sub.name));
        render_circuit_into(&sub.circuit, depth + 2, lines);
    }
    lines.push(format!("{}}}", pad));
}

/// Flat listing of a netlist with resolved bindings
pub fn render_netlist(netlist: &Netlist) -> String {
    let mut lines = Vec::new();
    lines.push(format!("netlist {}", netlist.name));

    lines.push("insts:".to_string());
    for inst in &netlist.insts {
        let device = inst
            .device
            .as_ref()
            .map(|d| format!(" [{}]", d.name))
            .unwrap_or_default();
        lines.push(format!("  {} of {}{}", inst.name, inst.component.name, device));
        for assign in netlist.assigns.iter().filter(|a| a.inst == inst.uid) {
            let net = netlist
                .net_of_assign(assign)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| "?".to_string());
            let pin = assign
                .pin
                .and_then(|p| inst.component.pins.get(p))
                .map(|p| p.name.as_str())
                .unwrap_or("?");
            let role = match assign.role {
                ErcRole::Input => " <-",
                ErcRole::Output => " ->",
                ErcRole::Unknown => "",
            };
            lines.push(format!("    {} ({}) = {}{}", pin, assign.function, net, role));
        }
    }

    lines.push("nets:".to_string());
    for net in &netlist.nets {
        let count = netlist
            .assigns
            .iter()
            .filter(|a| a.to == Target::Net(net.uid))
            .count();
        lines.push(format!(
            "  {} ({:?}, {} assigns)",
            net.name, net.net_type, count
        ));
    }

    let stats = netlist.stats();
    lines.push(format!(
        "{} insts, {} nets ({} power), {} assigns",
        stats.insts, stats.nets, stats.power_nets, stats.assigns
    ));
    lines.join("\n")
}
