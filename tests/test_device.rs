//! Integration tests for device matching

mod common;

use circuit_compiler::devmatch::match_device;
use circuit_compiler::diag::{DiagnosticCode, Report};
use circuit_compiler::{elaborate, Circuit, Netlist};

fn single_resistor(value: Option<&str>) -> (Netlist, Report) {
    common::setup();
    let mut circuit = Circuit::new("test");
    let a = circuit.net("a").unwrap();
    let b = circuit.net("b").unwrap();
    let r = match value {
        Some(value) => circuit.inst_with_value("R", value).unwrap(),
        None => circuit.inst("R").unwrap(),
    };
    circuit
        .assign_bus(r, &["~", "~"], &[a.into(), b.into()])
        .unwrap();
    let mut report = Report::new();
    let mut netlist = elaborate(&circuit, &mut report).unwrap();
    let uid = netlist.insts[0].uid;
    match_device(&mut netlist, uid, &mut report).unwrap();
    (netlist, report)
}

#[test]
fn packaging_hint_beats_declaration_order() {
    let (netlist, report) = single_resistor(Some("10k 0603"));
    let device = netlist.insts[0].device.as_ref().unwrap();
    assert_eq!(device.name, "R0603");
    assert_eq!(device.component.name, "R");
    assert_eq!(report.count_of(DiagnosticCode::RandomDeviceSelected), 0);
}

#[test]
fn value_only_falls_back_to_first_device() {
    let (netlist, report) = single_resistor(Some("10k"));
    assert_eq!(netlist.insts[0].device.as_ref().unwrap().name, "R0805");
    assert_eq!(report.count_of(DiagnosticCode::RandomDeviceSelected), 1);
}

#[test]
fn missing_value_falls_back_to_first_device() {
    let (netlist, report) = single_resistor(None);
    assert_eq!(netlist.insts[0].device.as_ref().unwrap().name, "R0805");
    assert_eq!(report.count_of(DiagnosticCode::RandomDeviceSelected), 1);
}

#[test]
fn device_name_token_matches_case_insensitively() {
    let (netlist, report) = single_resistor(Some("47k r0603"));
    assert_eq!(netlist.insts[0].device.as_ref().unwrap().name, "R0603");
    assert_eq!(report.count_of(DiagnosticCode::RandomDeviceSelected), 0);
}

#[test]
fn first_matching_token_wins() {
    // Both tokens name a package; the first one decides.
    let (netlist, _) = single_resistor(Some("0603 0805"));
    assert_eq!(netlist.insts[0].device.as_ref().unwrap().name, "R0603");
}

#[test]
fn component_without_inventory_is_reported() {
    common::setup();
    let mut circuit = Circuit::new("test");
    let a = circuit.net("a").unwrap();
    let b = circuit.net("b").unwrap();
    let x = circuit.inst("X").unwrap();
    circuit
        .assign_bus(x, &["~", "~"], &[a.into(), b.into()])
        .unwrap();
    let mut report = Report::new();
    let mut netlist = elaborate(&circuit, &mut report).unwrap();
    let uid = netlist.insts[0].uid;
    match_device(&mut netlist, uid, &mut report).unwrap();
    assert_eq!(report.count_of(DiagnosticCode::NoDeviceForComponent), 1);
    assert!(netlist.insts[0].device.is_none());
}

#[test]
fn transistor_package_token() {
    common::setup();
    let mut circuit = Circuit::new("test");
    let nets = circuit.nets("nb nc ne").unwrap();
    let q = circuit.inst_with_value("Q", "npn sot23").unwrap();
    circuit.assign(q, "B", nets[0]).unwrap();
    circuit.assign(q, "C", nets[1]).unwrap();
    circuit.assign(q, "E", nets[2]).unwrap();
    let mut report = Report::new();
    let mut netlist = elaborate(&circuit, &mut report).unwrap();
    let uid = netlist.insts[0].uid;
    match_device(&mut netlist, uid, &mut report).unwrap();
    assert_eq!(netlist.insts[0].device.as_ref().unwrap().name, "QSOT23");
    assert_eq!(report.count_of(DiagnosticCode::RandomDeviceSelected), 0);
}
