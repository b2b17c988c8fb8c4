//! End-to-end compile scenarios and round-trip properties

mod common;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use circuit_compiler::diag::{DiagnosticCode, Severity};
use circuit_compiler::{compile, Circuit, NetType, Target};

fn resistor_pair() -> Circuit {
    let mut circuit = Circuit::new("resistor_pair");
    let vin = circuit.net("VIN").unwrap();
    let vout = circuit.net("VOUT").unwrap();
    let gnd = circuit.net("GND").unwrap();
    let r1 = circuit.inst_with_value("R", "10k 0805").unwrap();
    circuit
        .assign_bus(r1, &["~", "~"], &[vin.into(), vout.into()])
        .unwrap();
    let r2 = circuit.inst_with_value("R", "10k 0805").unwrap();
    circuit
        .assign_bus(r2, &["~", "~"], &[vout.into(), gnd.into()])
        .unwrap();
    circuit
}

#[test]
fn resistor_pair_scenario() {
    common::setup();
    let compiled = compile(&resistor_pair()).unwrap();
    let netlist = &compiled.netlist;

    assert_eq!(netlist.nets.len(), 3);
    assert_eq!(netlist.net_by_name("VIN").unwrap().net_type, NetType::Signal);
    assert_eq!(
        netlist.net_by_name("VOUT").unwrap().net_type,
        NetType::Signal
    );
    assert_eq!(netlist.net_by_name("GND").unwrap().net_type, NetType::Gnd);

    assert_eq!(netlist.insts.len(), 2);
    assert!(netlist.inst_by_name("R1").is_some());
    assert!(netlist.inst_by_name("R2").is_some());

    assert_eq!(netlist.assigns.len(), 4);
    for inst in &netlist.insts {
        let pins: Vec<usize> = netlist
            .assigns
            .iter()
            .filter(|a| a.inst == inst.uid)
            .map(|a| a.pin.unwrap())
            .collect();
        assert_eq!(pins.len(), 2);
        assert_ne!(pins[0], pins[1]);
    }

    assert!(!compiled.report.has_errors());
    assert_eq!(compiled.exit_code(), 0);
}

#[test]
fn two_drivers_on_one_net_is_nonfatal_but_nonzero() {
    common::setup();
    let mut circuit = Circuit::new("contention");
    let bus = circuit.net("bus").unwrap();
    let gnd = circuit.net("GND").unwrap();
    for _ in 0..2 {
        let v = circuit.inst("V").unwrap();
        circuit.assign(v, "+", bus).unwrap();
        circuit.assign(v, "-", gnd).unwrap();
    }

    // Compile still returns the annotated netlist.
    let compiled = compile(&circuit).unwrap();
    assert_eq!(compiled.report.count_of(DiagnosticCode::ErcConflict), 1);
    let conflict = compiled
        .report
        .iter()
        .find(|d| d.code == DiagnosticCode::ErcConflict)
        .unwrap();
    assert_eq!(conflict.severity, Severity::Error);
    assert_eq!(conflict.related.len(), 1);
    assert_ne!(compiled.exit_code(), 0);
}

#[test]
fn compile_is_deterministic() {
    common::setup();
    let circuit = resistor_pair();
    let first = compile(&circuit).unwrap();
    let second = compile(&circuit).unwrap();
    assert_eq!(
        first.netlist.to_object().unwrap(),
        second.netlist.to_object().unwrap()
    );
    assert_eq!(
        serde_json::to_value(first.report.diagnostics()).unwrap(),
        serde_json::to_value(second.report.diagnostics()).unwrap()
    );
}

#[test]
fn compile_is_idempotent_across_persistence() {
    common::setup();
    let circuit = resistor_pair();
    let direct = compile(&circuit).unwrap();

    let restored = Circuit::from_object(circuit.to_object().unwrap()).unwrap();
    let reloaded = compile(&restored).unwrap();

    assert_eq!(
        direct.netlist.to_object().unwrap(),
        reloaded.netlist.to_object().unwrap()
    );
    assert_eq!(
        serde_json::to_value(direct.report.diagnostics()).unwrap(),
        serde_json::to_value(reloaded.report.diagnostics()).unwrap()
    );
}

#[test]
fn unknown_component_fails_at_build_time() {
    common::setup();
    let mut circuit = Circuit::new("broken");
    assert!(circuit.inst("NO_SUCH_PART").is_err());
}

/// Build a ladder of `n` resistors between successive nets
fn ladder(n: usize) -> Circuit {
    let mut circuit = Circuit::new("ladder");
    let mut previous = circuit.net("n0").unwrap();
    for index in 0..n {
        let next = circuit.net(format!("n{}", index + 1)).unwrap();
        let r = circuit.inst_with_value("R", "1k 0805").unwrap();
        circuit
            .assign_bus(r, &["~", "~"], &[previous.into(), next.into()])
            .unwrap();
        previous = next;
    }
    circuit
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn ladders_always_flatten_and_bind(n in 1usize..12) {
        common::setup();
        let compiled = compile(&ladder(n)).unwrap();
        let netlist = &compiled.netlist;

        prop_assert_eq!(netlist.assigns.len(), 2 * n);
        for assign in &netlist.assigns {
            prop_assert!(matches!(assign.to, Target::Net(_)));
            prop_assert!(assign.pin.is_some());
        }
        // Distinct pins per inst, distinct names across insts.
        let mut names: Vec<&str> = netlist.insts.iter().map(|i| i.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        prop_assert_eq!(names.len(), netlist.insts.len());
        for inst in &netlist.insts {
            let pins: Vec<usize> = netlist
                .assigns
                .iter()
                .filter(|a| a.inst == inst.uid)
                .map(|a| a.pin.unwrap())
                .collect();
            prop_assert_eq!(pins.len(), 2);
            prop_assert_ne!(pins[0], pins[1]);
        }
    }
}
