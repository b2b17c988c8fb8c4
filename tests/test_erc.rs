//! Integration tests for the electrical analysis, driven through compile

mod common;

use circuit_compiler::{compile, Circuit, ErcRole, NetType, PortType, Target};

/// The reference common-emitter amplifier stage
fn common_emitter() -> Circuit {
    let mut amp = Circuit::new("common_emitter");
    let gnd = amp.port_auto("gnd").unwrap();
    let vcc = amp.port_auto("12V").unwrap();
    let vin = amp.port("vin", PortType::In).unwrap();
    let vout = amp.port("vout", PortType::Out).unwrap();
    let nb = amp.net("nb").unwrap();
    let ne = amp.net("ne").unwrap();

    let q = amp.inst_with_value("Q", "npn sot23").unwrap();
    amp.assign(q, "B", nb).unwrap();
    amp.assign(q, "C", vout).unwrap();
    amp.assign(q, "E", ne).unwrap();

    // Current limiting resistor
    let r = amp.inst_with_value("R", "1.2k 0805").unwrap();
    amp.assign_bus(r, &["~", "~"], &[vcc.into(), vout.into()])
        .unwrap();

    // Thermal stabilization and its AC short
    let r = amp.inst_with_value("R", "220 0805").unwrap();
    amp.assign_bus(r, &["~", "~"], &[ne.into(), gnd.into()])
        .unwrap();
    let c = amp.inst_with_value("C", "10uF 0805").unwrap();
    amp.assign_bus(c, &["~", "~"], &[ne.into(), gnd.into()])
        .unwrap();

    // Biasing resistors
    let r = amp.inst_with_value("R", "20k 0805").unwrap();
    amp.assign_bus(r, &["~", "~"], &[vcc.into(), nb.into()])
        .unwrap();
    let r = amp.inst_with_value("R", "3.6k 0805").unwrap();
    amp.assign_bus(r, &["~", "~"], &[nb.into(), gnd.into()])
        .unwrap();

    // Decoupling capacitor
    let c = amp.inst_with_value("C", "10uF 0805").unwrap();
    amp.assign_bus(c, &["~", "~"], &[vin.into(), nb.into()])
        .unwrap();

    amp
}

#[test]
fn common_emitter_compiles_cleanly() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    assert!(!compiled.report.has_errors(), "{}", compiled.report);
    assert_eq!(compiled.exit_code(), 0);
    assert_eq!(compiled.netlist.insts.len(), 7);
}

#[test]
fn rails_are_typed_from_port_names() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    let netlist = &compiled.netlist;
    assert_eq!(netlist.net_by_name("12V").unwrap().net_type, NetType::Vcc);
    assert_eq!(netlist.net_by_name("gnd").unwrap().net_type, NetType::Gnd);
    assert_eq!(netlist.net_by_name("nb").unwrap().net_type, NetType::Signal);
    assert_eq!(
        netlist.net_by_name("vout").unwrap().net_type,
        NetType::Signal
    );
}

#[test]
fn transistor_pins_are_distinct() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    let netlist = &compiled.netlist;
    let q = netlist.inst_by_name("Q").unwrap();
    let mut pins: Vec<usize> = netlist
        .assigns
        .iter()
        .filter(|a| a.inst == q.uid)
        .map(|a| a.pin.unwrap())
        .collect();
    assert_eq!(pins.len(), 3);
    pins.sort_unstable();
    pins.dedup();
    assert_eq!(pins.len(), 3);
}

#[test]
fn input_path_alternates_into_the_base() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    let netlist = &compiled.netlist;

    // The decoupling cap sits between vin and nb: the vin-facing side
    // receives, the base-facing side drives, and the base itself receives.
    let vin_net = netlist.net_by_name("vin").unwrap().uid;
    let nb_net = netlist.net_by_name("nb").unwrap().uid;
    let cap_in = netlist
        .assigns
        .iter()
        .find(|a| a.to == Target::Net(vin_net))
        .expect("cap assign on vin");
    let cap_out = netlist
        .assigns
        .iter()
        .find(|a| a.to == Target::Net(nb_net) && a.guid == cap_in.guid)
        .expect("cap assign on nb");
    assert_eq!(cap_in.role, ErcRole::Input);
    assert_eq!(cap_out.role, ErcRole::Output);

    let q = netlist.inst_by_name("Q").unwrap();
    let base = netlist
        .assigns
        .iter()
        .find(|a| a.inst == q.uid && a.function == "B")
        .unwrap();
    assert_eq!(base.role, ErcRole::Input);
}

#[test]
fn boundary_ports_are_consumed_by_compile() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    assert!(compiled.netlist.ports.is_empty());
    assert!(compiled.netlist.port_assigns.is_empty());
    // Their nets survive with the inst assigns still attached.
    assert!(compiled.netlist.net_by_name("vin").is_some());
    assert!(compiled.netlist.net_by_name("12V").is_some());
}

#[test]
fn devices_bind_from_value_tokens() {
    common::setup();
    let compiled = compile(&common_emitter()).unwrap();
    for inst in &compiled.netlist.insts {
        let device = inst.device.as_ref().expect("device bound");
        assert_eq!(device.component.name, inst.component.name);
    }
    let q = compiled.netlist.inst_by_name("Q").unwrap();
    assert_eq!(q.device.as_ref().unwrap().name, "QSOT23");
}
