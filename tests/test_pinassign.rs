//! Integration tests for pin assignment over the standard catalog

mod common;

use circuit_compiler::diag::{DiagnosticCode, Report};
use circuit_compiler::pinassign::{assign_pins, check_required_pins};
use circuit_compiler::{elaborate, Circuit, Netlist};

fn assigned(circuit: &Circuit) -> (Netlist, Report) {
    let mut report = Report::new();
    let mut netlist = elaborate(circuit, &mut report).unwrap();
    let uids: Vec<u64> = netlist.insts.iter().map(|i| i.uid).collect();
    for uid in uids {
        assign_pins(&mut netlist, uid, &mut report).unwrap();
        check_required_pins(&netlist, uid, &mut report).unwrap();
    }
    (netlist, report)
}

#[test]
fn uart_bus_groups_resolve_to_distinct_uarts() {
    common::setup();
    let mut circuit = Circuit::new("uarts");
    let uart0 = circuit.nets("uart0_tx uart0_rx").unwrap();
    let uart1 = circuit.nets("uart1_tx uart1_rx").unwrap();
    let mcu = circuit.inst("MCU").unwrap();
    circuit
        .assign_bus(
            mcu,
            &["UART_TX", "UART_RX"],
            &[uart0[0].into(), uart0[1].into()],
        )
        .unwrap();
    circuit
        .assign_bus(
            mcu,
            &["UART_TX", "UART_RX"],
            &[uart1[0].into(), uart1[1].into()],
        )
        .unwrap();

    let (netlist, report) = assigned(&circuit);
    assert!(!report.has_errors());

    let component = &netlist.insts[0].component;
    let pins: Vec<usize> = netlist.assigns.iter().map(|a| a.pin.unwrap()).collect();
    // Four distinct pins overall.
    let mut sorted = pins.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 4);

    // Each bus-group lands on one UART: its two pins belong to one bus.
    for pair in netlist.assigns.chunks(2) {
        assert_eq!(pair[0].guid, pair[1].guid);
        let bus_of = |assign: &circuit_compiler::InstAssign| {
            component
                .funs_by_function(&assign.function)
                .find(|f| f.pin == assign.pin.unwrap())
                .map(|f| f.bus_id)
                .unwrap()
        };
        assert_eq!(bus_of(&pair[0]), bus_of(&pair[1]));
    }

    // Declaration order makes the first group take UART0.
    let gpio = |name: &str| component.pin_id_by_name(name).unwrap();
    assert_eq!(pins[0], gpio("GPIO_1"));
    assert_eq!(pins[1], gpio("GPIO_2"));
    assert_eq!(pins[2], gpio("GPIO_5"));
    assert_eq!(pins[3], gpio("GPIO_6"));
}

#[test]
fn swapped_function_order_still_resolves() {
    common::setup();
    let mut circuit = Circuit::new("uarts");
    let a = circuit.nets("tx0 rx0").unwrap();
    let b = circuit.nets("rx1 tx1").unwrap();
    let mcu = circuit.inst("MCU").unwrap();
    circuit
        .assign_bus(mcu, &["UART_TX", "UART_RX"], &[a[0].into(), a[1].into()])
        .unwrap();
    circuit
        .assign_bus(mcu, &["UART_RX", "UART_TX"], &[b[0].into(), b[1].into()])
        .unwrap();

    let (netlist, report) = assigned(&circuit);
    assert!(!report.has_errors());
    let pins: Vec<usize> = netlist.assigns.iter().map(|a| a.pin.unwrap()).collect();
    let mut sorted = pins.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 4);
}

#[test]
fn three_uart_groups_are_unsatisfiable() {
    common::setup();
    let mut circuit = Circuit::new("uarts");
    let mcu = circuit.inst("MCU").unwrap();
    for index in 0..3 {
        let tx = circuit.net(format!("tx{}", index)).unwrap();
        let rx = circuit.net(format!("rx{}", index)).unwrap();
        circuit
            .assign_bus(mcu, &["UART_TX", "UART_RX"], &[tx.into(), rx.into()])
            .unwrap();
    }

    let (_, report) = assigned(&circuit);
    assert_eq!(
        report.count_of(DiagnosticCode::UnsatisfiablePinAssignment),
        1
    );
}

#[test]
fn gpio_requests_avoid_uart_pins_when_needed() {
    common::setup();
    let mut circuit = Circuit::new("gpios");
    let mcu = circuit.inst("MCU").unwrap();
    // Five plain GPIOs plus one UART pair: seven pins requested out of seven
    // GPIO-capable pins, so the solver must pack them exactly.
    for index in 0..5 {
        let net = circuit.net(format!("gpio{}", index)).unwrap();
        circuit.assign(mcu, "GPIO", net).unwrap();
    }
    let tx = circuit.net("tx").unwrap();
    let rx = circuit.net("rx").unwrap();
    circuit
        .assign_bus(mcu, &["UART_TX", "UART_RX"], &[tx.into(), rx.into()])
        .unwrap();

    let (netlist, report) = assigned(&circuit);
    assert!(!report.has_errors());
    let mut pins: Vec<usize> = netlist.assigns.iter().map(|a| a.pin.unwrap()).collect();
    pins.sort_unstable();
    pins.dedup();
    assert_eq!(pins.len(), 7);

    // The UART pair sits on a coherent UART, despite the GPIO pressure.
    let component = &netlist.insts[0].component;
    let uart_pins: Vec<usize> = netlist
        .assigns
        .iter()
        .filter(|a| a.function.starts_with("UART_"))
        .map(|a| a.pin.unwrap())
        .collect();
    let names: Vec<&str> = uart_pins
        .iter()
        .map(|&p| component.pins[p].name.as_str())
        .collect();
    assert!(
        names == ["GPIO_1", "GPIO_2"] || names == ["GPIO_5", "GPIO_6"],
        "unexpected UART pins {:?}",
        names
    );
}

#[test]
fn capacitor_polarity_is_bus_coherent() {
    common::setup();
    let mut circuit = Circuit::new("caps");
    let plus = circuit.net("plus").unwrap();
    let minus = circuit.net("minus").unwrap();
    let c = circuit.inst("C").unwrap();
    circuit
        .assign_bus(c, &["+", "-"], &[plus.into(), minus.into()])
        .unwrap();

    let (netlist, report) = assigned(&circuit);
    assert!(!report.has_errors());
    let plus_assign = netlist.assigns.iter().find(|a| a.function == "+").unwrap();
    let minus_assign = netlist.assigns.iter().find(|a| a.function == "-").unwrap();
    assert_ne!(plus_assign.pin, minus_assign.pin);
}

#[test]
fn unconnected_required_pins_warn_once_per_inst() {
    common::setup();
    let mut circuit = Circuit::new("partial");
    let nb = circuit.net("nb").unwrap();
    let q = circuit.inst("Q").unwrap();
    circuit.assign(q, "B", nb).unwrap();

    let (_, report) = assigned(&circuit);
    assert_eq!(report.count_of(DiagnosticCode::MissingRequiredPin), 1);
    let diag = report
        .iter()
        .find(|d| d.code == DiagnosticCode::MissingRequiredPin)
        .unwrap();
    assert!(diag.message.contains("C"));
    assert!(diag.message.contains("E"));
}
