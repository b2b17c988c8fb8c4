//! Shared test fixtures: a small standard part catalog
//!
//! Registered once per test binary; the registries are process-wide.

use std::sync::Once;

use circuit_compiler::library;
use circuit_compiler::{Component, FunSpec, Package, PinSpec, Result};

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        register_catalog().expect("catalog registration failed");
    });
}

fn register_catalog() -> Result<()> {
    // Passives
    library::register_component(two_pin("R", "Resistor"))?;
    library::register_component(two_pin("L", "Inductor"))?;
    library::register_component(
        Component::new("C", "Capacitor")
            .with_pin(
                PinSpec::new("A")
                    .fun(FunSpec::bus("Ceramic", "~"))
                    .fun(FunSpec::bus("Electrolytic", "+"))
                    .required(),
            )?
            .with_pin(
                PinSpec::new("B")
                    .fun(FunSpec::bus("Ceramic", "~"))
                    .fun(FunSpec::bus("Electrolytic", "-"))
                    .required(),
            )?,
    )?;
    library::register_component(
        Component::new("TP", "Test point").with_pin(PinSpec::new("TP").required())?,
    )?;

    // Actives
    library::register_component(
        Component::new("D", "Diode")
            .with_pin(PinSpec::input("A").required())?
            .with_pin(PinSpec::output("C").required())?,
    )?;
    library::register_component(
        Component::new("Q", "Bipolar transistor")
            .with_pin(PinSpec::input("B").required())?
            .with_pin(PinSpec::input("C").required())?
            .with_pin(PinSpec::output("E").required())?
            .with_pin(PinSpec::output("SUBSTRATE"))?,
    )?;
    library::register_component(
        Component::new("V", "Voltage source")
            .with_pin(PinSpec::output("+").required())?
            .with_pin(PinSpec::input("-").required())?,
    )?;

    library::register_component(
        Component::new("OP", "Opamp")
            .with_pin(PinSpec::power("VCC").required())?
            .with_pin(PinSpec::power("VEE").required())?
            .with_pin(PinSpec::input("+").required())?
            .with_pin(PinSpec::input("-").required())?
            .with_pin(PinSpec::output("OUT").required())?,
    )?;

    // Both windings expose the same function names; bus coherence picks one
    // winding per assignment group.
    library::register_component(
        Component::new("Transformer_1P_1S", "Transformer with one primary and one secondary")
            .with_pin(PinSpec::new("L1.1").fun(FunSpec::bus("L1", "1")).required())?
            .with_pin(PinSpec::new("L1.2").fun(FunSpec::bus("L1", "2")).required())?
            .with_pin(PinSpec::new("L2.1").fun(FunSpec::bus("L2", "1")).required())?
            .with_pin(PinSpec::new("L2.2").fun(FunSpec::bus("L2", "2")).required())?,
    )?;

    // A microcontroller with two UART-capable pin groups
    library::register_component(
        Component::new("MCU", "Microcontroller")
            .with_pin(PinSpec::ground("GND"))?
            .with_pin(PinSpec::power("5V"))?
            .with_pin(PinSpec::input("XTAL_XI"))?
            .with_pin(PinSpec::output("XTAL_XO"))?
            .with_pin(PinSpec::io("GPIO_1").fun(FunSpec::bus("UART0", "UART_TX")))?
            .with_pin(PinSpec::io("GPIO_2").fun(FunSpec::bus("UART0", "UART_RX")))?
            .with_pin(PinSpec::io("GPIO_3"))?
            .with_pin(PinSpec::io("GPIO_4"))?
            .with_pin(PinSpec::io("GPIO_5").fun(FunSpec::bus("UART1", "UART_TX")))?
            .with_pin(PinSpec::io("GPIO_6").fun(FunSpec::bus("UART1", "UART_RX")))?
            .with_pin(PinSpec::io("GPIO_7"))?,
    )?;

    // A part deliberately left without any device
    library::register_component(two_pin("X", "Part without inventory"))?;

    // Packages
    library::register_package(Package::rect("0805", 2.0, 1.25).with_pads(["1", "2"])?)?;
    library::register_package(Package::rect("0603", 1.6, 0.8).with_pads(["1", "2"])?)?;
    library::register_package(Package::rect("SOT23", 2.9, 1.3).with_pads(["1", "2", "3"])?)?;
    library::register_package(Package::rect("PAD", 1.0, 1.0).with_pads(["1"])?)?;
    library::register_package(
        Package::rect("DIP8", 9.2, 6.4).with_pads(["1", "2", "3", "4", "5", "6", "7", "8"])?,
    )?;
    library::register_package(Package::rect("ACT45B", 5.9, 3.4).with_pads(["1", "2", "3", "4"])?)?;
    library::register_package(Package::rect("QFN16", 3.0, 3.0).with_pads([
        "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16",
        "17",
    ])?)?;

    // Devices
    library::register_device("R0805", "R", "0805", [("1", "A"), ("2", "B")])?;
    library::register_device("R0603", "R", "0603", [("1", "A"), ("2", "B")])?;
    library::register_device("C0805", "C", "0805", [("1", "A"), ("2", "B")])?;
    library::register_device("L0805", "L", "0805", [("1", "A"), ("2", "B")])?;
    library::register_device("D0805", "D", "0805", [("1", "A"), ("2", "C")])?;
    library::register_device("TPPAD", "TP", "PAD", [("1", "TP")])?;
    library::register_device("V0805", "V", "0805", [("1", "+"), ("2", "-")])?;
    library::register_device(
        "QSOT23",
        "Q",
        "SOT23",
        [("1", "B"), ("2", "E"), ("3", "C")],
    )?;
    library::register_device(
        "OPDIP",
        "OP",
        "DIP8",
        [
            ("1", "VCC"),
            ("2", "VEE"),
            ("3", "+"),
            ("4", "OUT"),
            ("5", "-"),
            ("6", ""),
            ("7", ""),
            ("8", ""),
        ],
    )?;
    library::register_device(
        "ACT45B",
        "Transformer_1P_1S",
        "ACT45B",
        [("1", "L1.1"), ("2", "L2.1"), ("3", "L2.2"), ("4", "L1.2")],
    )?;
    library::register_device(
        "MCUQFN16",
        "MCU",
        "QFN16",
        [
            ("1", "GPIO_1"),
            ("2", "GPIO_2"),
            ("3", "GPIO_3"),
            ("4", "GPIO_4"),
            ("5", "5V"),
            ("6", "GND"),
            ("7", "GPIO_5"),
            ("8", "GPIO_6"),
            ("9", "XTAL_XI"),
            ("10", "XTAL_XO"),
            ("11", "GPIO_7"),
            ("12", ""),
            ("13", ""),
            ("14", ""),
            ("15", ""),
            ("16", ""),
            ("17", "GND"),
        ],
    )?;
    Ok(())
}

fn two_pin(name: &str, description: &str) -> Component {
    let component = Component::new(name, description);
    component
        .with_pin(PinSpec::new("A").fun(FunSpec::plain("~")).required())
        .and_then(|c| c.with_pin(PinSpec::new("B").fun(FunSpec::plain("~")).required()))
        .expect("two-pin component")
}
