//! Abstract components: pins, functions and buses
//!
//! A [`Component`] describes an electrical part independent of packaging: an
//! ordered list of named [`Pin`]s, each able to play one or more named
//! [`Fun`]ctions. Functions that belong to a named bus carry the bus id of
//! that bus; plain functions get a negative, unique bus id so bus-coherence
//! constraints never alias them.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::errors::{Error, Result};
use crate::voltage;

/// Electrical type of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    Power,
    Gnd,
    In,
    Out,
    InOut,
    Unknown,
}

impl PinType {
    /// Parse the lowercase wire format
    pub fn from_str(text: &str) -> PinType {
        match text.to_ascii_lowercase().as_str() {
            "power" => PinType::Power,
            "gnd" => PinType::Gnd,
            "in" => PinType::In,
            "out" => PinType::Out,
            "inout" => PinType::InOut,
            _ => PinType::Unknown,
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinType::Power => "power",
            PinType::Gnd => "gnd",
            PinType::In => "in",
            PinType::Out => "out",
            PinType::InOut => "inout",
            PinType::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// A named role a pin can play
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fun {
    /// Index of this function within the component
    pub id: usize,
    /// Function name, e.g. `GPIO` or `UART_TX`
    pub function: String,
    /// Bus this function belongs to, if any
    pub bus: Option<String>,
    /// Bus index for bus functions; negative and unique otherwise
    pub bus_id: i64,
    /// Pin this function lives on
    pub pin: usize,
}

/// A component pin with its realizable functions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    pub pin_type: PinType,
    /// Optional pins may stay unconnected without a warning
    pub optional: bool,
    /// Function ids realizable by this pin
    pub funs: SmallVec<[usize; 2]>,
}

/// Declaration of a single function while building a pin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunSpec {
    pub function: String,
    pub bus: Option<String>,
}

impl FunSpec {
    /// A plain, bus-less function
    pub fn plain(function: impl Into<String>) -> Self {
        FunSpec {
            function: function.into(),
            bus: None,
        }
    }

    /// A function belonging to a named bus
    pub fn bus(bus: impl Into<String>, function: impl Into<String>) -> Self {
        FunSpec {
            function: function.into(),
            bus: Some(bus.into()),
        }
    }
}

/// Declaration of a pin while building a component
#[derive(Debug, Clone)]
pub struct PinSpec {
    pub name: String,
    pub pin_type: PinType,
    pub optional: bool,
    pub funs: Vec<FunSpec>,
}

impl PinSpec {
    pub fn new(name: impl Into<String>) -> Self {
        PinSpec {
            name: name.into(),
            pin_type: PinType::Unknown,
            optional: true,
            funs: Vec::new(),
        }
    }

    /// An input pin
    pub fn input(name: impl Into<String>) -> Self {
        PinSpec::new(name).typed(PinType::In)
    }

    /// An output pin
    pub fn output(name: impl Into<String>) -> Self {
        PinSpec::new(name).typed(PinType::Out)
    }

    /// A power pin; the pin name carries the rail voltage when it parses
    pub fn power(name: impl Into<String>) -> Self {
        PinSpec::new(name).typed(PinType::Power)
    }

    /// A ground pin
    pub fn ground(name: impl Into<String>) -> Self {
        PinSpec::new(name).typed(PinType::Gnd)
    }

    /// A general-purpose I/O pin carrying the `GPIO` function
    pub fn io(name: impl Into<String>) -> Self {
        PinSpec::new(name)
            .typed(PinType::InOut)
            .fun(FunSpec::plain("GPIO"))
    }

    pub fn typed(mut self, pin_type: PinType) -> Self {
        self.pin_type = pin_type;
        self
    }

    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }

    pub fn fun(mut self, fun: FunSpec) -> Self {
        self.funs.push(fun);
        self
    }
}

/// An abstract electrical part with named pins and functions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub description: String,
    pub pins: Vec<Pin>,
    pub funs: Vec<Fun>,
    /// Bus names in declaration order; a fun's non-negative bus id indexes here
    pub buses: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Component {
            name: name.into(),
            description: description.into(),
            pins: Vec::new(),
            funs: Vec::new(),
            buses: Vec::new(),
        }
    }

    /// Add a pin; a pin declared without functions gets one named after itself
    pub fn add_pin(&mut self, spec: PinSpec) -> Result<&mut Self> {
        if self.pin_by_name(&spec.name).is_some() {
            return Err(Error::DuplicateName {
                kind: "pin",
                name: spec.name,
                scope: self.name.clone(),
            });
        }

        let pin_id = self.pins.len();
        let mut fun_specs = spec.funs;
        if fun_specs.is_empty() {
            fun_specs.push(FunSpec::plain(spec.name.clone()));
        }

        let mut fun_ids = SmallVec::new();
        for fun_spec in fun_specs {
            let id = self.funs.len();
            let bus_id = match &fun_spec.bus {
                Some(bus) => match self.buses.iter().position(|b| b == bus) {
                    Some(index) => index as i64,
                    None => {
                        self.buses.push(bus.clone());
                        (self.buses.len() - 1) as i64
                    }
                },
                // Unique and below zero so plain functions never share a bus.
                None => -(id as i64) - 1,
            };
            self.check_function_kind(&fun_spec.function, fun_spec.bus.is_some())?;
            self.funs.push(Fun {
                id,
                function: fun_spec.function,
                bus: fun_spec.bus,
                bus_id,
                pin: pin_id,
            });
            fun_ids.push(id);
        }

        self.pins.push(Pin {
            name: spec.name,
            pin_type: spec.pin_type,
            optional: spec.optional,
            funs: fun_ids,
        });
        Ok(self)
    }

    /// Convenience chain-style pin addition for library declarations
    pub fn with_pin(mut self, spec: PinSpec) -> Result<Self> {
        self.add_pin(spec)?;
        Ok(self)
    }

    fn check_function_kind(&self, function: &str, is_bus: bool) -> Result<()> {
        for fun in self.funs_by_function(function) {
            if fun.bus.is_some() != is_bus {
                return Err(Error::MixedFunctionKinds {
                    component: self.name.clone(),
                    function: function.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn has_function(&self, function: &str) -> bool {
        self.funs.iter().any(|f| f.function == function)
    }

    pub fn is_bus_function(&self, function: &str) -> bool {
        self.funs_by_function(function)
            .next()
            .map(|f| f.bus.is_some())
            .unwrap_or(false)
    }

    /// All functions with this name, in declaration order
    pub fn funs_by_function<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Fun> {
        self.funs.iter().filter(move |f| f.function == function)
    }

    pub fn pin_by_name(&self, name: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.name == name)
    }

    pub fn pin_id_by_name(&self, name: &str) -> Option<usize> {
        self.pins.iter().position(|p| p.name == name)
    }

    /// Rail voltage a pin contributes to its net, from the pin type and name
    pub fn pin_voltage(&self, pin_id: usize) -> Option<f64> {
        let pin = self.pins.get(pin_id)?;
        match pin.pin_type {
            PinType::Power => voltage::parse(&pin.name),
            PinType::Gnd => Some(0.0),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
