//! Circuit IR and builder operations
//!
//! The IR is a forest of [`Circuit`]s. Each circuit owns vectors of its child
//! elements (nets, ports, insts, subinsts, port assigns); cross-references
//! between elements are uids, so there is no cyclic ownership and documents
//! serialize directly. A [`SubInst`] owns its inner circuit, whose `parent`
//! field is a uid back-reference recording the relation only.
//!
//! All construction goes through `&mut Circuit` methods; there is no
//! process-wide active circuit. Front ends wanting DSL sugar wrap this
//! context themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::component::{Component, PinType};
use crate::device::Device;
use crate::errors::{Error, Result};
use crate::library;
use crate::voltage;

// Sole shared mutable state of the core: the uid/guid allocator.
static UID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Allocate the next uid (also used for guids)
pub(crate) fn next_uid() -> u64 {
    UID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Raise the allocator above every uid seen in a loaded document
pub(crate) fn ensure_uid_floor(seen_max: u64) {
    let mut current = UID_COUNTER.load(Ordering::Relaxed);
    while current <= seen_max {
        match UID_COUNTER.compare_exchange(
            current,
            seen_max + 1,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Electrical classification of a net, assigned during analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetType {
    Signal,
    Vcc,
    Vee,
    Gnd,
}

impl Default for NetType {
    fn default() -> Self {
        NetType::Signal
    }
}

/// Direction type of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Power,
    Gnd,
    In,
    Out,
}

/// Driver/receiver role of an assign, resolved during analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErcRole {
    Input,
    Output,
    Unknown,
}

impl Default for ErcRole {
    fn default() -> Self {
        ErcRole::Unknown
    }
}

impl ErcRole {
    /// The complementary role; `Unknown` stays `Unknown`
    pub fn inverse(self) -> ErcRole {
        match self {
            ErcRole::Input => ErcRole::Output,
            ErcRole::Output => ErcRole::Input,
            ErcRole::Unknown => ErcRole::Unknown,
        }
    }
}

/// What an assign points at; ports only occur before forwarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Net(u64),
    Port(u64),
}

/// Handle to a net of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetId(pub u64);

/// Handle to a port of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortId(pub u64);

/// Handle to an inst of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstId(pub u64);

/// Handle to a subinst of a circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubInstId(pub u64);

/// Builder-level assignment target
#[derive(Debug, Clone, Copy)]
pub enum AssignTarget {
    Net(NetId),
    Port(PortId),
}

impl From<NetId> for AssignTarget {
    fn from(id: NetId) -> Self {
        AssignTarget::Net(id)
    }
}

impl From<PortId> for AssignTarget {
    fn from(id: PortId) -> Self {
        AssignTarget::Port(id)
    }
}

/// A named electrical equipotential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    pub uid: u64,
    pub name: String,
    #[serde(default)]
    pub net_type: NetType,
}

/// A circuit boundary terminal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub uid: u64,
    pub name: String,
    pub port_type: PortType,
    /// Net created inside the circuit on first use, named after the port
    #[serde(default)]
    pub internal_net: Option<u64>,
}

impl Port {
    /// Rail voltage this port contributes, from type and name
    pub fn voltage(&self) -> Option<f64> {
        match self.port_type {
            PortType::Power => voltage::parse(&self.name),
            PortType::Gnd => Some(0.0),
            _ => None,
        }
    }
}

/// Edge binding an inst function to a net
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstAssign {
    pub uid: u64,
    /// Group tag; members of one bus-group assignment share it
    pub guid: u64,
    /// uid of the owning inst
    pub inst: u64,
    pub function: String,
    pub to: Target,
    /// Resolved pin id within the component, set by pin assignment
    #[serde(default)]
    pub pin: Option<usize>,
    /// Declared type of the resolved pin, set by pin assignment
    #[serde(default)]
    pub pin_type: Option<PinType>,
    /// Driver/receiver role, set by analysis
    #[serde(default)]
    pub role: ErcRole,
}

/// Edge binding a port to a net
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortAssign {
    pub uid: u64,
    pub guid: u64,
    /// uid of the bound port
    pub port: u64,
    pub to: Target,
    /// External assigns live in the enclosing circuit; internal ones bind
    /// the port to its internal net
    pub external: bool,
    #[serde(default)]
    pub role: ErcRole,
}

mod component_ref {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(c: &Arc<Component>, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&c.name)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Arc<Component>, D::Error> {
        let name = String::deserialize(d)?;
        library::component_by_name(&name).map_err(serde::de::Error::custom)
    }
}

mod device_ref {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        d: &Option<Arc<Device>>,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match d {
            Some(device) => s.serialize_some(&device.name),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Option<Arc<Device>>, D::Error> {
        let name: Option<String> = Option::deserialize(d)?;
        match name {
            Some(name) => library::device_by_name(&name)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// An instance of a component within a circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inst {
    pub uid: u64,
    /// Starts as the component name; uniquified during elaboration
    pub name: String,
    #[serde(with = "component_ref")]
    pub component: Arc<Component>,
    #[serde(default)]
    pub value: Option<String>,
    /// Concrete device, set by device matching
    #[serde(default, with = "device_ref")]
    pub device: Option<Arc<Device>>,
    pub assigns: Vec<InstAssign>,
}

impl Inst {
    /// Qualified name of one of this inst's assigns, e.g. `R1.~`
    pub fn qualified_assign_name(&self, assign: &InstAssign) -> String {
        match assign.pin {
            Some(pin) => format!("{}.{}", self.name, self.component.pins[pin].name),
            None => format!("{}.{}", self.name, assign.function),
        }
    }
}

/// An instance of a nested circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubInst {
    pub uid: u64,
    pub name: String,
    pub circuit: Circuit,
}

/// A hierarchical circuit: the builder context and unit of elaboration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    pub uid: u64,
    pub name: String,
    /// uid of the enclosing circuit; relation only, never ownership
    #[serde(default)]
    pub parent: Option<u64>,
    pub nets: Vec<Net>,
    pub ports: Vec<Port>,
    pub insts: Vec<Inst>,
    pub subinsts: Vec<SubInst>,
    pub port_assigns: Vec<PortAssign>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let uid = next_uid();
        log::debug!("created circuit '{}' ({})", name, uid);
        Circuit {
            uid,
            name,
            parent: None,
            nets: Vec::new(),
            ports: Vec::new(),
            insts: Vec::new(),
            subinsts: Vec::new(),
            port_assigns: Vec::new(),
        }
    }

    /// Create a named net
    pub fn net(&mut self, name: impl Into<String>) -> Result<NetId> {
        let name = name.into();
        if self.net_by_name(&name).is_some() {
            return Err(Error::DuplicateName {
                kind: "net",
                name,
                scope: self.name.clone(),
            });
        }
        let uid = next_uid();
        log::debug!("net '{}' ({}) in '{}'", name, uid, self.name);
        self.nets.push(Net {
            uid,
            name,
            net_type: NetType::Signal,
        });
        Ok(NetId(uid))
    }

    /// Create several nets from whitespace-separated names
    pub fn nets(&mut self, names: &str) -> Result<Vec<NetId>> {
        names.split_whitespace().map(|n| self.net(n)).collect()
    }

    /// Create a port with an explicit direction type
    pub fn port(&mut self, name: impl Into<String>, port_type: PortType) -> Result<PortId> {
        let name = name.into();
        if self.port_by_name(&name).is_some() {
            return Err(Error::DuplicateName {
                kind: "port",
                name,
                scope: self.name.clone(),
            });
        }
        let uid = next_uid();
        log::debug!("port '{}' ({}) in '{}'", name, uid, self.name);
        self.ports.push(Port {
            uid,
            name,
            port_type,
            internal_net: None,
        });
        Ok(PortId(uid))
    }

    /// Create a port typed from its name: `gnd` and `0V` become ground
    /// ports, other parsable voltages power ports, the rest inputs
    pub fn port_auto(&mut self, name: impl Into<String>) -> Result<PortId> {
        let name = name.into();
        let port_type = match voltage::parse(&name) {
            Some(v) if v == 0.0 => PortType::Gnd,
            Some(_) => PortType::Power,
            None => PortType::In,
        };
        self.port(name, port_type)
    }

    /// Instantiate a registered component
    pub fn inst(&mut self, component: &str) -> Result<InstId> {
        self.add_inst(component, None)
    }

    /// Instantiate a registered component with a free-text value
    pub fn inst_with_value(&mut self, component: &str, value: &str) -> Result<InstId> {
        self.add_inst(component, Some(value.to_string()))
    }

    fn add_inst(&mut self, component: &str, value: Option<String>) -> Result<InstId> {
        let component = library::component_by_name(component)?;
        let uid = next_uid();
        log::debug!(
            "inst of '{}' ({}) in '{}'",
            component.name,
            uid,
            self.name
        );
        self.insts.push(Inst {
            uid,
            name: component.name.clone(),
            component,
            value,
            device: None,
            assigns: Vec::new(),
        });
        Ok(InstId(uid))
    }

    /// Instantiate a nested circuit
    pub fn subinst(&mut self, name: impl Into<String>, mut circuit: Circuit) -> Result<SubInstId> {
        let name = name.into();
        if self.subinsts.iter().any(|s| s.name == name) {
            return Err(Error::DuplicateName {
                kind: "subinst",
                name,
                scope: self.name.clone(),
            });
        }
        circuit.parent = Some(self.uid);
        let uid = next_uid();
        log::debug!(
            "subinst '{}' of '{}' ({}) in '{}'",
            name,
            circuit.name,
            uid,
            self.name
        );
        self.subinsts.push(SubInst { uid, name, circuit });
        Ok(SubInstId(uid))
    }

    /// Assign an inst function to a net or port of this circuit
    pub fn assign(
        &mut self,
        inst: InstId,
        function: &str,
        target: impl Into<AssignTarget>,
    ) -> Result<()> {
        let guid = next_uid();
        self.assign_with_guid(inst, function, target.into(), guid)
    }

    /// Assign a tuple of functions to a tuple of targets
    ///
    /// When every function is a bus function of the component the members
    /// share one fresh guid and pin assignment later forces them onto a
    /// single bus; a tuple of plain functions is sugar for individual
    /// assignments and every member gets its own guid.
    pub fn assign_bus(
        &mut self,
        inst: InstId,
        functions: &[&str],
        targets: &[AssignTarget],
    ) -> Result<()> {
        if functions.len() != targets.len() {
            let name = self
                .inst_by_id(inst)
                .map(|i| i.name.clone())
                .unwrap_or_default();
            return Err(Error::BusArityMismatch {
                inst: name,
                functions: functions.len(),
                targets: targets.len(),
            });
        }
        let all_bus = self
            .inst_by_id(inst)
            .map(|i| {
                functions
                    .iter()
                    .all(|f| i.component.is_bus_function(f))
            })
            .unwrap_or(false);
        let shared = if all_bus { Some(next_uid()) } else { None };
        for (function, target) in functions.iter().zip(targets) {
            let guid = shared.unwrap_or_else(next_uid);
            self.assign_with_guid(inst, function, *target, guid)?;
        }
        Ok(())
    }

    fn assign_with_guid(
        &mut self,
        inst: InstId,
        function: &str,
        target: AssignTarget,
        guid: u64,
    ) -> Result<()> {
        let to = self.resolve_target(target)?;
        let inst = self
            .insts
            .iter_mut()
            .find(|i| i.uid == inst.0)
            .ok_or(Error::UnknownUid {
                kind: "inst",
                uid: inst.0,
            })?;
        if !inst.component.has_function(function) {
            return Err(Error::UnknownFunction {
                component: inst.component.name.clone(),
                function: function.to_string(),
            });
        }
        let uid = next_uid();
        log::debug!("assign {}.{} ({})", inst.name, function, uid);
        inst.assigns.push(InstAssign {
            uid,
            guid,
            inst: inst.uid,
            function: function.to_string(),
            to,
            pin: None,
            pin_type: None,
            role: ErcRole::Unknown,
        });
        Ok(())
    }

    /// Bind a port of a subinst to a net or port of this circuit
    pub fn bind_port(
        &mut self,
        subinst: SubInstId,
        port_name: &str,
        target: impl Into<AssignTarget>,
    ) -> Result<()> {
        let to = self.resolve_bind_target(target.into())?;
        let sub = self
            .subinsts
            .iter()
            .find(|s| s.uid == subinst.0)
            .ok_or(Error::UnknownUid {
                kind: "subinst",
                uid: subinst.0,
            })?;
        let port = sub
            .circuit
            .port_by_name(port_name)
            .ok_or_else(|| Error::UnknownPort {
                circuit: sub.circuit.name.clone(),
                port: port_name.to_string(),
            })?;
        let port_uid = port.uid;
        if self
            .port_assigns
            .iter()
            .any(|a| a.port == port_uid && a.external)
        {
            return Err(Error::PortAlreadyBound {
                subinst: sub.name.clone(),
                port: port_name.to_string(),
            });
        }
        let uid = next_uid();
        log::debug!("bind port {}.{} ({})", sub.name, port_name, uid);
        self.port_assigns.push(PortAssign {
            uid,
            guid: uid,
            port: port_uid,
            to,
            external: true,
            role: ErcRole::Unknown,
        });
        Ok(())
    }

    /// Bind several subinst ports at once, pairwise
    pub fn bind_ports(
        &mut self,
        subinst: SubInstId,
        ports: &[&str],
        targets: &[AssignTarget],
    ) -> Result<()> {
        for (port, target) in ports.iter().zip(targets) {
            self.bind_port(subinst, port, *target)?;
        }
        Ok(())
    }

    /// An inst-assign target: a net stays as-is, a port of this circuit stays
    /// a port reference so elaboration can forward through it
    fn resolve_target(&mut self, target: AssignTarget) -> Result<Target> {
        match target {
            AssignTarget::Net(net) => {
                self.net_by_uid(net.0).ok_or(Error::UnknownUid {
                    kind: "net",
                    uid: net.0,
                })?;
                Ok(Target::Net(net.0))
            }
            AssignTarget::Port(port) => {
                self.port_internal_net(port.0)?;
                Ok(Target::Port(port.0))
            }
        }
    }

    /// A port-binding target: binding to a port of this circuit shares that
    /// port's internal net
    fn resolve_bind_target(&mut self, target: AssignTarget) -> Result<Target> {
        match target {
            AssignTarget::Net(net) => {
                self.net_by_uid(net.0).ok_or(Error::UnknownUid {
                    kind: "net",
                    uid: net.0,
                })?;
                Ok(Target::Net(net.0))
            }
            AssignTarget::Port(port) => Ok(Target::Net(self.port_internal_net(port.0)?)),
        }
    }

    /// Internal net of a port, created on first use and named after the port
    fn port_internal_net(&mut self, port_uid: u64) -> Result<u64> {
        let port = self
            .ports
            .iter()
            .find(|p| p.uid == port_uid)
            .ok_or(Error::UnknownUid {
                kind: "port",
                uid: port_uid,
            })?;
        if let Some(net) = port.internal_net {
            return Ok(net);
        }
        let port_name = port.name.clone();
        if self.net_by_name(&port_name).is_some() {
            return Err(Error::DuplicateName {
                kind: "net",
                name: port_name,
                scope: self.name.clone(),
            });
        }
        let net_uid = next_uid();
        self.nets.push(Net {
            uid: net_uid,
            name: port_name,
            net_type: NetType::Signal,
        });
        let assign_uid = next_uid();
        self.port_assigns.push(PortAssign {
            uid: assign_uid,
            guid: assign_uid,
            port: port_uid,
            to: Target::Net(net_uid),
            external: false,
            role: ErcRole::Unknown,
        });
        let port = self
            .ports
            .iter_mut()
            .find(|p| p.uid == port_uid)
            .expect("port existed above");
        port.internal_net = Some(net_uid);
        Ok(net_uid)
    }

    pub fn net_by_name(&self, name: &str) -> Option<&Net> {
        self.nets.iter().find(|n| n.name == name)
    }

    pub fn net_by_uid(&self, uid: u64) -> Option<&Net> {
        self.nets.iter().find(|n| n.uid == uid)
    }

    pub fn port_by_name(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_by_uid(&self, uid: u64) -> Option<&Port> {
        self.ports.iter().find(|p| p.uid == uid)
    }

    pub fn inst_by_id(&self, id: InstId) -> Option<&Inst> {
        self.insts.iter().find(|i| i.uid == id.0)
    }

    pub fn inst_by_name(&self, name: &str) -> Option<&Inst> {
        self.insts.iter().find(|i| i.name == name)
    }

    pub fn subinst_by_name(&self, name: &str) -> Option<&SubInst> {
        self.subinsts.iter().find(|s| s.name == name)
    }

    /// Total inst count across the hierarchy
    pub fn inst_count(&self) -> usize {
        self.insts.len()
            + self
                .subinsts
                .iter()
                .map(|s| s.circuit.inst_count())
                .sum::<usize>()
    }

    /// Largest uid occurring anywhere in this circuit tree
    pub(crate) fn max_uid(&self) -> u64 {
        let mut max = self.uid;
        for net in &self.nets {
            max = max.max(net.uid);
        }
        for port in &self.ports {
            max = max.max(port.uid);
        }
        for assign in &self.port_assigns {
            max = max.max(assign.uid).max(assign.guid);
        }
        for inst in &self.insts {
            max = max.max(inst.uid);
            for assign in &inst.assigns {
                max = max.max(assign.uid).max(assign.guid);
            }
        }
        for sub in &self.subinsts {
            max = max.max(sub.uid).max(sub.circuit.max_uid());
        }
        max
    }

    /// Serialize to a structured document
    pub fn to_object(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from a structured document, re-resolving library references
    /// and advancing the uid allocator past every uid seen
    pub fn from_object(value: serde_json::Value) -> Result<Circuit> {
        let circuit: Circuit = serde_json::from_value(value)?;
        ensure_uid_floor(circuit.max_uid());
        Ok(circuit)
    }

    /// Write the document form to a file
    pub fn to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(&serde_json::to_value(self)?)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load a circuit from a document file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Circuit> {
        let text = std::fs::read_to_string(path)?;
        Circuit::from_object(serde_json::from_str(&text)?)
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "circuit '{}' ({} insts, {} nets, {} subinsts)",
            self.name,
            self.insts.len(),
            self.nets.len(),
            self.subinsts.len()
        )
    }
}
