//! Process-wide part registries
//!
//! Components, packages and devices are registered once at startup by the
//! front-end library modules and only read afterwards. The tables keep
//! declaration order so every name-less lookup (first device of a component,
//! registry iteration) is deterministic.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::component::Component;
use crate::device::{Device, MapSpec};
use crate::errors::{Error, Result};
use crate::package::Package;

static COMPONENTS: Lazy<RwLock<IndexMap<String, Arc<Component>>>> =
    Lazy::new(|| RwLock::new(IndexMap::new()));
static PACKAGES: Lazy<RwLock<IndexMap<String, Arc<Package>>>> =
    Lazy::new(|| RwLock::new(IndexMap::new()));
static DEVICES: Lazy<RwLock<IndexMap<String, Arc<Device>>>> =
    Lazy::new(|| RwLock::new(IndexMap::new()));

/// Register a component under its unique name
pub fn register_component(component: Component) -> Result<Arc<Component>> {
    let mut table = COMPONENTS.write();
    if table.contains_key(&component.name) {
        return Err(Error::AlreadyRegistered {
            kind: "component",
            name: component.name,
        });
    }
    log::debug!("registered component '{}'", component.name);
    let component = Arc::new(component);
    table.insert(component.name.clone(), component.clone());
    Ok(component)
}

/// Register a package under its unique name
pub fn register_package(package: Package) -> Result<Arc<Package>> {
    let mut table = PACKAGES.write();
    if table.contains_key(&package.name) {
        return Err(Error::AlreadyRegistered {
            kind: "package",
            name: package.name,
        });
    }
    log::debug!("registered package '{}'", package.name);
    let package = Arc::new(package);
    table.insert(package.name.clone(), package.clone());
    Ok(package)
}

/// Build and register a device binding a registered component and package
pub fn register_device<'a, I, M>(
    name: &str,
    component: &str,
    package: &str,
    maps: I,
) -> Result<Arc<Device>>
where
    I: IntoIterator<Item = M>,
    M: Into<MapSpec<'a>>,
{
    let component = component_by_name(component)?;
    let package = package_by_name(package)?;
    let device = Device::build(name, component, package, maps)?;

    let mut table = DEVICES.write();
    if table.contains_key(&device.name) {
        return Err(Error::AlreadyRegistered {
            kind: "device",
            name: device.name,
        });
    }
    log::debug!("registered device '{}'", device.name);
    let device = Arc::new(device);
    table.insert(device.name.clone(), device.clone());
    Ok(device)
}

pub fn component_by_name(name: &str) -> Result<Arc<Component>> {
    COMPONENTS
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownComponent(name.to_string()))
}

pub fn package_by_name(name: &str) -> Result<Arc<Package>> {
    PACKAGES
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownPackage(name.to_string()))
}

pub fn device_by_name(name: &str) -> Result<Arc<Device>> {
    DEVICES
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::UnknownDevice(name.to_string()))
}

/// All devices realizing a component, in declaration order
pub fn devices_by_component(component: &Component) -> Vec<Arc<Device>> {
    DEVICES
        .read()
        .values()
        .filter(|d| d.component.name == component.name)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{FunSpec, PinSpec};

    #[test]
    fn registry_round_trip_and_declaration_order() {
        let component = Component::new("LIBTEST_R", "Resistor")
            .with_pin(PinSpec::new("A").fun(FunSpec::plain("~")).required())
            .unwrap()
            .with_pin(PinSpec::new("B").fun(FunSpec::plain("~")).required())
            .unwrap();
        register_component(component).unwrap();
        register_package(
            Package::rect("LIBTEST_0805", 2.0, 1.25)
                .with_pads(["1", "2"])
                .unwrap(),
        )
        .unwrap();
        register_package(
            Package::rect("LIBTEST_0603", 1.6, 0.8)
                .with_pads(["1", "2"])
                .unwrap(),
        )
        .unwrap();

        register_device(
            "LIBTEST_R0805",
            "LIBTEST_R",
            "LIBTEST_0805",
            [("1", "A"), ("2", "B")],
        )
        .unwrap();
        register_device(
            "LIBTEST_R0603",
            "LIBTEST_R",
            "LIBTEST_0603",
            [("1", "A"), ("2", "B")],
        )
        .unwrap();

        let component = component_by_name("LIBTEST_R").unwrap();
        let devices = devices_by_component(&component);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "LIBTEST_R0805");
        assert_eq!(devices[1].name, "LIBTEST_R0603");

        assert!(component_by_name("LIBTEST_NOPE").is_err());
        assert!(register_component(Component::new("LIBTEST_R", "again")).is_err());
    }
}
