//! Devices: concrete component-to-package bindings
//!
//! A [`Device`] realizes a [`Component`] in a [`Package`] through an explicit
//! pin-to-pad map. Construction validates the map the way the inventory
//! expects it: every pin and every pad is accounted for, and only optional
//! pins may go without a pad.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::component::Component;
use crate::errors::{Error, Result};
use crate::package::Package;

/// One entry of the pin-to-pad map; either side may be absent but not both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinPadMap {
    /// Pad index into the package, `None` for pins without a pad
    pub pad: Option<usize>,
    /// Pin index into the component, `None` for pads wired to nothing
    pub pin: Option<usize>,
}

/// Map declaration by names; empty pin name means an unconnected pad
#[derive(Debug, Clone)]
pub struct MapSpec<'a> {
    pub pad: &'a str,
    pub pin: Option<&'a str>,
}

impl<'a> From<(&'a str, &'a str)> for MapSpec<'a> {
    fn from((pad, pin): (&'a str, &'a str)) -> Self {
        MapSpec {
            pad,
            pin: if pin.is_empty() { None } else { Some(pin) },
        }
    }
}

/// A concrete realization of a component in a package
///
/// Devices live in the registry and are referenced by name from persisted
/// documents, so the struct itself does not serialize.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: String,
    pub component: Arc<Component>,
    pub package: Arc<Package>,
    pub maps: Vec<PinPadMap>,
}

impl Device {
    /// Build and validate a device from name-based map entries
    pub fn build<'a, I, M>(
        name: impl Into<String>,
        component: Arc<Component>,
        package: Arc<Package>,
        maps: I,
    ) -> Result<Device>
    where
        I: IntoIterator<Item = M>,
        M: Into<MapSpec<'a>>,
    {
        let name = name.into();
        let mut resolved = Vec::new();
        for map in maps {
            let map = map.into();
            let pad = package
                .pad_id_by_name(map.pad)
                .ok_or_else(|| Error::UnmappedPad {
                    device: name.clone(),
                    package: package.name.clone(),
                    pad: map.pad.to_string(),
                })?;
            let pin = match map.pin {
                Some(pin_name) => Some(component.pin_id_by_name(pin_name).ok_or_else(|| {
                    Error::UnmappedPin {
                        device: name.clone(),
                        component: component.name.clone(),
                        pin: pin_name.to_string(),
                    }
                })?),
                None => None,
            };
            resolved.push(PinPadMap {
                pad: Some(pad),
                pin,
            });
        }

        let device = Device {
            name,
            component,
            package,
            maps: resolved,
        };
        device.check()?;
        Ok(device)
    }

    /// Every pin and every pad must appear in the map; pad-less pins must be optional
    fn check(&self) -> Result<()> {
        for (pin_id, pin) in self.component.pins.iter().enumerate() {
            let mapped = self.maps.iter().any(|m| m.pin == Some(pin_id));
            if !mapped && !pin.optional {
                return Err(Error::MissingPadMap {
                    device: self.name.clone(),
                    pin: pin.name.clone(),
                });
            }
        }
        for pad_id in 0..self.package.pads.len() {
            if !self.maps.iter().any(|m| m.pad == Some(pad_id)) {
                return Err(Error::UnmappedPad {
                    device: self.name.clone(),
                    package: self.package.name.clone(),
                    pad: self.package.pads[pad_id].name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Pin mapped to a pad, if any
    pub fn pin_by_pad(&self, pad: usize) -> Option<usize> {
        self.maps
            .iter()
            .find(|m| m.pad == Some(pad))
            .and_then(|m| m.pin)
    }

    /// Pads mapped to a pin, in map order
    pub fn pads_by_pin(&self, pin: usize) -> impl Iterator<Item = usize> + '_ {
        self.maps
            .iter()
            .filter(move |m| m.pin == Some(pin))
            .filter_map(|m| m.pad)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
