//! Physical packages: footprint outline and pads

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{Error, Result};

/// A 2D point of the courtyard polygon, in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// A package pad; pads are ordered as declared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pad {
    pub name: String,
}

/// A physical footprint referenced by devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    /// Closed courtyard polygon
    pub courtyard: Vec<Point>,
    pub pads: Vec<Pad>,
}

impl Package {
    pub fn new(name: impl Into<String>, courtyard: Vec<Point>) -> Self {
        Package {
            name: name.into(),
            courtyard,
            pads: Vec::new(),
        }
    }

    /// Rectangular courtyard helper, centered on the origin
    pub fn rect(name: impl Into<String>, width: f64, height: f64) -> Self {
        let (w, h) = (width / 2.0, height / 2.0);
        Package::new(
            name,
            vec![
                Point::new(-w, -h),
                Point::new(w, -h),
                Point::new(w, h),
                Point::new(-w, h),
            ],
        )
    }

    pub fn add_pad(&mut self, name: impl Into<String>) -> Result<&mut Self> {
        let name = name.into();
        if self.pad_by_name(&name).is_some() {
            return Err(Error::DuplicateName {
                kind: "pad",
                name,
                scope: self.name.clone(),
            });
        }
        self.pads.push(Pad { name });
        Ok(self)
    }

    /// Chain-style pad addition for library declarations
    pub fn with_pads<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.add_pad(name)?;
        }
        Ok(self)
    }

    pub fn pad_by_name(&self, name: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.name == name)
    }

    pub fn pad_id_by_name(&self, name: &str) -> Option<usize> {
        self.pads.iter().position(|p| p.name == name)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
