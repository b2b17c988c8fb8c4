//! Engineering-notation component values
//!
//! Free-text inst values like `10k`, `4.7uF` or `100n` parse into a numeric
//! value plus an optional unit. Values can be snapped to a preferred-number
//! series (E3/E6/E12/E24) and pretty-printed back in engineering notation.

use once_cell::sync::Lazy;
use regex::Regex;

/// E3 preferred-number series
pub const E3: &[f64] = &[1.0, 2.2, 4.7];
/// E6 preferred-number series
pub const E6: &[f64] = &[1.0, 1.5, 2.2, 3.3, 4.7, 6.8];
/// E12 preferred-number series
pub const E12: &[f64] = &[1.0, 1.2, 1.5, 1.8, 2.2, 2.7, 3.3, 3.9, 4.7, 5.6, 6.8, 8.2];
/// E24 preferred-number series
pub const E24: &[f64] = &[
    1.0, 1.1, 1.2, 1.3, 1.5, 1.6, 1.8, 2.0, 2.2, 2.4, 2.7, 3.0, 3.3, 3.6, 3.9, 4.3, 4.7, 5.1,
    5.6, 6.2, 6.8, 7.5, 8.2, 9.1,
];

static VALUE_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)(?:\.([0-9]+))?([munpfkKMGTP])?([HF])?$").expect("value regex")
});

fn multiplier(prefix: &str) -> f64 {
    match prefix {
        "m" => 1e-3,
        "u" => 1e-6,
        "n" => 1e-9,
        "p" => 1e-12,
        "f" => 1e-15,
        "k" | "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        _ => 1.0,
    }
}

/// A parsed engineering value
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Numeric value in base units
    pub value: f64,
    /// Unit symbol, empty for dimensionless values such as resistances
    pub unit: String,
}

impl Value {
    /// Default series for a unit: inductors E6, capacitors E12, rest E24
    pub fn default_series(unit: &str) -> &'static [f64] {
        match unit {
            "H" => E6,
            "F" => E12,
            _ => E24,
        }
    }

    /// Parse a single token; `None` when it is not value-shaped
    pub fn parse(text: &str) -> Option<Value> {
        let caps = VALUE_FORM.captures(text)?;
        let integral = &caps[1];
        let frac = caps.get(2).map_or("0", |m| m.as_str());
        let mult = caps.get(3).map_or(1.0, |m| multiplier(m.as_str()));
        let unit = caps.get(4).map_or("", |m| m.as_str());
        let base: f64 = format!("{integral}.{frac}").parse().ok()?;
        Some(Value {
            value: base * mult,
            unit: unit.to_string(),
        })
    }

    /// Snap to the nearest value of the series for this unit
    pub fn from_series(&self) -> f64 {
        let series = Value::default_series(&self.unit);
        if self.value <= 0.0 {
            return self.value;
        }
        let exp = self.value.log10().floor();
        let normalized = self.value / 10f64.powf(exp);
        let mut selected = 1.0;
        let mut delta = 10.0;
        for &candidate in series {
            let diff = (candidate - normalized).abs();
            if diff < delta - 0.01 {
                selected = candidate;
                delta = diff;
            }
        }
        selected * 10f64.powf(exp)
    }

    /// Engineering-notation rendering of the snapped value, e.g. `10K`, `4.7uF`
    pub fn pretty(&self) -> String {
        let value = self.from_series();
        if value == 0.0 {
            return format!("0{}", self.unit);
        }
        let exp = value.abs().log10().floor() as i32;
        let scale_exp = exp - exp.rem_euclid(3);
        let scaled = value / 10f64.powi(scale_exp);
        let symbol = match scale_exp {
            -15 => "f",
            -12 => "p",
            -9 => "n",
            -6 => "u",
            -3 => "m",
            0 => "",
            3 => "K",
            6 => "M",
            9 => "G",
            12 => "T",
            15 => "P",
            _ => return format!("{}e{}{}", scaled, scale_exp, self.unit),
        };
        if scaled.fract() == 0.0 {
            format!("{}{}{}", scaled as i64, symbol, self.unit)
        } else {
            format!("{}{}{}", scaled, symbol, self.unit)
        }
    }
}
