//! Voltage-string grammar
//!
//! Net names, port names and power-pin names share one small grammar that
//! maps a string to a rail voltage. The reserved names `gnd`, `vcc` and `vee`
//! stand for ground and the unspecified positive/negative rails; concrete
//! voltages are written `3.3V`, `V3.3`, `3V3` or `0V`. Matching is
//! case-insensitive.

use once_cell::sync::Lazy;
use regex::Regex;

static SUFFIX_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-+]?[0-9]+(?:\.[0-9]+)?)[vV]$").expect("voltage regex"));
static PREFIX_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[vV]([-+]?[0-9]+(?:\.[0-9]+)?)$").expect("voltage regex"));
static INFIX_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-+]?)([0-9]+)[vV]([0-9]+)$").expect("voltage regex"));

/// Parse a voltage string; `None` when the string is not voltage-shaped.
///
/// `gnd` and `0V` parse to zero, `vcc` to `+inf`, `vee` to `-inf`.
pub fn parse(text: &str) -> Option<f64> {
    match text.to_ascii_lowercase().as_str() {
        "gnd" => return Some(0.0),
        "vcc" => return Some(f64::INFINITY),
        "vee" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if let Some(caps) = SUFFIX_FORM.captures(text).or_else(|| PREFIX_FORM.captures(text)) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = INFIX_FORM.captures(text) {
        let volts: f64 = format!("{}.{}", &caps[2], &caps[3]).parse().ok()?;
        return Some(if &caps[1] == "-" { -volts } else { volts });
    }
    None
}
