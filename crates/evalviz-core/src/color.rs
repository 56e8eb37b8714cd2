//! Three-stop color ramp for probabilities and attention weights.
//!
//! Values are interpolated linearly in RGB between `pink`, `yellow` and
//! `lightgreen`, anchored at the `lo`, `mid` and `hi` breakpoints of a
//! [`Domain`]. Values outside the domain clamp to the end colors. The clamps
//! are inclusive and win over a collapsed breakpoint: with `lo == mid`, `lo`
//! itself is still the low-end color. NaN is treated as `lo`, so missing
//! probabilities render as the low-end color.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| -> u8 {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Rgb::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

pub const PINK: Rgb = Rgb::new(0xff, 0xc0, 0xcb);
pub const YELLOW: Rgb = Rgb::new(0xff, 0xff, 0x00);
pub const LIGHT_GREEN: Rgb = Rgb::new(0x90, 0xee, 0x90);

/// Breakpoints `[lo, mid, hi]` of the ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Domain {
    pub lo: f64,
    pub mid: f64,
    pub hi: f64,
}

impl Domain {
    /// Token probabilities in `[0, 1]`.
    pub const PROBABILITY: Domain = Domain::new(0.15, 0.3, 1.0);
    /// Attention weights, which are not bounded by 1.
    pub const ATTENTION: Domain = Domain::new(0.5, 1.0, 2.0);

    pub const fn new(lo: f64, mid: f64, hi: f64) -> Self {
        Self { lo, mid, hi }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::PROBABILITY
    }
}

impl From<[f64; 3]> for Domain {
    fn from([lo, mid, hi]: [f64; 3]) -> Self {
        Self::new(lo, mid, hi)
    }
}

impl From<Domain> for [f64; 3] {
    fn from(d: Domain) -> Self {
        [d.lo, d.mid, d.hi]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    stops: [Rgb; 3],
    domain: Domain,
}

impl ColorScale {
    pub fn new(domain: Domain) -> Self {
        Self {
            stops: [PINK, YELLOW, LIGHT_GREEN],
            domain,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn color(&self, value: f64) -> Rgb {
        let [low, mid, high] = self.stops;
        let Domain { lo, mid: m, hi } = self.domain;
        let value = if value.is_nan() { lo } else { value };

        if value <= lo {
            low
        } else if value >= hi {
            high
        } else if value < m {
            low.lerp(mid, segment_t(value, lo, m))
        } else if value == m {
            mid
        } else {
            mid.lerp(high, segment_t(value, m, hi))
        }
    }

    pub fn hex(&self, value: f64) -> String {
        self.color(value).hex()
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new(Domain::PROBABILITY)
    }
}

fn segment_t(value: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span <= 0.0 {
        1.0
    } else {
        ((value - start) / span).clamp(0.0, 1.0)
    }
}

/// Hex color for `value` under `domain`.
pub fn color_for(value: f64, domain: Domain) -> String {
    ColorScale::new(domain).hex(value)
}

/// Like [`color_for`], for values that may be missing.
pub fn color_for_opt(value: Option<f64>, domain: Domain) -> String {
    color_for(value.unwrap_or(f64::NAN), domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_stops_clamp() {
        assert_eq!(color_for(0.0, Domain::PROBABILITY), "#ffc0cb");
        assert_eq!(color_for(0.15, Domain::PROBABILITY), "#ffc0cb");
        assert_eq!(color_for(1.0, Domain::PROBABILITY), "#90ee90");
        assert_eq!(color_for(7.5, Domain::PROBABILITY), "#90ee90");
    }

    #[test]
    fn mid_breakpoint_is_pure_yellow() {
        assert_eq!(color_for(0.3, Domain::PROBABILITY), "#ffff00");
        assert_eq!(color_for(1.0, Domain::ATTENTION), "#ffff00");
    }

    #[test]
    fn interpolates_between_stops() {
        // halfway between pink and yellow
        let c = ColorScale::new(Domain::new(0.0, 1.0, 2.0)).color(0.5);
        assert_eq!(c, Rgb::new(0xff, 0xe0, 0x66));
    }

    #[test]
    fn nan_falls_back_to_low_end() {
        assert_eq!(color_for(f64::NAN, Domain::PROBABILITY), "#ffc0cb");
        assert_eq!(color_for_opt(None, Domain::ATTENTION), "#ffc0cb");
    }

    #[test]
    fn collapsed_segment_does_not_divide_by_zero() {
        // lo == mid: the inclusive low clamp wins over the mid stop.
        let d = Domain::new(0.5, 0.5, 1.0);
        assert_eq!(color_for(0.5, d), "#ffc0cb");
        assert_eq!(color_for(0.4999, d), "#ffc0cb");
        assert_eq!(color_for(0.75, d), "#c8f748");
        let d = Domain::new(0.0, 1.0, 1.0);
        assert_eq!(color_for(1.0, d), "#90ee90");
    }

    #[test]
    fn domain_round_trips_as_array() {
        let d: Domain = serde_json::from_str("[0.5, 1.0, 2.0]").unwrap();
        assert_eq!(d, Domain::ATTENTION);
    }
}
