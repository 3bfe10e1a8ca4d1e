//! Dimension values and pixel ↔ percentage conversion.
//!
//! A node declares its width and height as strings: `"120px"`, `"50%"`,
//! `"auto"`, or a bare number (read as pixels). Everything here is pure
//! arithmetic; nothing fails loudly. Malformed input resolves to `0` so a
//! node always ends up with a renderable size.

use serde::{Deserialize, Serialize};
use std::fmt;
use winnow::ascii::{float, space0};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;

/// Decimal places kept when formatting a dimension back to a string.
pub const DEFAULT_PRECISION: u32 = 4;

/// A parsed width or height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Dimension {
    /// Size follows content / parent.
    Auto,
    /// Absolute pixels.
    Px(f64),
    /// Percentage of the parent's content box on the same axis.
    Percent(f64),
}

impl Dimension {
    /// Parse a raw dimension string. Returns `None` for anything malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim();
        let dim = parse_dimension.parse_next(&mut rest).ok()?;
        if !rest.is_empty() {
            return None;
        }
        match dim {
            Dimension::Px(v) | Dimension::Percent(v) if !v.is_finite() => None,
            d => Some(d),
        }
    }

    pub fn is_percentage(&self) -> bool {
        matches!(self, Dimension::Percent(_))
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Dimension::Auto)
    }

    /// Pixel value against `reference`, never negative. `Auto` resolves
    /// to 0.
    pub fn to_px(&self, reference: f64) -> f64 {
        let px = match *self {
            Dimension::Auto => 0.0,
            Dimension::Px(v) => finite_or_zero(v),
            Dimension::Percent(pct) => finite_or_zero(pct / 100.0 * finite_or_zero(reference)),
        };
        px.max(0.0)
    }

    /// Format with `precision` decimals, clamping negatives to 0.
    pub fn format(&self, precision: u32) -> String {
        match *self {
            Dimension::Auto => "auto".to_string(),
            Dimension::Px(v) => format!("{}px", round_to(v, precision)),
            Dimension::Percent(v) => format!("{}%", round_to(v, precision)),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DEFAULT_PRECISION))
    }
}

fn parse_dimension(input: &mut &str) -> ModalResult<Dimension> {
    alt((
        "auto".value(Dimension::Auto),
        (parse_number, space0, opt(alt(("px", "%")))).map(|(n, _, unit)| match unit {
            Some("%") => Dimension::Percent(n),
            _ => Dimension::Px(n),
        }),
    ))
    .parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    float.parse_next(input)
}

/// True iff `raw` is a well-formed percentage such as `"37.5%"`.
pub fn is_percentage(raw: &str) -> bool {
    Dimension::parse(raw).is_some_and(|d| d.is_percentage())
}

/// Convert pixels to a percentage of `reference`.
///
/// A zero, negative, or non-finite reference yields 0 so a detached or
/// collapsed parent never produces `NaN` or infinity.
pub fn px_to_percent(px: f64, reference: f64) -> f64 {
    if !px.is_finite() || !reference.is_finite() || reference <= 0.0 {
        return 0.0;
    }
    finite_or_zero(px / reference * 100.0)
}

/// Resolve a raw dimension string to pixels against `reference`.
///
/// Percentages scale the reference, pixels pass through unchanged, and
/// `auto` or malformed input is 0.
pub fn percent_to_px(raw: &str, reference: f64) -> f64 {
    Dimension::parse(raw).map_or(0.0, |d| d.to_px(reference))
}

pub fn format_px(value: f64, precision: u32) -> String {
    Dimension::Px(value).format(precision)
}

pub fn format_percent(value: f64, precision: u32) -> String {
    Dimension::Percent(value).format(precision)
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    let factor = 10f64.powi(precision.min(12) as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_units() {
        assert_eq!(Dimension::parse("120px"), Some(Dimension::Px(120.0)));
        assert_eq!(Dimension::parse(" 50% "), Some(Dimension::Percent(50.0)));
        assert_eq!(Dimension::parse("37.5%"), Some(Dimension::Percent(37.5)));
        assert_eq!(Dimension::parse("auto"), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("80"), Some(Dimension::Px(80.0)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Dimension::parse(""), None);
        assert_eq!(Dimension::parse("wide"), None);
        assert_eq!(Dimension::parse("12em"), None);
        assert_eq!(Dimension::parse("%"), None);
        assert_eq!(Dimension::parse("10px%"), None);
    }

    #[test]
    fn percentage_classification() {
        assert!(is_percentage("50%"));
        assert!(is_percentage(" 0% "));
        assert!(!is_percentage("50px"));
        assert!(!is_percentage("auto"));
        assert!(!is_percentage("abc%"));
    }

    #[test]
    fn px_to_percent_basic() {
        assert_eq!(px_to_percent(150.0, 500.0), 30.0);
        assert_eq!(px_to_percent(600.0, 400.0), 150.0);
    }

    #[test]
    fn px_to_percent_degenerate_reference() {
        assert_eq!(px_to_percent(120.0, 0.0), 0.0);
        assert_eq!(px_to_percent(120.0, -10.0), 0.0);
        assert_eq!(px_to_percent(120.0, f64::NAN), 0.0);
        assert_eq!(px_to_percent(f64::INFINITY, 100.0), 0.0);
    }

    #[test]
    fn percent_to_px_variants() {
        assert_eq!(percent_to_px("50%", 400.0), 200.0);
        assert_eq!(percent_to_px("120px", 400.0), 120.0);
        assert_eq!(percent_to_px("auto", 400.0), 0.0);
        assert_eq!(percent_to_px("nonsense", 400.0), 0.0);
        assert_eq!(percent_to_px("50%", f64::NAN), 0.0);
    }

    #[test]
    fn negative_dimensions_resolve_to_zero() {
        assert_eq!(Dimension::parse("-5px"), Some(Dimension::Px(-5.0)));
        assert_eq!(Dimension::Px(-5.0).to_px(400.0), 0.0);
        assert_eq!(Dimension::Percent(-10.0).to_px(400.0), 0.0);
        assert_eq!(percent_to_px("-25%", 400.0), 0.0);
    }

    #[test]
    fn formatting_trims_float_noise() {
        assert_eq!(format_px(150.0, 4), "150px");
        assert_eq!(format_percent(30.000000000000004, 4), "30%");
        assert_eq!(format_percent(33.333333, 2), "33.33%");
        assert_eq!(format_px(-12.0, 4), "0px");
        assert_eq!(Dimension::Auto.to_string(), "auto");
    }
}
