//! CSS-style length parsing.
//!
//! Bleed is given in print units (`3mm`, `0.125in` is *not* accepted: the
//! magnitude is an integer) and converted to CSS pixels at 96 dpi, except for
//! inches which use the 90 px/in factor the card templates were tuned for.
//!
//! | Unit | Pixels per unit |
//! |------|-----------------|
//! | `px` | 1 |
//! | `mm` | 3.7795275591 |
//! | `cm` | 37.795275591 |
//! | `in` | 90 |
//! | `pt` | 1.3333333333 |
//! | `pc` | 16 |

use once_cell::sync::Lazy;
use regex::Regex;

static LENGTH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+)\s*([A-Za-z]+)\s*$").expect("length pattern is valid")
});

/// Errors produced by [`parse_length`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LengthError {
    #[error("'{0}' is not a length (expected e.g. 3mm)")]
    Malformed(String),

    #[error("length cannot be negative: '{0}'")]
    Negative(String),

    #[error("unknown length unit '{0}' (expected px, mm, cm, in, pt or pc)")]
    UnknownUnit(String),

    #[error("length '{0}' is too large")]
    TooLarge(String),
}

/// A supported length unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Px,
    Mm,
    Cm,
    In,
    Pt,
    Pc,
}

impl LengthUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "px" => Some(Self::Px),
            "mm" => Some(Self::Mm),
            "cm" => Some(Self::Cm),
            "in" => Some(Self::In),
            "pt" => Some(Self::Pt),
            "pc" => Some(Self::Pc),
            _ => None,
        }
    }

    /// Conversion factor to pixels.
    pub fn pixels_per_unit(self) -> f64 {
        match self {
            Self::Px => 1.0,
            Self::Mm => 3.7795275591,
            Self::Cm => 37.795275591,
            Self::In => 90.0,
            Self::Pt => 1.3333333333,
            Self::Pc => 16.0,
        }
    }
}

/// Parses `<integer><unit>` into whole pixels, rounding to nearest.
///
/// ```rust
/// use cardpress_render::parse_length;
///
/// assert_eq!(parse_length("3mm").unwrap(), 11);
/// assert_eq!(parse_length("10 px").unwrap(), 10);
/// assert!(parse_length("3furlongs").is_err());
/// ```
pub fn parse_length(input: &str) -> Result<u32, LengthError> {
    let caps = LENGTH_PATTERN
        .captures(input)
        .ok_or_else(|| LengthError::Malformed(input.to_string()))?;

    let magnitude: i64 = caps[1]
        .parse()
        .map_err(|_| LengthError::TooLarge(input.to_string()))?;
    if magnitude < 0 {
        return Err(LengthError::Negative(input.to_string()));
    }

    let unit = LengthUnit::from_suffix(&caps[2])
        .ok_or_else(|| LengthError::UnknownUnit(caps[2].to_string()))?;

    let pixels = (magnitude as f64 * unit.pixels_per_unit()).round();
    if pixels > f64::from(u32::MAX) {
        return Err(LengthError::TooLarge(input.to_string()));
    }
    Ok(pixels as u32)
}
