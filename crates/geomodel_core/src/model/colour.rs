//! Display colour normalisation for stratigraphic units.
//!
//! Accepted inputs: `#rgb`, `#rrggbb`, `#rrggbbaa` (alpha dropped),
//! `rgb(r, g, b)` with 0-255 channels, and `r,g,b` float triples in `[0, 1]`.
//! The canonical form is lowercase `#rrggbb`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

static HEX_COLOUR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#?([0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("static regex")
});
static RGB_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[0-9.]+\s*)?\)$")
        .expect("static regex")
});
static UNIT_TRIPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?\s*([0-9]*\.?[0-9]+)\s*,\s*([0-9]*\.?[0-9]+)\s*,\s*([0-9]*\.?[0-9]+)\s*\)?$")
        .expect("static regex")
});

/// Opaque RGB colour with a canonical `#rrggbb` string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colour {
    rgb: [u8; 3],
}

impl Colour {
    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            rgb: [red, green, blue],
        }
    }

    /// Parses any supported notation; returns `None` when unrecognised.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Some(caps) = HEX_COLOUR.captures(trimmed) {
            return parse_hex(&caps[1]);
        }
        if let Some(caps) = RGB_FUNCTION.captures(trimmed) {
            let mut rgb = [0_u8; 3];
            for (slot, index) in rgb.iter_mut().zip(1..=3) {
                *slot = caps[index].parse::<u8>().ok()?;
            }
            return Some(Self { rgb });
        }
        if let Some(caps) = UNIT_TRIPLE.captures(trimmed) {
            let mut rgb = [0_u8; 3];
            for (slot, index) in rgb.iter_mut().zip(1..=3) {
                let channel = caps[index].parse::<f64>().ok()?;
                if !(0.0..=1.0).contains(&channel) {
                    return None;
                }
                *slot = (channel * 255.0).round() as u8;
            }
            return Some(Self { rgb });
        }
        None
    }

    pub fn rgb(&self) -> [u8; 3] {
        self.rgb
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.rgb[0], self.rgb[1], self.rgb[2])
    }
}

fn parse_hex(digits: &str) -> Option<Colour> {
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits[..6].to_string()
    };
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&expanded[range], 16).ok();
    Some(Colour {
        rgb: [channel(0..2)?, channel(2..4)?, channel(4..6)?],
    })
}

impl Display for Colour {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Colour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Colour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Colour::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised colour `{raw}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::Colour;

    #[test]
    fn normalises_hex_forms() {
        assert_eq!(Colour::parse("#ABC").map(|c| c.to_hex()), Some("#aabbcc".to_string()));
        assert_eq!(Colour::parse("1f2e3d").map(|c| c.to_hex()), Some("#1f2e3d".to_string()));
        assert_eq!(
            Colour::parse(" #1F2E3D80 ").map(|c| c.to_hex()),
            Some("#1f2e3d".to_string())
        );
    }

    #[test]
    fn normalises_rgb_function_and_unit_triples() {
        assert_eq!(Colour::parse("rgb(255, 0, 16)"), Some(Colour::from_rgb(255, 0, 16)));
        assert_eq!(Colour::parse("(1.0, 0.5, 0)"), Some(Colour::from_rgb(255, 128, 0)));
    }

    #[test]
    fn rejects_unrecognised_values() {
        assert_eq!(Colour::parse("sandstone"), None);
        assert_eq!(Colour::parse("rgb(300, 0, 0)"), None);
        assert_eq!(Colour::parse("2.0, 0.1, 0.1"), None);
        assert_eq!(Colour::parse("#12345"), None);
    }
}
