//! Color parsing and formatting for LED control.
//!
//! Colors are straight RGBA, one byte per channel. Alpha is passed through to
//! the host untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CueError;

/// An RGBA color as submitted to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    /// Fully opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba::new(r, g, b, 255)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_color(*self))
    }
}

impl FromStr for Rgba {
    type Err = CueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_color(*self))
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff000080"` (with alpha)
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`
/// - `"off"` / `"black"` (opaque black), `"transparent"`
pub fn parse_color(s: &str) -> crate::error::Result<Rgba> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgba::rgb(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgba::rgb(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgba::rgb(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgba::WHITE),
        "orange" => return Ok(Rgba::rgb(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgba::rgb(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgba::rgb(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgba::rgb(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgba::BLACK),
        "transparent" => return Ok(Rgba::TRANSPARENT),
        _ => {}
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 && hex.len() != 8 {
        return Err(CueError::Color(format!(
            "Invalid color: {s} (use #RRGGBB, #RRGGBBAA or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| CueError::Color(format!("Invalid hex color: {s}")))?;
    let val = if hex.len() == 6 { (val << 8) | 0xFF } else { val };
    let [r, g, b, a] = val.to_be_bytes();
    Ok(Rgba::new(r, g, b, a))
}

/// Format a color as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
pub fn format_color(color: Rgba) -> String {
    let Rgba { r, g, b, a } = color;
    if a == 0xFF {
        format!("#{r:02X}{g:02X}{b:02X}")
    } else {
        format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_color ──

    #[test]
    fn parse_named_primaries() {
        assert_eq!(parse_color("red").unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(parse_color("green").unwrap(), Rgba::rgb(0, 255, 0));
        assert_eq!(parse_color("blue").unwrap(), Rgba::rgb(0, 0, 255));
    }

    #[test]
    fn parse_named_off_and_transparent() {
        assert_eq!(parse_color("off").unwrap(), Rgba::BLACK);
        assert_eq!(parse_color("black").unwrap(), Rgba::BLACK);
        assert_eq!(parse_color("transparent").unwrap(), Rgba::TRANSPARENT);
    }

    #[test]
    fn parse_named_case_insensitive() {
        assert_eq!(parse_color("RED").unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(parse_color("  Red  ").unwrap(), Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn parse_hex_rgb_is_opaque() {
        assert_eq!(parse_color("#123456").unwrap(), Rgba::new(0x12, 0x34, 0x56, 0xFF));
        assert_eq!(parse_color("abcdef").unwrap(), Rgba::new(0xAB, 0xCD, 0xEF, 0xFF));
    }

    #[test]
    fn parse_hex_rgba_keeps_alpha() {
        assert_eq!(
            parse_color("#12345680").unwrap(),
            Rgba::new(0x12, 0x34, 0x56, 0x80)
        );
    }

    #[test]
    fn parse_invalid_lengths() {
        assert!(parse_color("#FFF").is_err());
        assert!(parse_color("#FF00000").is_err());
        assert!(parse_color("#FF0000000").is_err());
    }

    #[test]
    fn parse_invalid_name_and_chars() {
        assert!(parse_color("chartreuse").is_err());
        assert!(parse_color("#GGHHII").is_err());
    }

    #[test]
    fn from_str_delegates() {
        let c: Rgba = "cyan".parse().unwrap();
        assert_eq!(c, Rgba::rgb(0, 255, 255));
    }

    // ── format_color ──

    #[test]
    fn format_opaque_omits_alpha() {
        assert_eq!(format_color(Rgba::rgb(255, 0, 0)), "#FF0000");
        assert_eq!(Rgba::WHITE.to_string(), "#FFFFFF");
    }

    #[test]
    fn format_translucent_includes_alpha() {
        assert_eq!(format_color(Rgba::TRANSPARENT), "#00000000");
        assert_eq!(format_color(Rgba::new(1, 2, 3, 4)), "#01020304");
    }

    #[test]
    fn parse_format_roundtrip_hex() {
        for s in ["#AB12CD", "#AB12CD7F"] {
            assert_eq!(format_color(parse_color(s).unwrap()), s);
        }
    }

    #[test]
    fn serializes_as_hex_string() {
        #[derive(Serialize)]
        struct Wrap {
            color: Rgba,
        }
        let out = toml::to_string(&Wrap {
            color: Rgba::rgb(0, 128, 255),
        })
        .unwrap();
        assert_eq!(out.trim(), "color = \"#0080FF\"");
    }
}
