#![forbid(unsafe_code)]

//! Layered background gradients and their interpolation.
//!
//! The scene background is five radial gradients over one diagonal linear
//! base. Each radial layer fades from an opaque hex colour at its centre to a
//! translucent `rgba()` colour at its edge. Two fixed palettes exist:
//! [`Palette::ORIGINAL`] and [`Palette::PROJECTS`]. Each layer blends between
//! them with its own progress value, normally fed by a
//! [`StaggerCascade`](crate::animation::StaggerCascade).
//!
//! # Invariants
//!
//! 1. Hex channels are interpolated then rounded to the nearest integer and
//!    clamped to `[0, 255]`.
//! 2. `rgba()` channels R, G and B are rounded the same way, but alpha is kept
//!    as a float rounded to two decimals. The asymmetry is part of the
//!    rendered output.
//! 3. Layer order, anchors and radii are fixed; [`build_background`] always
//!    emits the radial layers in index order followed by the base layer.
//! 4. `interpolate(&[0.0; 5])` renders exactly as [`Palette::ORIGINAL`] and
//!    `interpolate(&[1.0; 5])` exactly as [`Palette::PROJECTS`].
//!
//! # Failure Modes
//!
//! - Malformed colour strings return [`ColorParseError`]; nothing in the
//!   interpolation path parses at runtime.

use std::fmt;
use std::str::FromStr;

use crate::animation::LAYERS;

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

/// An opaque colour written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A colour with a fractional alpha, written as `rgba(r, g, b, a)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {:.2})", self.r, self.g, self.b, self.a)
    }
}

/// Why a colour string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Not `#` followed by six hex digits.
    InvalidHex(String),
    /// Not `rgba(r, g, b, a)` with byte channels and alpha in `[0, 1]`.
    InvalidRgba(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex(s) => write!(f, "invalid hex colour: {s:?}"),
            Self::InvalidRgba(s) => write!(f, "invalid rgba colour: {s:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError::InvalidHex(s.to_string());
        let digits = s.trim().strip_prefix('#').ok_or_else(err)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| err());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError::InvalidRgba(s.to_string());
        let body = s
            .trim()
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let [r, g, b, a] = parts[..] else {
            return Err(err());
        };
        let byte = |v: &str| v.parse::<u8>().map_err(|_| err());
        let alpha: f64 = a.parse().map_err(|_| err())?;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(err());
        }
        Ok(Self::new(byte(r)?, byte(g)?, byte(b)?, alpha))
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

#[inline]
fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
    v.round().clamp(0.0, 255.0) as u8
}

/// Blend two hex colours. Channels are rounded and clamped.
#[must_use]
pub fn lerp_color(a: Rgb, b: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp_channel(a.r, b.r, t),
        lerp_channel(a.g, b.g, t),
        lerp_channel(a.b, b.b, t),
    )
}

/// Blend two `rgba()` colours. RGB is rounded; alpha keeps two decimals.
#[must_use]
pub fn lerp_rgba(a: Rgba, b: Rgba, t: f64) -> Rgba {
    let alpha = a.a + (b.a - a.a) * t;
    Rgba::new(
        lerp_channel(a.r, b.r, t),
        lerp_channel(a.g, b.g, t),
        lerp_channel(a.b, b.b, t),
        (alpha * 100.0).round() / 100.0,
    )
}

// ---------------------------------------------------------------------------
// Palettes
// ---------------------------------------------------------------------------

/// Centre and edge colour of one radial layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPair {
    pub start: Rgb,
    pub end: Rgba,
}

impl ColorPair {
    #[must_use]
    pub const fn new(start: Rgb, end: Rgba) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            start: lerp_color(self.start, other.start, t),
            end: lerp_rgba(self.end, other.end, t),
        }
    }
}

/// One colour pair per radial layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub layers: [ColorPair; LAYERS],
}

impl Palette {
    /// Warm landing palette.
    pub const ORIGINAL: Self = Self {
        layers: [
            ColorPair::new(Rgb::new(0xff, 0x9a, 0x8b), Rgba::new(255, 154, 139, 0.0)),
            ColorPair::new(Rgb::new(0xa1, 0x8c, 0xd1), Rgba::new(161, 140, 209, 0.0)),
            ColorPair::new(Rgb::new(0xfb, 0xc2, 0xeb), Rgba::new(251, 194, 235, 0.0)),
            ColorPair::new(Rgb::new(0x8f, 0xd3, 0xf4), Rgba::new(143, 211, 244, 0.0)),
            ColorPair::new(Rgb::new(0x84, 0xfa, 0xb0), Rgba::new(132, 250, 176, 0.0)),
        ],
    };

    /// Deep palette behind the projects carousel.
    pub const PROJECTS: Self = Self {
        layers: [
            ColorPair::new(Rgb::new(0x0f, 0x20, 0x27), Rgba::new(15, 32, 39, 0.35)),
            ColorPair::new(Rgb::new(0x20, 0x3a, 0x43), Rgba::new(32, 58, 67, 0.35)),
            ColorPair::new(Rgb::new(0x2c, 0x53, 0x64), Rgba::new(44, 83, 100, 0.3)),
            ColorPair::new(Rgb::new(0x1a, 0x29, 0x80), Rgba::new(26, 41, 128, 0.3)),
            ColorPair::new(Rgb::new(0x26, 0xd0, 0xce), Rgba::new(38, 208, 206, 0.25)),
        ],
    };

    /// Blend layer by layer, each with its own progress.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: &[f64; LAYERS]) -> Self {
        Self {
            layers: std::array::from_fn(|i| self.layers[i].lerp(other.layers[i], t[i])),
        }
    }
}

/// Screen-space placement of a radial layer, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: u8,
    pub y: u8,
    pub radius: u8,
}

/// Fixed anchors, layer 0 first.
pub const ANCHORS: [Anchor; LAYERS] = [
    Anchor { x: 20, y: 30, radius: 50 },
    Anchor { x: 80, y: 20, radius: 45 },
    Anchor { x: 50, y: 80, radius: 55 },
    Anchor { x: 15, y: 85, radius: 40 },
    Anchor { x: 85, y: 75, radius: 50 },
];

/// The base layer under every radial gradient.
pub const BASE_LAYER: &str = "linear-gradient(135deg, #f5f7fa 0%, #c3cfe2 100%)";

/// Blend [`Palette::ORIGINAL`] toward [`Palette::PROJECTS`].
#[must_use]
pub fn interpolate(t: &[f64; LAYERS]) -> Palette {
    Palette::ORIGINAL.lerp(&Palette::PROJECTS, t)
}

/// Render a palette as a CSS `background` value.
#[must_use]
pub fn build_background(palette: &Palette) -> String {
    let mut layers: Vec<String> = palette
        .layers
        .iter()
        .zip(ANCHORS.iter())
        .map(|(pair, anchor)| {
            format!(
                "radial-gradient(circle at {}% {}%, {} 0%, {} {}%)",
                anchor.x, anchor.y, pair.start, pair.end, anchor.radius
            )
        })
        .collect();
    layers.push(BASE_LAYER.to_string());
    layers.join(", ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
