//! Graph View Style System
//!
//! Resolves the named palette tokens of the active theme and derives the
//! baseline node and edge styles embedded into every visual element.

use flowlens_core::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// RGBA color, serialized as a `#rrggbbaa` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized color value: {0:?}")]
pub struct ColorParseError(pub String);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` or `rgba(r, g, b, a)`
    /// where `a` is a 0..=1 float.
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError(value.to_string());
        let trimmed = value.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(err());
            }
            let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| err());
            return match hex.len() {
                3 => {
                    let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                    Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
                }
                6 => Ok(Self::rgb(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                )),
                8 => Ok(Self::rgba(
                    channel(&hex[0..2])?,
                    channel(&hex[2..4])?,
                    channel(&hex[4..6])?,
                    channel(&hex[6..8])?,
                )),
                _ => Err(err()),
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        let (body, with_alpha) = if let Some(body) = lower.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = lower.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err(err());
        };
        let body = body.strip_suffix(')').ok_or_else(err)?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if with_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(err());
        }

        let channel = |s: &str| s.parse::<u8>().map_err(|_| err());
        let alpha = if with_alpha {
            let a: f32 = parts[3].parse().map_err(|_| err())?;
            if !(0.0..=1.0).contains(&a) {
                return Err(err());
            }
            (a * 255.0).round() as u8
        } else {
            255
        };

        Ok(Self::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            alpha,
        ))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse(&value)
    }
}

// ============================================================================
// Palette
// ============================================================================

pub const DEFAULT_BORDER: Color = Color::rgb(0x1F, 0x29, 0x37);
pub const DEFAULT_TEXT: Color = Color::rgb(0xE6, 0xED, 0xF3);
pub const DEFAULT_EDGE: Color = Color::rgb(0x1F, 0x29, 0x37);
pub const DEFAULT_ACCENT: Color = Color::rgb(0x3B, 0x82, 0xF6);
pub const DEFAULT_ACCENT_ALT: Color = Color::rgb(0x06, 0xB6, 0xD4);
pub const DEFAULT_NODE_BACKGROUND: Color = Color::rgb(0x16, 0x1F, 0x2B);
pub const DEFAULT_BACKGROUND_DOT: Color = Color::rgb(0x1F, 0x29, 0x37);
pub const DEFAULT_MINIMAP_BACKGROUND: Color = Color::rgb(0x0B, 0x12, 0x20);
pub const DEFAULT_MINIMAP_MASK: Color = Color::rgba(0x0B, 0x12, 0x20, 153);

/// The fixed vocabulary of theme tokens the graph view consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteToken {
    Border,
    Text,
    Edge,
    Accent,
    AccentAlt,
    NodeBackground,
    BackgroundDot,
    MinimapBackground,
    MinimapMask,
}

impl PaletteToken {
    pub const ALL: [PaletteToken; 9] = [
        PaletteToken::Border,
        PaletteToken::Text,
        PaletteToken::Edge,
        PaletteToken::Accent,
        PaletteToken::AccentAlt,
        PaletteToken::NodeBackground,
        PaletteToken::BackgroundDot,
        PaletteToken::MinimapBackground,
        PaletteToken::MinimapMask,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PaletteToken::Border => "border",
            PaletteToken::Text => "text",
            PaletteToken::Edge => "edge",
            PaletteToken::Accent => "accent",
            PaletteToken::AccentAlt => "accent-alt",
            PaletteToken::NodeBackground => "node-background",
            PaletteToken::BackgroundDot => "background-dot",
            PaletteToken::MinimapBackground => "minimap-background",
            PaletteToken::MinimapMask => "minimap-mask",
        }
    }

    pub fn fallback(&self) -> Color {
        match self {
            PaletteToken::Border => DEFAULT_BORDER,
            PaletteToken::Text => DEFAULT_TEXT,
            PaletteToken::Edge => DEFAULT_EDGE,
            PaletteToken::Accent => DEFAULT_ACCENT,
            PaletteToken::AccentAlt => DEFAULT_ACCENT_ALT,
            PaletteToken::NodeBackground => DEFAULT_NODE_BACKGROUND,
            PaletteToken::BackgroundDot => DEFAULT_BACKGROUND_DOT,
            PaletteToken::MinimapBackground => DEFAULT_MINIMAP_BACKGROUND,
            PaletteToken::MinimapMask => DEFAULT_MINIMAP_MASK,
        }
    }
}

/// Source of raw token values, typically the host's active theme variables.
pub trait ThemeSource {
    fn token(&self, name: &str) -> Option<String>;
}

impl ThemeSource for HashMap<String, String> {
    fn token(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A host that exposes no theme at all.
pub struct NoTheme;

impl ThemeSource for NoTheme {
    fn token(&self, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub border: Color,
    pub text: Color,
    pub edge: Color,
    pub accent: Color,
    pub accent_alt: Color,
    pub node_background: Color,
    pub background_dot: Color,
    pub minimap_background: Color,
    pub minimap_mask: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self::resolve(&NoTheme)
    }
}

impl Palette {
    /// Resolve every token from `source`, falling back per token to the
    /// built-in default when it is missing or unparsable.
    pub fn resolve(source: &dyn ThemeSource) -> Self {
        let pick = |token: PaletteToken| -> Color {
            match source.token(token.name()) {
                Some(raw) => Color::parse(&raw).unwrap_or_else(|e| {
                    tracing::warn!("Theme token '{}' ignored: {}", token.name(), e);
                    token.fallback()
                }),
                None => token.fallback(),
            }
        };

        Self {
            border: pick(PaletteToken::Border),
            text: pick(PaletteToken::Text),
            edge: pick(PaletteToken::Edge),
            accent: pick(PaletteToken::Accent),
            accent_alt: pick(PaletteToken::AccentAlt),
            node_background: pick(PaletteToken::NodeBackground),
            background_dot: pick(PaletteToken::BackgroundDot),
            minimap_background: pick(PaletteToken::MinimapBackground),
            minimap_mask: pick(PaletteToken::MinimapMask),
        }
    }

    pub fn get(&self, token: PaletteToken) -> Color {
        match token {
            PaletteToken::Border => self.border,
            PaletteToken::Text => self.text,
            PaletteToken::Edge => self.edge,
            PaletteToken::Accent => self.accent,
            PaletteToken::AccentAlt => self.accent_alt,
            PaletteToken::NodeBackground => self.node_background,
            PaletteToken::BackgroundDot => self.background_dot,
            PaletteToken::MinimapBackground => self.minimap_background,
            PaletteToken::MinimapMask => self.minimap_mask,
        }
    }
}

// ============================================================================
// Node and edge styles
// ============================================================================

// Kind markers
pub const COLOR_FUNCTION_MARKER: Color = Color::rgb(200, 160, 80);
pub const COLOR_FILE_MARKER: Color = Color::rgb(80, 140, 100);
pub const COLOR_MODULE_MARKER: Color = Color::rgb(130, 100, 160);
pub const COLOR_CLASS_MARKER: Color = Color::rgb(85, 85, 85);
pub const COLOR_VARIABLE_MARKER: Color = Color::rgb(80, 130, 180);
pub const COLOR_OTHER_MARKER: Color = Color::rgb(100, 100, 100);

/// Opacity applied to nodes outside the hovered neighbourhood.
pub const DIMMED_NODE_OPACITY: f32 = 0.5;
/// Opacity applied to edges not touching the hovered node.
pub const DIMMED_EDGE_OPACITY: f32 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub background: Color,
    pub border: Color,
    pub text: Color,
    /// Small stripe identifying the node kind.
    pub marker: Color,
    pub border_width: f32,
    pub border_dashed: bool,
    pub corner_radius: f32,
    pub padding: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub dashed: bool,
    pub arrow_head: bool,
    pub animated: bool,
    pub opacity: f32,
}

pub fn get_kind_marker(kind: NodeKind) -> Color {
    match kind {
        NodeKind::FUNCTION => COLOR_FUNCTION_MARKER,
        NodeKind::FILE => COLOR_FILE_MARKER,
        NodeKind::MODULE => COLOR_MODULE_MARKER,
        NodeKind::CLASS => COLOR_CLASS_MARKER,
        NodeKind::VARIABLE => COLOR_VARIABLE_MARKER,
        NodeKind::OTHER => COLOR_OTHER_MARKER,
    }
}

/// Baseline style for a node before any hover or collapse overlay.
pub fn get_node_style(kind: NodeKind, palette: &Palette) -> NodeStyle {
    NodeStyle {
        background: palette.node_background,
        border: palette.border,
        text: palette.text,
        marker: get_kind_marker(kind),
        border_width: 1.0,
        border_dashed: false,
        corner_radius: 10.0,
        padding: 8.0,
        opacity: 1.0,
    }
}

/// Baseline style for an edge before any hover overlay.
pub fn get_edge_style(palette: &Palette) -> EdgeStyle {
    EdgeStyle {
        color: palette.edge,
        width: 1.0,
        dashed: false,
        arrow_head: true,
        animated: false,
        opacity: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_color_parse_hex_forms() {
        assert_eq!(Color::parse("#3B82F6").unwrap(), DEFAULT_ACCENT);
        assert_eq!(Color::parse("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert_eq!(
            Color::parse("#0B122099").unwrap(),
            Color::rgba(0x0B, 0x12, 0x20, 0x99)
        );
    }

    #[test]
    fn test_color_parse_functional_forms() {
        assert_eq!(
            Color::parse("rgb(6, 182, 212)").unwrap(),
            DEFAULT_ACCENT_ALT
        );
        assert_eq!(
            Color::parse("rgba(11,18,32,0.6)").unwrap(),
            DEFAULT_MINIMAP_MASK
        );
    }

    #[test]
    fn test_color_parse_rejects_garbage() {
        assert!(Color::parse("blue-ish").is_err());
        assert!(Color::parse("#12345").is_err());
        assert!(Color::parse("rgb(300, 0, 0)").is_err());
        assert!(Color::parse("rgba(0, 0, 0, 2)").is_err());
        assert!(Color::parse("#ééé").is_err());

        let err = Color::parse("blue-ish").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized color value: \"blue-ish\"");
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_color_serializes_as_hex() {
        let json = serde_json::to_string(&DEFAULT_ACCENT).unwrap();
        assert_eq!(json, "\"#3B82F6\"");
        let back: Color = serde_json::from_str("\"#0B122099\"").unwrap();
        assert_eq!(back.a, 0x99);
    }

    #[test]
    fn test_palette_defaults_without_theme() {
        let palette = Palette::resolve(&NoTheme);
        for token in PaletteToken::ALL {
            assert_eq!(palette.get(token), token.fallback());
        }
        assert_eq!(palette, Palette::default());
    }

    #[test]
    fn test_palette_uses_theme_tokens() {
        let source = theme(&[("accent", "#FF0000"), ("text", "rgb(1, 2, 3)")]);
        let palette = Palette::resolve(&source);
        assert_eq!(palette.accent, Color::rgb(255, 0, 0));
        assert_eq!(palette.text, Color::rgb(1, 2, 3));
        assert_eq!(palette.border, DEFAULT_BORDER);
    }

    #[test]
    fn test_palette_falls_back_per_token_on_invalid_value() {
        let source = theme(&[("accent", "not-a-color"), ("edge", "#010203")]);
        let palette = Palette::resolve(&source);
        assert_eq!(palette.accent, DEFAULT_ACCENT);
        assert_eq!(palette.edge, Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_node_style_embeds_palette() {
        let source = theme(&[("node-background", "#000000")]);
        let palette = Palette::resolve(&source);
        let style = get_node_style(NodeKind::FUNCTION, &palette);
        assert_eq!(style.background, Color::rgb(0, 0, 0));
        assert_eq!(style.marker, COLOR_FUNCTION_MARKER);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn test_edge_style_defaults() {
        let style = get_edge_style(&Palette::default());
        assert_eq!(style.color, DEFAULT_EDGE);
        assert!(!style.animated);
        assert!(style.arrow_head);
    }
}
