use foundation::color::Color;
use serde::{Deserialize, Serialize};

/// Polygon fills are drawn at this fraction of the layer opacity.
pub const FILL_OPACITY_FACTOR: f32 = 0.4;

/// Strokes stay opaque so borders survive low fill opacity.
pub const STROKE_OPACITY: f32 = 1.0;

pub const LAYER_PALETTE: [Color; 20] = [
    Color::rgb(0x3B, 0x82, 0xF6),
    Color::rgb(0x10, 0xB9, 0x81),
    Color::rgb(0x8B, 0x5C, 0xF6),
    Color::rgb(0xF5, 0x9E, 0x0B),
    Color::rgb(0xEF, 0x44, 0x44),
    Color::rgb(0x06, 0xB6, 0xD4),
    Color::rgb(0x84, 0xCC, 0x16),
    Color::rgb(0xF9, 0x73, 0x16),
    Color::rgb(0xEC, 0x48, 0x99),
    Color::rgb(0x63, 0x66, 0xF1),
    Color::rgb(0x14, 0xB8, 0xA6),
    Color::rgb(0xA8, 0x55, 0xF7),
    Color::rgb(0x22, 0xC5, 0x5E),
    Color::rgb(0xF4, 0x3F, 0x5E),
    Color::rgb(0x0E, 0xA5, 0xE9),
    Color::rgb(0x8B, 0x5A, 0x2B),
    Color::rgb(0x6B, 0x72, 0x80),
    Color::rgb(0xDC, 0x26, 0x26),
    Color::rgb(0x05, 0x96, 0x69),
    Color::rgb(0x7C, 0x3A, 0xED),
];

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub visible: bool,
    pub color: Color,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f32,
}

impl LayerStyle {
    pub const fn new(visible: bool, color: Color, opacity: f32) -> Self {
        Self {
            visible,
            color,
            opacity,
        }
    }

    pub fn with_color(color: Color) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn fill_opacity(&self) -> f32 {
        fill_opacity(self.opacity)
    }

    pub fn stroke_opacity(&self) -> f32 {
        STROKE_OPACITY
    }

    pub fn marker_rgba(&self) -> [f32; 4] {
        self.color.to_rgba(self.opacity)
    }

    pub fn fill_rgba(&self) -> [f32; 4] {
        self.color.to_rgba(self.fill_opacity())
    }

    pub fn stroke_rgba(&self) -> [f32; 4] {
        self.color.to_rgba(self.stroke_opacity())
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            visible: true,
            color: LAYER_PALETTE[0],
            opacity: 1.0,
        }
    }
}

pub fn fill_opacity(opacity: f32) -> f32 {
    opacity.clamp(0.0, 1.0) * FILL_OPACITY_FACTOR
}

/// First palette color nobody uses; once all are taken, cycles on
/// `existing_layers`.
pub fn next_palette_color<'a, I>(in_use: I, existing_layers: usize) -> Color
where
    I: IntoIterator<Item = &'a Color>,
{
    let used: Vec<Color> = in_use.into_iter().copied().collect();
    LAYER_PALETTE
        .iter()
        .copied()
        .find(|c| !used.contains(c))
        .unwrap_or(LAYER_PALETTE[existing_layers % LAYER_PALETTE.len()])
}
