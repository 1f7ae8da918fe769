//! Drawable primitives
//!
//! A closed set of shape variants dispatched by tag. Each paints itself in
//! local coordinates, centered on its own origin; the renderer has already
//! installed the node's world transform on the surface.

use std::rc::Rc;

use glam::Vec2;

use crate::mosaic::MosaicBlock;
use crate::render::Surface;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// CSS color string for the canvas backend
    pub fn css(self) -> String {
        format!("rgb({},{},{})", self.0, self.1, self.2)
    }
}

/// Axis-aligned rectangle of `width` x `height` centered on the origin
#[derive(Debug, Clone)]
pub struct RectShape {
    pub width: f32,
    pub height: f32,
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub stroke_width: f32,
}

impl RectShape {
    pub fn filled(width: f32, height: f32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            fill: Some(fill),
            stroke: None,
            stroke_width: 0.0,
        }
    }

    pub fn bordered(mut self, stroke: Rgb, stroke_width: f32) -> Self {
        self.stroke = Some(stroke);
        self.stroke_width = stroke_width;
        self
    }
}

/// Circle centered on the origin
#[derive(Debug, Clone)]
pub struct CircleShape {
    pub radius: f32,
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub stroke_width: f32,
}

impl CircleShape {
    pub fn filled(radius: f32, fill: Rgb) -> Self {
        Self {
            radius,
            fill: Some(fill),
            stroke: None,
            stroke_width: 0.0,
        }
    }

    pub fn bordered(mut self, stroke: Rgb, stroke_width: f32) -> Self {
        self.stroke = Some(stroke);
        self.stroke_width = stroke_width;
        self
    }
}

/// Single line of text, anchored at the origin
#[derive(Debug, Clone)]
pub struct TextLabel {
    pub text: String,
    pub size_px: f32,
    pub color: Rgb,
}

impl TextLabel {
    pub fn new(text: impl Into<String>, size_px: f32, color: Rgb) -> Self {
        Self {
            text: text.into(),
            size_px,
            color,
        }
    }
}

/// Precomputed mosaic block set, painted as a batch. The block list is
/// shared out of the mosaic cache and never recomputed after construction.
#[derive(Debug, Clone)]
pub struct MosaicSprite {
    pub blocks: Rc<Vec<MosaicBlock>>,
}

/// Closed set of paintable node variants
#[derive(Debug, Clone)]
pub enum Drawable {
    Rect(RectShape),
    Circle(CircleShape),
    Text(TextLabel),
    Mosaic(MosaicSprite),
}

impl Drawable {
    pub fn paint(&self, surface: &mut dyn Surface) {
        match self {
            Drawable::Rect(rect) => {
                let size = Vec2::new(rect.width, rect.height);
                if let Some(fill) = rect.fill {
                    surface.fill_rect(Vec2::ZERO, size, fill);
                }
                if let Some(stroke) = rect.stroke {
                    if rect.stroke_width > 0.0 {
                        surface.stroke_rect(Vec2::ZERO, size, stroke, rect.stroke_width);
                    }
                }
            }
            Drawable::Circle(circle) => {
                if let Some(fill) = circle.fill {
                    surface.fill_circle(Vec2::ZERO, circle.radius, fill);
                }
                if let Some(stroke) = circle.stroke {
                    if circle.stroke_width > 0.0 {
                        surface.stroke_circle(Vec2::ZERO, circle.radius, stroke, circle.stroke_width);
                    }
                }
            }
            Drawable::Text(label) => {
                surface.fill_text(&label.text, Vec2::ZERO, label.size_px, label.color);
            }
            Drawable::Mosaic(sprite) => {
                for block in sprite.blocks.iter() {
                    surface.fill_rect(block.offset, block.size, block.color);
                }
            }
        }
    }
}
