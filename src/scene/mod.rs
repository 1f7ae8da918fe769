//! Retained-mode 2D scene graph
//!
//! Nodes carry a local transform (position, rotation in degrees, uniform
//! scale), a paint-order depth, a visibility flag and an optional drawable.
//! World transforms are derived on every query by composing the parent chain
//! root-to-leaf; nothing is cached across mutation.

pub mod drawable;
pub mod node;

pub use drawable::{CircleShape, Drawable, MosaicSprite, RectShape, Rgb, TextLabel};
pub use node::{Node, NodeConfig, NodeId, Scene, SceneError};
