//! Buckshot Duel - a turn-based shotgun duel in the browser
//!
//! Core modules:
//! - `scene`: retained-mode 2D node tree and drawable primitives
//! - `render`: per-frame flatten/sort/paint over a `Surface`
//! - `anim`: async tween/shake/knockback/rotation sequencer
//! - `mosaic`: BMP decode and bitmap-to-rectangle mosaic transform
//! - `game`: deterministic round/combat rules (no platform deps)
//! - `session`: the single async sequence driving a full game

pub mod anim;
pub mod assets;
pub mod game;
pub mod mosaic;
pub mod particles;
pub mod render;
pub mod scene;
pub mod session;
pub mod settings;
pub mod stage;
pub mod tray;

pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed logical canvas resolution
    pub const CANVAS_W: f32 = 1280.0;
    pub const CANVAS_H: f32 = 720.0;

    /// Cartridge tray slots
    pub const CARTRIDGE_CAPACITY: usize = 6;
    /// Starting (and maximum) hit points per party
    pub const HP_MAX: u8 = 10;
    /// Damage stack cap from consecutive self-shot blanks
    pub const DAMAGE_STACK_MAX: u8 = 10;

    /// Radius of the avatar hit circle used to classify clicks
    pub const AVATAR_HIT_RADIUS: f32 = 90.0;

    /// Paint-order keys: lower depth paints later (appears in front)
    pub const DEPTH_BG: i32 = 100;
    pub const DEPTH_TABLE: i32 = 90;
    pub const DEPTH_SHELL: i32 = 70;
    pub const DEPTH_ACTORS: i32 = 60;
    pub const DEPTH_GUN: i32 = 40;
    pub const DEPTH_HANDS: i32 = 30;
    pub const DEPTH_UI: i32 = 20;
    pub const DEPTH_BANNER: i32 = 15;
    pub const DEPTH_EFFECTS: i32 = 10;
    pub const DEPTH_FLASH: i32 = 5;
}

/// Normalize an angle in degrees to (-180, 180]
#[inline]
pub fn normalize_deg(mut angle: f32) -> f32 {
    angle %= 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    }
    if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Point-in-circle test (squared distance, no sqrt)
#[inline]
pub fn inside_circle(point: Vec2, center: Vec2, radius: f32) -> bool {
    point.distance_squared(center) <= radius * radius
}

/// Convert a device pixel coordinate (top-left origin, y-down) to node
/// space (canvas-center origin, y-up).
#[inline]
pub fn device_to_world(x: f32, y: f32) -> Vec2 {
    Vec2::new(x - consts::CANVAS_W / 2.0, -(y - consts::CANVAS_H / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_deg_wraps() {
        assert_eq!(normalize_deg(0.0), 0.0);
        assert_eq!(normalize_deg(180.0), 180.0);
        assert_eq!(normalize_deg(-180.0), 180.0);
        assert_eq!(normalize_deg(270.0), -90.0);
        assert_eq!(normalize_deg(-270.0), 90.0);
        assert_eq!(normalize_deg(720.0), 0.0);
    }

    #[test]
    fn test_device_to_world_center() {
        let w = device_to_world(640.0, 360.0);
        assert_eq!(w, Vec2::ZERO);
        // top-left of the canvas maps to (-W/2, +H/2)
        let tl = device_to_world(0.0, 0.0);
        assert_eq!(tl, Vec2::new(-640.0, 360.0));
    }

    proptest! {
        #[test]
        fn prop_normalize_deg_in_range(angle in -3600.0f32..3600.0) {
            let n = normalize_deg(angle);
            prop_assert!(n > -180.0 - 1e-3);
            prop_assert!(n <= 180.0 + 1e-3);
        }

        #[test]
        fn prop_lerp_endpoints(a in -1e4f32..1e4, b in -1e4f32..1e4) {
            prop_assert_eq!(lerp(a, b, 0.0), a);
            prop_assert_eq!(lerp(a, b, 1.0), b);
        }
    }
}
