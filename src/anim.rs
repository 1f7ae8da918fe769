//! Async tween/animation sequencer
//!
//! Animation primitives are cooperative async steps: each writes node
//! properties, then suspends for `duration / steps` of wall-clock time. On
//! wasm the suspension is a real setTimeout await; on native it resolves
//! immediately, so the same futures run to completion under `pollster` in
//! tests.
//!
//! All durations are scaled by a single global speed multiplier, clamped
//! above [`MIN_SPEED`] so fast-forwarding can never divide by zero.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use rand::Rng;

use crate::lerp;
use crate::normalize_deg;
use crate::scene::{NodeId, Scene};

/// Lower clamp for the global speed multiplier
pub const MIN_SPEED: f32 = 0.05;
/// Default step count for positional tweens
pub const TWEEN_STEPS: u32 = 18;

/// Easing curves used by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    OutQuad,
    #[default]
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Cardinal directions for knockback and particle bursts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, 1.0),
            Direction::Down => Vec2::new(0.0, -1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// Optional per-property tween targets
#[derive(Debug, Clone, Copy, Default)]
pub struct TweenTarget {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub rotation: Option<f32>,
    pub scale: Option<f32>,
}

impl TweenTarget {
    pub fn position(pos: Vec2) -> Self {
        Self {
            x: Some(pos.x),
            y: Some(pos.y),
            ..Self::default()
        }
    }
}

/// Shortest signed rotation delta from `from` to `to`, both in degrees
pub fn shortest_delta_deg(from: f32, to: f32) -> f32 {
    normalize_deg(normalize_deg(to) - normalize_deg(from))
}

/// Number of equal steps to cover `delta` degrees at `step_deg` per step
pub fn rotation_steps(delta: f32, step_deg: f32) -> u32 {
    ((delta.abs() / step_deg.max(1e-6)).ceil() as u32).max(1)
}

/// Suspend for roughly `ms` milliseconds of wall-clock time
#[cfg(target_arch = "wasm32")]
pub async fn sleep_ms(ms: f64) {
    use wasm_bindgen::JsCast;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let window = web_sys::window().expect("no window");
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            resolve.unchecked_ref(),
            ms.max(0.0) as i32,
        );
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

/// Native builds have no frame clock; animations collapse to their final
/// values instantly, which is exactly what the tests want.
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep_ms(_ms: f64) {}

/// Drives property animations over a shared scene. One advisory `busy` flag
/// at the session level serializes gameplay animations; the animator itself
/// does not lock anything.
pub struct Animator {
    scene: Rc<RefCell<Scene>>,
    speed: Cell<f32>,
}

impl Animator {
    pub fn new(scene: Rc<RefCell<Scene>>) -> Self {
        Self {
            scene,
            speed: Cell::new(1.0),
        }
    }

    pub fn scene(&self) -> &Rc<RefCell<Scene>> {
        &self.scene
    }

    /// Global speed multiplier; > 1 fast-forwards every animation
    pub fn set_speed(&self, multiplier: f32) {
        self.speed.set(multiplier.max(MIN_SPEED));
    }

    pub fn speed(&self) -> f32 {
        self.speed.get()
    }

    /// One suspension point, scaled by the speed multiplier
    pub async fn pause_ms(&self, ms: f32) {
        sleep_ms((ms / self.speed.get()) as f64).await;
    }

    /// Interpolate the requested properties from their current values to the
    /// targets. Resolves immediately (with exact target values) when
    /// `duration_ms` is zero.
    pub async fn tween(&self, id: NodeId, target: TweenTarget, duration_ms: f32, easing: Easing) {
        self.tween_steps(id, target, duration_ms, TWEEN_STEPS, easing)
            .await;
    }

    pub async fn tween_steps(
        &self,
        id: NodeId,
        target: TweenTarget,
        duration_ms: f32,
        steps: u32,
        easing: Easing,
    ) {
        let start = {
            let scene = self.scene.borrow();
            let Some(node) = scene.get(id) else { return };
            (node.x, node.y, node.rotation, node.scale)
        };
        let write = |scene: &mut Scene, e: f32| {
            if let Some(node) = scene.get_mut(id) {
                if let Some(x) = target.x {
                    node.x = lerp(start.0, x, e);
                }
                if let Some(y) = target.y {
                    node.y = lerp(start.1, y, e);
                }
                if let Some(rotation) = target.rotation {
                    node.rotation = normalize_deg(lerp(start.2, rotation, e));
                }
                if let Some(scale) = target.scale {
                    node.scale = lerp(start.3, scale, e);
                }
            }
        };

        if duration_ms <= 0.0 || steps == 0 {
            write(&mut self.scene.borrow_mut(), 1.0);
            return;
        }
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            write(&mut self.scene.borrow_mut(), easing.apply(t));
            self.pause_ms(duration_ms / steps as f32).await;
        }
    }

    /// Move a node to a position in its parent's space
    pub async fn move_to(&self, id: NodeId, to: Vec2, duration_ms: f32, steps: u32, easing: Easing) {
        self.tween_steps(id, TweenTarget::position(to), duration_ms, steps, easing)
            .await;
    }

    /// Random jitter within +-magnitude on both axes, restoring the exact
    /// original position afterwards.
    pub async fn shake(&self, id: NodeId, magnitude: f32, duration_ms: f32, freq_hz: f32) {
        let origin = {
            let scene = self.scene.borrow();
            let Some(node) = scene.get(id) else { return };
            node.position()
        };
        let steps = ((duration_ms / 1000.0 * freq_hz).floor() as u32).max(1);
        let mut rng = rand::rng();
        for _ in 0..steps {
            let dx = rng.random_range(-magnitude..=magnitude);
            let dy = rng.random_range(-magnitude..=magnitude);
            if let Some(node) = self.scene.borrow_mut().get_mut(id) {
                node.move_to(origin.x + dx, origin.y + dy);
            }
            self.pause_ms(duration_ms / steps as f32).await;
        }
        if let Some(node) = self.scene.borrow_mut().get_mut(id) {
            node.move_to(origin.x, origin.y);
        }
    }

    /// Ease out to `distance` along a cardinal direction, return linearly,
    /// and land back on the exact original position.
    pub async fn knockback(
        &self,
        id: NodeId,
        direction: Direction,
        distance: f32,
        duration_ms: f32,
        steps: u32,
    ) {
        let origin = {
            let scene = self.scene.borrow();
            let Some(node) = scene.get(id) else { return };
            node.position()
        };
        let offset = direction.unit() * distance;
        let steps = steps.max(1);
        for i in 1..=steps {
            let t = Easing::OutQuad.apply(i as f32 / steps as f32);
            if let Some(node) = self.scene.borrow_mut().get_mut(id) {
                node.move_to(origin.x + offset.x * t, origin.y + offset.y * t);
            }
            self.pause_ms(duration_ms / steps as f32).await;
        }
        for i in 1..=steps {
            let t = 1.0 - i as f32 / steps as f32;
            if let Some(node) = self.scene.borrow_mut().get_mut(id) {
                node.move_to(origin.x + offset.x * t, origin.y + offset.y * t);
            }
            self.pause_ms(duration_ms / steps as f32).await;
        }
        if let Some(node) = self.scene.borrow_mut().get_mut(id) {
            node.move_to(origin.x, origin.y);
        }
    }

    /// Rotate along the shortest arc to `target_deg` in increments of at most
    /// `step_deg`, correcting any residual so the final angle is exact. A
    /// degenerate zero delta returns immediately.
    pub async fn rotate_to(&self, id: NodeId, target_deg: f32, duration_ms: f32, step_deg: f32) {
        let current = {
            let scene = self.scene.borrow();
            let Some(node) = scene.get(id) else { return };
            node.rotation
        };
        let target = normalize_deg(target_deg);
        let delta = shortest_delta_deg(current, target);
        if delta.abs() < 1e-6 {
            return;
        }
        let steps = rotation_steps(delta, step_deg);
        let per_step = delta / steps as f32;
        for _ in 0..steps {
            if let Some(node) = self.scene.borrow_mut().get_mut(id) {
                node.rotate_by(per_step);
            }
            self.pause_ms(duration_ms / steps as f32).await;
        }
        let mut scene = self.scene.borrow_mut();
        if let Some(node) = scene.get_mut(id) {
            let residual = shortest_delta_deg(node.rotation, target);
            if residual.abs() > 1e-3 {
                node.rotate_by(residual);
            }
            node.rotation = normalize_deg(target);
        }
    }
}
