//! Decorative particle bursts
//!
//! Purely visual: bursts spawn small rectangles, integrate simple
//! drag/gravity motion and despawn themselves. They are exempt from the
//! session's busy flag and never touch gameplay state.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use rand::Rng;

use crate::anim::{Direction, sleep_ms};
use crate::scene::{Drawable, NodeConfig, NodeId, RectShape, Rgb, Scene};

/// Velocity magnitude below which a particle counts as settled
const SETTLE_SPEED: f32 = 10.0;

/// Burst parameters
#[derive(Debug, Clone)]
pub struct BurstConfig {
    pub color: Rgb,
    /// Inclusive particle side-length range
    pub size: (f32, f32),
    pub origin: Vec2,
    /// Base launch speed, units per second
    pub speed: f32,
    /// Per-step velocity retention in [0, 1)
    pub drag: f32,
    pub count: usize,
    /// Relative speed jitter in [0, 1]
    pub randomness: f32,
    pub direction: Direction,
    /// Cone half-angle around the launch direction, degrees
    pub spread_deg: f32,
    /// Downward acceleration, units per second squared
    pub gravity: f32,
    /// Maximum lifetime in seconds
    pub life_s: f32,
    pub depth: i32,
    /// Integration step, seconds
    pub dt: f32,
}

impl BurstConfig {
    /// The white radial pick-confirmation flash used on avatar selection
    pub fn pick_flash(origin: Vec2) -> Self {
        Self {
            color: Rgb(255, 255, 255),
            size: (9.0, 9.0),
            origin,
            speed: 1000.0,
            drag: 0.85,
            count: 15,
            randomness: 0.0,
            direction: Direction::Up,
            spread_deg: 360.0,
            gravity: 0.0,
            life_s: 0.3,
            depth: crate::consts::DEPTH_EFFECTS,
            dt: 0.02,
        }
    }
}

struct ParticleItem {
    node: NodeId,
    pos: Vec2,
    vel: Vec2,
    spin: f32,
}

/// A live burst; create with [`ParticleBurst::spawn`], then drive with
/// [`ParticleBurst::run`].
pub struct ParticleBurst {
    items: Vec<ParticleItem>,
    drag: f32,
    gravity: f32,
    dt: f32,
    life_s: f32,
    elapsed: f32,
}

impl ParticleBurst {
    pub fn spawn<R: Rng>(scene: &mut Scene, config: &BurstConfig, rng: &mut R) -> Self {
        let base_theta = match config.direction {
            Direction::Up => std::f32::consts::FRAC_PI_2,
            Direction::Down => -std::f32::consts::FRAC_PI_2,
            Direction::Left => std::f32::consts::PI,
            Direction::Right => 0.0,
        };
        let root = scene.root();
        let items = (0..config.count)
            .map(|_| {
                let side = if config.size.1 > config.size.0 {
                    rng.random_range(config.size.0..=config.size.1)
                } else {
                    config.size.0
                };
                let node = scene.spawn_child(
                    root,
                    NodeConfig::new()
                        .at(config.origin.x, config.origin.y)
                        .depth(config.depth)
                        .drawable(Drawable::Rect(RectShape::filled(side, side, config.color))),
                );
                let theta = base_theta
                    + config.spread_deg.to_radians() * (rng.random_range(-0.5..=0.5f32)) * 2.0;
                let speed = config.speed * (1.0 + rng.random_range(-0.5..=0.5f32) * config.randomness);
                ParticleItem {
                    node,
                    pos: config.origin,
                    vel: Vec2::new(theta.cos(), theta.sin()) * speed,
                    spin: rng.random_range(-180.0..=180.0f32),
                }
            })
            .collect();
        Self {
            items,
            drag: config.drag.clamp(0.0, 0.9999),
            gravity: config.gravity,
            dt: config.dt,
            life_s: config.life_s,
            elapsed: 0.0,
        }
    }

    /// One integration step; returns false once every particle has settled
    /// or the lifetime expired.
    pub fn step(&mut self, scene: &mut Scene) -> bool {
        let mut any_moving = false;
        for item in &mut self.items {
            item.vel.x *= self.drag;
            item.vel.y = item.vel.y * self.drag - self.gravity * self.dt;
            item.pos += item.vel * self.dt;
            if let Some(node) = scene.get_mut(item.node) {
                node.move_to(item.pos.x, item.pos.y);
                if item.spin.abs() > 1.0 {
                    node.rotate_by(item.spin * self.dt);
                }
            }
            if item.vel.length() > SETTLE_SPEED {
                any_moving = true;
            }
        }
        self.elapsed += self.dt;
        any_moving && self.elapsed < self.life_s
    }

    /// Step to completion, then despawn every particle
    pub async fn run(mut self, scene: Rc<RefCell<Scene>>) {
        loop {
            let moving = self.step(&mut scene.borrow_mut());
            if !moving {
                break;
            }
            sleep_ms((self.dt * 1000.0) as f64).await;
        }
        let mut scene = scene.borrow_mut();
        for item in &self.items {
            scene.despawn(item.node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_burst_spawns_and_cleans_up() {
        let scene = Rc::new(RefCell::new(Scene::new()));
        let mut rng = Pcg32::seed_from_u64(1);
        let burst = ParticleBurst::spawn(
            &mut scene.borrow_mut(),
            &BurstConfig::pick_flash(Vec2::new(10.0, 10.0)),
            &mut rng,
        );
        assert_eq!(scene.borrow().get(scene.borrow().root()).unwrap().children().len(), 15);
        pollster::block_on(burst.run(scene.clone()));
        let s = scene.borrow();
        assert!(s.get(s.root()).unwrap().children().is_empty());
    }

    #[test]
    fn test_lifetime_bounds_stepping() {
        let scene = Rc::new(RefCell::new(Scene::new()));
        let mut rng = Pcg32::seed_from_u64(2);
        let mut config = BurstConfig::pick_flash(Vec2::ZERO);
        config.drag = 0.999; // barely slows: lifetime must end the burst
        let mut burst = ParticleBurst::spawn(&mut scene.borrow_mut(), &config, &mut rng);
        let mut steps = 0;
        while burst.step(&mut scene.borrow_mut()) {
            steps += 1;
            assert!(steps < 1000, "burst never settled");
        }
        assert!(steps as f32 * config.dt <= config.life_s + config.dt);
    }
}
