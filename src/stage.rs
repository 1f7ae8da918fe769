//! Stage construction
//!
//! Builders that assemble the duel scene: backdrop, table, the two actor
//! rigs, the shotgun rig, HP bars and the damage counter. Everything here
//! only spawns and mutates nodes; sequencing lives in the session.

use glam::Vec2;

use crate::anim::{Animator, Easing, TweenTarget};
use crate::assets::{self, AssetStore};
use crate::consts::{
    CANVAS_H, CANVAS_W, DEPTH_ACTORS, DEPTH_BG, DEPTH_GUN, DEPTH_HANDS, DEPTH_TABLE, DEPTH_UI,
    HP_MAX,
};
use crate::game::Actor;
use crate::scene::{
    CircleShape, Drawable, MosaicSprite, NodeConfig, NodeId, RectShape, Rgb, Scene, TextLabel,
};

/// Dimmed wooden floor filling the whole view
pub fn build_background(scene: &mut Scene, assets: &mut AssetStore) -> NodeId {
    let blocks = assets.mosaic(assets::WOODEN_FLOOR, assets::params::background());
    let root = scene.root();
    scene.spawn_child(
        root,
        NodeConfig::new()
            .depth(DEPTH_BG)
            .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
    )
}

/// Round table the shotgun sits on
pub fn build_table(scene: &mut Scene) -> NodeId {
    let root = scene.root();
    let table = scene.spawn_child(root, NodeConfig::new().depth(DEPTH_TABLE));
    scene.spawn_child(
        table,
        NodeConfig::new().depth(DEPTH_TABLE).drawable(Drawable::Circle(
            CircleShape::filled(140.0, Rgb(25, 60, 45)).bordered(Rgb(40, 140, 90), 6.0),
        )),
    );
    scene.spawn_child(
        table,
        NodeConfig::new()
            .depth(DEPTH_TABLE)
            .drawable(Drawable::Circle(
                CircleShape {
                    radius: 80.0,
                    fill: None,
                    stroke: Some(Rgb(30, 120, 80)),
                    stroke_width: 3.0,
                },
            )),
    );
    table
}

/// One duel party: a positioning layer holding the face sprite and a
/// separate hand layer, so shakes and knockbacks move the whole rig.
pub struct ActorRig {
    pub layer: NodeId,
    pub face: NodeId,
    pub hand_layer: NodeId,
    pub hand: NodeId,
}

impl ActorRig {
    pub fn build(scene: &mut Scene, assets: &mut AssetStore, actor: Actor) -> Self {
        let (face_asset, hand_asset, sign) = match actor {
            Actor::Player => (assets::PLAYER_FACE, assets::PLAYER_HAND, -1.0),
            Actor::Dealer => (assets::DEALER_FACE, assets::DEALER_HAND, 1.0),
        };
        let root = scene.root();
        let layer = scene.spawn_child(
            root,
            NodeConfig::new()
                .at(0.0, sign * CANVAS_H * 0.28)
                .depth(DEPTH_ACTORS),
        );
        let face_blocks = assets.mosaic(face_asset, assets::params::sprite());
        let face = scene.spawn_child(
            layer,
            NodeConfig::new()
                .depth(DEPTH_ACTORS)
                .drawable(Drawable::Mosaic(MosaicSprite {
                    blocks: face_blocks,
                })),
        );
        let hand_layer = scene.spawn_child(layer, NodeConfig::new().depth(DEPTH_HANDS));
        let hand_blocks = assets.mosaic(hand_asset, assets::params::sprite());
        let hand = scene.spawn_child(
            hand_layer,
            NodeConfig::new()
                .at(0.0, -sign * CANVAS_H * 0.12)
                .depth(DEPTH_HANDS)
                .drawable(Drawable::Mosaic(MosaicSprite {
                    blocks: hand_blocks,
                })),
        );
        Self {
            layer,
            face,
            hand_layer,
            hand,
        }
    }

    /// World position of the face, the click hit-test center
    pub fn face_center(&self, scene: &Scene) -> Vec2 {
        scene.world_position(self.face)
    }

    pub fn set_hand_visible(&self, scene: &mut Scene, visible: bool) {
        if let Some(node) = scene.get_mut(self.hand) {
            node.visible = visible;
        }
    }
}

/// The shotgun on the table: an idle sprite and a hands-holding-it sprite
/// that swap by visibility when a turn starts and ends. The layer rotation
/// is what the session tweens to aim at either party.
pub struct GunRig {
    pub layer: NodeId,
    idle: NodeId,
    held: NodeId,
}

impl GunRig {
    pub fn build(scene: &mut Scene, assets: &mut AssetStore) -> Self {
        let root = scene.root();
        let layer = scene.spawn_child(root, NodeConfig::new().depth(DEPTH_GUN));
        let idle_blocks = assets.mosaic(assets::SHOTGUN, assets::params::gun());
        let idle = scene.spawn_child(
            layer,
            NodeConfig::new()
                .depth(DEPTH_GUN)
                .drawable(Drawable::Mosaic(MosaicSprite {
                    blocks: idle_blocks,
                })),
        );
        let held_blocks = assets.mosaic(assets::SHOTGUN_HELD, assets::params::gun());
        let held = scene.spawn_child(
            layer,
            NodeConfig::new()
                .depth(DEPTH_GUN)
                .drawable(Drawable::Mosaic(MosaicSprite {
                    blocks: held_blocks,
                })),
        );
        if let Some(node) = scene.get_mut(held) {
            node.visible = false;
        }
        Self { layer, idle, held }
    }

    pub fn set_held(&self, scene: &mut Scene, held: bool) {
        if let Some(node) = scene.get_mut(self.idle) {
            node.visible = !held;
        }
        if let Some(node) = scene.get_mut(self.held) {
            node.visible = held;
        }
    }

    pub fn is_held(&self, scene: &Scene) -> bool {
        scene.get(self.held).map(|n| n.visible).unwrap_or(false)
    }

    pub fn muzzle_world(&self, scene: &Scene) -> Vec2 {
        scene.world_position(self.layer)
    }
}

/// Horizontal HP bar with one cell per hit point. Cells drain and refill
/// one at a time so damage reads as a sequence, not a jump.
pub struct HpBar {
    pub panel: NodeId,
    cells: Vec<NodeId>,
    shown: u8,
}

const HP_ON: Rgb = Rgb(80, 200, 120);
const HP_OFF: Rgb = Rgb(45, 55, 70);

impl HpBar {
    pub fn build(scene: &mut Scene, actor: Actor) -> Self {
        let sign = match actor {
            Actor::Player => -1.0,
            Actor::Dealer => 1.0,
        };
        let root = scene.root();
        let panel = scene.spawn_child(
            root,
            NodeConfig::new()
                .at(CANVAS_W * 0.3, sign * CANVAS_H * 0.28)
                .depth(DEPTH_UI)
                .drawable(Drawable::Rect(
                    RectShape::filled(240.0, 24.0, Rgb(30, 30, 40))
                        .bordered(Rgb(90, 100, 120), 3.0),
                )),
        );
        let cell_w = (240.0 - 4.0 * (HP_MAX as f32 + 1.0)) / HP_MAX as f32;
        let cells = (0..HP_MAX)
            .map(|i| {
                let x = -120.0 + 4.0 + cell_w / 2.0 + i as f32 * (cell_w + 4.0);
                scene.spawn_child(
                    panel,
                    NodeConfig::new()
                        .at(x, 0.0)
                        .depth(DEPTH_UI)
                        .drawable(Drawable::Rect(RectShape::filled(cell_w, 16.0, HP_ON))),
                )
            })
            .collect();
        Self {
            panel,
            cells,
            shown: HP_MAX,
        }
    }

    fn paint_cell(scene: &mut Scene, cell: NodeId, on: bool) {
        if let Some(node) = scene.get_mut(cell) {
            if let Some(Drawable::Rect(rect)) = node.drawable.as_mut() {
                rect.fill = Some(if on { HP_ON } else { HP_OFF });
            }
        }
    }

    pub fn shown(&self) -> u8 {
        self.shown
    }

    /// Step the displayed value toward `hp`, one cell per beat
    pub async fn set(&mut self, animator: &Animator, hp: u8) {
        let hp = hp.min(HP_MAX);
        while self.shown != hp {
            let next = if self.shown > hp {
                self.shown - 1
            } else {
                self.shown + 1
            };
            let (cell, on) = if next < self.shown {
                (self.cells[next as usize], false)
            } else {
                (self.cells[(next - 1) as usize], true)
            };
            Self::paint_cell(&mut animator.scene().borrow_mut(), cell, on);
            self.shown = next;
            animator.pause_ms(60.0).await;
        }
    }

    /// Snap the displayed value without animation
    pub fn reset(&mut self, scene: &mut Scene, hp: u8) {
        let hp = hp.min(HP_MAX);
        for (i, &cell) in self.cells.iter().enumerate() {
            Self::paint_cell(scene, cell, (i as u8) < hp);
        }
        self.shown = hp;
    }
}

/// "DMG +N" readout shown while the damage stack is non-zero. Each blank
/// self-shot pulses it larger in proportion to the stack.
pub struct DamageCounter {
    pub node: NodeId,
}

impl DamageCounter {
    pub fn build(scene: &mut Scene) -> Self {
        let root = scene.root();
        let node = scene.spawn_child(
            root,
            NodeConfig::new()
                .at(120.0, 120.0)
                .depth(DEPTH_UI)
                .drawable(Drawable::Text(TextLabel::new(
                    "DMG +0",
                    28.0,
                    Rgb(230, 120, 90),
                ))),
        );
        if let Some(n) = scene.get_mut(node) {
            n.rotation = 45.0;
            n.visible = false;
        }
        Self { node }
    }

    pub fn set_stack(&self, scene: &mut Scene, stack: u8) {
        if let Some(node) = scene.get_mut(self.node) {
            node.visible = stack > 0;
            if let Some(Drawable::Text(label)) = node.drawable.as_mut() {
                label.text = format!("DMG +{stack}");
            }
        }
    }

    /// Grow with the stack, then settle back to the stack's resting scale
    pub async fn pulse(&self, animator: &Animator, stack: u8) {
        let rest = (128.0f32 / 125.0).powi(i32::from(stack));
        let peak = (128.0f32 / 125.0).powi(i32::from(stack) + 4);
        animator
            .tween(
                self.node,
                TweenTarget {
                    scale: Some(peak),
                    ..TweenTarget::default()
                },
                120.0,
                Easing::OutQuad,
            )
            .await;
        animator
            .tween(
                self.node,
                TweenTarget {
                    scale: Some(rest),
                    ..TweenTarget::default()
                },
                160.0,
                Easing::OutQuad,
            )
            .await;
    }
}
