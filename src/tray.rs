//! Cartridge tray UI
//!
//! Six visual slots holding the current round's unconsumed shell icons. The
//! tray shows a timed preview of the drawn shells, then conceals and
//! shuffles them; the concealed order is the actual firing order, consumed
//! strictly left to right.

use glam::Vec2;
use rand::Rng;

use crate::assets::{self, AssetStore};
use crate::consts::{CANVAS_W, CARTRIDGE_CAPACITY, DEPTH_UI};
use crate::game::{GameError, RoundKind, rules::shuffle_round};
use crate::scene::{
    CircleShape, Drawable, MosaicSprite, NodeConfig, NodeId, RectShape, Rgb, Scene,
};

struct Slot {
    anchor: NodeId,
    icon: Option<NodeId>,
    kind: Option<RoundKind>,
    concealed: bool,
}

pub struct CartridgeTray {
    slots_layer: NodeId,
    slots: Vec<Slot>,
}

impl CartridgeTray {
    pub fn build(scene: &mut Scene, parent: NodeId) -> Self {
        let root = scene.spawn_child(parent, NodeConfig::new().depth(DEPTH_UI));
        let panel_center = Vec2::new(-CANVAS_W * 0.25, -10.0);
        scene.spawn_child(
            root,
            NodeConfig::new()
                .at(panel_center.x, panel_center.y)
                .depth(DEPTH_UI)
                .drawable(Drawable::Rect(
                    RectShape::filled(280.0, 140.0, Rgb(35, 50, 50))
                        .bordered(Rgb(80, 110, 110), 3.0),
                )),
        );
        let slots_layer = scene.spawn_child(root, NodeConfig::new().depth(DEPTH_UI));

        let left = panel_center.x - 100.0;
        let spacing = 40.0;
        let slots = (0..CARTRIDGE_CAPACITY)
            .map(|i| {
                let anchor = scene.spawn_child(
                    slots_layer,
                    NodeConfig::new()
                        .at(left + i as f32 * spacing, panel_center.y)
                        .depth(DEPTH_UI)
                        .drawable(Drawable::Circle(
                            CircleShape::filled(14.0, Rgb(20, 30, 30))
                                .bordered(Rgb(120, 160, 160), 2.0),
                        )),
                );
                Slot {
                    anchor,
                    icon: None,
                    kind: None,
                    concealed: false,
                }
            })
            .collect();
        Self { slots_layer, slots }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.icon.is_none())
    }

    /// Shell kinds still in the tray, left to right
    pub fn remaining_kinds(&self) -> Vec<RoundKind> {
        self.slots.iter().filter_map(|s| s.kind).collect()
    }

    pub fn clear_icons(&mut self, scene: &mut Scene) {
        for slot in &mut self.slots {
            if let Some(icon) = slot.icon.take() {
                scene.despawn(icon);
            }
            slot.kind = None;
            slot.concealed = false;
        }
    }

    fn icon_for(
        &self,
        scene: &mut Scene,
        assets: &mut AssetStore,
        asset: &'static str,
        at: Vec2,
    ) -> NodeId {
        let blocks = assets.mosaic(asset, assets::params::shell_icon());
        scene.spawn_child(
            self.slots_layer,
            NodeConfig::new()
                .at(at.x, at.y)
                .depth(DEPTH_UI)
                .drawable(Drawable::Mosaic(MosaicSprite { blocks })),
        )
    }

    /// Reveal the drawn shells, leftmost-first. Requesting more icons than
    /// the tray has slots is an invariant violation.
    pub fn show_preview(
        &mut self,
        scene: &mut Scene,
        assets: &mut AssetStore,
        kinds: &[RoundKind],
    ) -> Result<(), GameError> {
        if kinds.len() > self.slots.len() {
            return Err(GameError::TrayOverflow {
                requested: kinds.len(),
                capacity: self.slots.len(),
            });
        }
        self.clear_icons(scene);
        for (i, &kind) in kinds.iter().enumerate() {
            let asset = match kind {
                RoundKind::Live => assets::SHELL_LIVE,
                RoundKind::Blank => assets::SHELL_BLANK,
            };
            let at = scene
                .get(self.slots[i].anchor)
                .map(crate::scene::Node::position)
                .unwrap_or(Vec2::ZERO);
            let icon = self.icon_for(scene, assets, asset, at);
            self.slots[i].icon = Some(icon);
            self.slots[i].kind = Some(kind);
            self.slots[i].concealed = false;
        }
        Ok(())
    }

    /// Swap every revealed icon for the concealed art and shuffle the
    /// underlying kinds uniformly. The post-shuffle order is the firing
    /// order.
    pub fn conceal_and_shuffle<R: Rng>(
        &mut self,
        scene: &mut Scene,
        assets: &mut AssetStore,
        rng: &mut R,
    ) {
        let occupied: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.slots[i].icon.is_some())
            .collect();
        let mut kinds: Vec<RoundKind> = occupied
            .iter()
            .filter_map(|&i| self.slots[i].kind)
            .collect();
        shuffle_round(&mut kinds, rng);

        for (&i, &kind) in occupied.iter().zip(kinds.iter()) {
            if let Some(icon) = self.slots[i].icon.take() {
                scene.despawn(icon);
            }
            let at = scene
                .get(self.slots[i].anchor)
                .map(crate::scene::Node::position)
                .unwrap_or(Vec2::ZERO);
            let icon = self.icon_for(scene, assets, assets::SHELL_CONCEALED, at);
            self.slots[i].icon = Some(icon);
            self.slots[i].kind = Some(kind);
            self.slots[i].concealed = true;
        }
    }

    /// Consume the leftmost occupied slot, returning its kind and the
    /// slot's world anchor position for the load animation.
    pub fn take_leftmost(&mut self, scene: &mut Scene) -> Option<(RoundKind, Vec2)> {
        for slot in &mut self.slots {
            if let Some(icon) = slot.icon.take() {
                let kind = slot.kind.take()?;
                slot.concealed = false;
                let at = scene.world_position(slot.anchor);
                scene.despawn(icon);
                return Some((kind, at));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn fixture() -> (Scene, AssetStore, CartridgeTray) {
        let mut scene = Scene::new();
        let assets = AssetStore::new();
        let root = scene.root();
        let tray = CartridgeTray::build(&mut scene, root);
        (scene, assets, tray)
    }

    #[test]
    fn test_preview_overflow_rejected() {
        let (mut scene, mut assets, mut tray) = fixture();
        let too_many = vec![RoundKind::Live; CARTRIDGE_CAPACITY + 1];
        assert!(matches!(
            tray.show_preview(&mut scene, &mut assets, &too_many),
            Err(GameError::TrayOverflow { .. })
        ));
    }

    #[test]
    fn test_take_leftmost_yields_shuffled_order_exactly() {
        let (mut scene, mut assets, mut tray) = fixture();
        let kinds = [
            RoundKind::Live,
            RoundKind::Live,
            RoundKind::Blank,
            RoundKind::Blank,
            RoundKind::Blank,
        ];
        tray.show_preview(&mut scene, &mut assets, &kinds).unwrap();
        let mut rng = Pcg32::seed_from_u64(99);
        tray.conceal_and_shuffle(&mut scene, &mut assets, &mut rng);
        let order = tray.remaining_kinds();
        assert_eq!(order.len(), kinds.len());

        let mut taken = Vec::new();
        while let Some((kind, _at)) = tray.take_leftmost(&mut scene) {
            taken.push(kind);
        }
        assert_eq!(taken, order);
        assert!(tray.is_empty());
    }

    #[test]
    fn test_shuffle_preserves_multiset() {
        let (mut scene, mut assets, mut tray) = fixture();
        let kinds = [RoundKind::Live, RoundKind::Blank, RoundKind::Blank];
        tray.show_preview(&mut scene, &mut assets, &kinds).unwrap();
        let mut rng = Pcg32::seed_from_u64(3);
        tray.conceal_and_shuffle(&mut scene, &mut assets, &mut rng);
        let order = tray.remaining_kinds();
        let live = order.iter().filter(|&&k| k == RoundKind::Live).count();
        assert_eq!(live, 1);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_take_from_empty_is_none() {
        let (mut scene, _assets, mut tray) = fixture();
        assert!(tray.take_leftmost(&mut scene).is_none());
    }
}
