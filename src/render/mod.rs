//! Per-frame renderer
//!
//! Walks the scene once per frame, flattens visible nodes into world-space
//! draw records, sorts by depth and paints through a [`Surface`]. The
//! renderer only reads node properties; it never mutates gameplay state.

#[cfg(target_arch = "wasm32")]
pub mod canvas;

use glam::{Affine2, Vec2};

use crate::scene::{NodeId, Rgb, Scene};

/// Paint backend, fed local-coordinate primitives under a pre-set world
/// transform. The backend owns the canvas-center / y-up device mapping.
pub trait Surface {
    fn begin_frame(&mut self);
    fn set_transform(&mut self, world: Affine2);
    fn fill_rect(&mut self, center: Vec2, size: Vec2, color: Rgb);
    fn stroke_rect(&mut self, center: Vec2, size: Vec2, color: Rgb, line_width: f32);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgb);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Rgb, line_width: f32);
    fn fill_text(&mut self, text: &str, origin: Vec2, size_px: f32, color: Rgb);
    fn end_frame(&mut self) {}
}

struct DrawRecord {
    id: NodeId,
    world: Affine2,
    depth: i32,
}

fn collect(scene: &Scene, id: NodeId, parent_world: Affine2, out: &mut Vec<DrawRecord>) {
    let Some(node) = scene.get(id) else {
        return;
    };
    if !node.visible {
        // invisibility is inherited: skip the whole subtree
        return;
    }
    let world = parent_world * node.local_affine();
    if node.drawable.is_some() {
        out.push(DrawRecord {
            id,
            world,
            depth: node.depth,
        });
    }
    for &child in node.children() {
        collect(scene, child, world, out);
    }
}

/// Render one frame: clear, flatten, sort by depth descending, paint in that
/// order so lower depth values end up in front.
pub fn render_frame(scene: &Scene, surface: &mut dyn Surface) {
    let mut records = Vec::new();
    collect(scene, scene.root(), Affine2::IDENTITY, &mut records);
    records.sort_by(|a, b| b.depth.cmp(&a.depth));

    surface.begin_frame();
    for record in &records {
        let Some(node) = scene.get(record.id) else {
            continue;
        };
        let Some(drawable) = &node.drawable else {
            continue;
        };
        surface.set_transform(record.world);
        drawable.paint(surface);
    }
    surface.end_frame();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{CircleShape, Drawable, NodeConfig, RectShape};

    /// Records one entry per painted primitive, tagged with the active depth
    /// via paint order.
    #[derive(Default)]
    struct RecordingSurface {
        frames: u32,
        painted: Vec<(String, Vec2)>,
        current: Affine2,
    }

    impl Surface for RecordingSurface {
        fn begin_frame(&mut self) {
            self.frames += 1;
            self.painted.clear();
        }

        fn set_transform(&mut self, world: Affine2) {
            self.current = world;
        }

        fn fill_rect(&mut self, center: Vec2, _size: Vec2, _color: Rgb) {
            let world = self.current.transform_point2(center);
            self.painted.push(("rect".into(), world));
        }

        fn stroke_rect(&mut self, _c: Vec2, _s: Vec2, _color: Rgb, _w: f32) {
            self.painted.push(("stroke_rect".into(), Vec2::ZERO));
        }

        fn fill_circle(&mut self, center: Vec2, _radius: f32, _color: Rgb) {
            let world = self.current.transform_point2(center);
            self.painted.push(("circle".into(), world));
        }

        fn stroke_circle(&mut self, _c: Vec2, _r: f32, _color: Rgb, _w: f32) {
            self.painted.push(("stroke_circle".into(), Vec2::ZERO));
        }

        fn fill_text(&mut self, text: &str, _origin: Vec2, _size: f32, _color: Rgb) {
            self.painted.push((format!("text:{text}"), Vec2::ZERO));
        }
    }

    fn rect(fill: Rgb) -> Drawable {
        Drawable::Rect(RectShape::filled(10.0, 10.0, fill))
    }

    #[test]
    fn test_depth_descending_paint_order() {
        let mut scene = Scene::new();
        let root = scene.root();
        // front (depth 5) spawned first, back (depth 100) last: paint order
        // must still be back-to-front
        let mut front = NodeConfig::new().depth(5).drawable(rect(Rgb(1, 0, 0)));
        front.x = 1.0;
        scene.spawn_child(root, front);
        let mut mid = NodeConfig::new().depth(50).drawable(rect(Rgb(2, 0, 0)));
        mid.x = 2.0;
        scene.spawn_child(root, mid);
        let mut back = NodeConfig::new().depth(100).drawable(rect(Rgb(3, 0, 0)));
        back.x = 3.0;
        scene.spawn_child(root, back);

        let mut surface = RecordingSurface::default();
        render_frame(&scene, &mut surface);
        let xs: Vec<f32> = surface.painted.iter().map(|(_, p)| p.x).collect();
        assert_eq!(xs, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_invisible_subtree_is_skipped() {
        let mut scene = Scene::new();
        let hidden = scene.spawn_child(scene.root(), NodeConfig::new());
        scene.get_mut(hidden).unwrap().visible = false;
        scene.spawn_child(hidden, NodeConfig::new().drawable(rect(Rgb(0, 0, 0))));
        scene.spawn_child(
            scene.root(),
            NodeConfig::new().drawable(Drawable::Circle(CircleShape::filled(4.0, Rgb(9, 9, 9)))),
        );

        let mut surface = RecordingSurface::default();
        render_frame(&scene, &mut surface);
        assert_eq!(surface.painted.len(), 1);
        assert_eq!(surface.painted[0].0, "circle");
    }

    #[test]
    fn test_transforms_compose_through_undrawn_parents() {
        let mut scene = Scene::new();
        // a bare layer contributes no paint call but still positions children
        let layer = scene.spawn_child(scene.root(), NodeConfig::new().at(100.0, 0.0));
        scene.spawn_child(layer, NodeConfig::new().at(10.0, 0.0).drawable(rect(Rgb(0, 0, 0))));

        let mut surface = RecordingSurface::default();
        render_frame(&scene, &mut surface);
        assert_eq!(surface.painted.len(), 1);
        assert!((surface.painted[0].1.x - 110.0).abs() < 1e-4);
    }
}
