//! Transform node tree with arena storage and generational handles

use glam::{Affine2, Vec2};
use thiserror::Error;

use super::drawable::Drawable;
use crate::normalize_deg;

/// Scene graph structural errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    /// Reparenting a node to itself or to one of its descendants
    #[error("reparenting would create a cycle")]
    InvalidReparent,
    /// Handle refers to a despawned or never-allocated node
    #[error("stale node handle")]
    StaleHandle,
}

/// Handle to a node in a [`Scene`]. Cheap to copy; becomes stale on despawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Initial properties for a spawned node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale: f32,
    pub depth: i32,
    pub visible: bool,
    pub drawable: Option<Drawable>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeConfig {
    pub fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
            depth: 0,
            visible: true,
            drawable: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    pub fn drawable(mut self, drawable: Drawable) -> Self {
        self.drawable = Some(drawable);
        self
    }
}

/// A single scene node
#[derive(Debug)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    /// Local rotation in degrees, CCW, normalized to (-180, 180]
    pub rotation: f32,
    /// Uniform scale applied before rotation and translation
    pub scale: f32,
    /// Paint-order key; lower values paint later (appear in front)
    pub depth: i32,
    /// Invisibility is inherited by the whole subtree
    pub visible: bool,
    pub drawable: Option<Drawable>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn from_config(cfg: NodeConfig) -> Self {
        Self {
            x: cfg.x,
            y: cfg.y,
            rotation: normalize_deg(cfg.rotation),
            scale: cfg.scale,
            depth: cfg.depth,
            visible: cfg.visible,
            drawable: cfg.drawable,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn move_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn rotate_by(&mut self, degrees: f32) {
        self.rotation = normalize_deg(self.rotation + degrees);
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Local affine matrix: scale, then rotate about the origin, then
    /// translate into parent space.
    pub fn local_affine(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(
            Vec2::splat(self.scale),
            self.rotation.to_radians(),
            Vec2::new(self.x, self.y),
        )
    }
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of nodes forming a single tree rooted at [`Scene::root`]
pub struct Scene {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let mut scene = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        scene.root = scene.spawn(NodeConfig::new());
        scene
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node. Attach it with [`Scene::attach`] or use
    /// [`Scene::spawn_child`].
    pub fn spawn(&mut self, cfg: NodeConfig) -> NodeId {
        let node = Node::from_config(cfg);
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub fn spawn_child(&mut self, parent: NodeId, cfg: NodeConfig) -> NodeId {
        let id = self.spawn(cfg);
        // A fresh node cannot be an ancestor of anything
        self.attach(parent, id)
            .unwrap_or_else(|_| unreachable!("fresh node cannot form a cycle"));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Reparent `child` under `parent`, detaching from any prior parent.
    /// Re-attaching to the current parent is a silent no-op. Attaching a node
    /// to itself or to one of its descendants fails with
    /// [`SceneError::InvalidReparent`].
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(SceneError::StaleHandle);
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::InvalidReparent);
        }
        if self.get(child).and_then(Node::parent) == Some(parent) {
            return Ok(());
        }
        if let Some(old) = self.get(child).and_then(Node::parent) {
            self.detach(old, child);
        }
        if let Some(p) = self.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Remove `child` from `parent` by identity. No-op when absent.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) {
        let Some(p) = self.get_mut(parent) else {
            return;
        };
        let Some(pos) = p.children.iter().position(|&c| c == child) else {
            return;
        };
        p.children.remove(pos);
        if let Some(c) = self.get_mut(child) {
            c.parent = None;
        }
    }

    /// Despawn a node and its entire subtree. Stale handles are ignored.
    pub fn despawn(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        if let Some(parent) = self.get(id).and_then(Node::parent) {
            self.detach(parent, id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            stack.extend_from_slice(node.children());
            let slot = &mut self.slots[current.index as usize];
            slot.node = None;
            self.free.push(current.index);
        }
    }

    /// Detach and despawn every child of `id`, keeping the node itself.
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self
            .get(id)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.despawn(child);
        }
    }

    /// True when `ancestor` appears on the parent chain of `id` (inclusive).
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.get(c).and_then(Node::parent);
        }
        false
    }

    /// World affine transform, recomputed on every call: parent chain applied
    /// outward, `world = parent.world * local`.
    pub fn world_affine(&self, id: NodeId) -> Affine2 {
        let mut m = self
            .get(id)
            .map(Node::local_affine)
            .unwrap_or(Affine2::IDENTITY);
        let mut current = self.get(id).and_then(Node::parent);
        while let Some(p) = current {
            let Some(node) = self.get(p) else { break };
            m = node.local_affine() * m;
            current = node.parent();
        }
        m
    }

    /// World position of the node's origin
    pub fn world_position(&self, id: NodeId) -> Vec2 {
        self.world_affine(id).translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::drawable::{Drawable, RectShape, Rgb};

    fn leaf() -> NodeConfig {
        NodeConfig::new().drawable(Drawable::Rect(RectShape::filled(10.0, 10.0, Rgb(1, 2, 3))))
    }

    #[test]
    fn test_attach_reparents_single_edge() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        let b = scene.spawn_child(scene.root(), NodeConfig::new());
        let child = scene.spawn_child(a, leaf());

        assert_eq!(scene.get(child).unwrap().parent(), Some(a));
        scene.attach(b, child).unwrap();
        assert_eq!(scene.get(child).unwrap().parent(), Some(b));
        assert!(!scene.get(a).unwrap().children().contains(&child));
        assert!(scene.get(b).unwrap().children().contains(&child));
        // exactly one parent-child edge survives
        let edges = scene.get(a).unwrap().children().len() + scene.get(b).unwrap().children().len();
        assert_eq!(edges, 1);
    }

    #[test]
    fn test_attach_to_current_parent_is_noop() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        let child = scene.spawn_child(a, NodeConfig::new());
        scene.attach(a, child).unwrap();
        assert_eq!(scene.get(a).unwrap().children().len(), 1);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        let b = scene.spawn_child(a, NodeConfig::new());
        let c = scene.spawn_child(b, NodeConfig::new());

        assert_eq!(scene.attach(a, a), Err(SceneError::InvalidReparent));
        assert_eq!(scene.attach(c, a), Err(SceneError::InvalidReparent));
        assert_eq!(scene.attach(b, a), Err(SceneError::InvalidReparent));
    }

    #[test]
    fn test_detach_absent_is_noop() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        let b = scene.spawn_child(scene.root(), NodeConfig::new());
        scene.detach(a, b); // b is not a child of a
        assert_eq!(scene.get(scene.root()).unwrap().children().len(), 2);
    }

    #[test]
    fn test_world_position_translation() {
        let mut scene = Scene::new();
        let parent = scene.spawn_child(scene.root(), NodeConfig::new().at(100.0, 50.0));
        let child = scene.spawn_child(parent, NodeConfig::new().at(10.0, -5.0));
        let w = scene.world_position(child);
        assert!((w.x - 110.0).abs() < 1e-4);
        assert!((w.y - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_world_position_parent_rotation() {
        let mut scene = Scene::new();
        let mut cfg = NodeConfig::new();
        cfg.rotation = 90.0;
        let parent = scene.spawn_child(scene.root(), cfg);
        let child = scene.spawn_child(parent, NodeConfig::new().at(10.0, 0.0));
        // local (10, 0) under a parent rotated 90 deg CCW lands at (0, 10)
        let w = scene.world_position(child);
        assert!(w.x.abs() < 1e-4);
        assert!((w.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_world_position_scale_then_translate() {
        let mut scene = Scene::new();
        let mut cfg = NodeConfig::new().at(5.0, 5.0);
        cfg.scale = 2.0;
        let parent = scene.spawn_child(scene.root(), cfg);
        let child = scene.spawn_child(parent, NodeConfig::new().at(3.0, 0.0));
        let w = scene.world_position(child);
        assert!((w.x - 11.0).abs() < 1e-4);
        assert!((w.y - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_despawn_removes_subtree_and_stales_handles() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        let b = scene.spawn_child(a, NodeConfig::new());
        let c = scene.spawn_child(b, NodeConfig::new());

        scene.despawn(a);
        assert!(!scene.contains(a));
        assert!(!scene.contains(b));
        assert!(!scene.contains(c));
        assert!(scene.get(scene.root()).unwrap().children().is_empty());

        // slot reuse bumps the generation, old handles stay stale
        let d = scene.spawn_child(scene.root(), NodeConfig::new());
        assert!(scene.contains(d));
        assert!(!scene.contains(a));
    }

    #[test]
    fn test_rotation_normalized_on_rotate_by() {
        let mut scene = Scene::new();
        let a = scene.spawn_child(scene.root(), NodeConfig::new());
        scene.get_mut(a).unwrap().rotate_by(270.0);
        assert!((scene.get(a).unwrap().rotation - -90.0).abs() < 1e-4);
        scene.get_mut(a).unwrap().rotate_by(-270.0);
        assert!(scene.get(a).unwrap().rotation.abs() < 1e-4);
    }
}
