//! Transform tree stored in a `hecs` world.
//!
//! Every node is an entity carrying a [`Transformation`] (local-to-parent) and
//! an ordered [`Children`] list. Attached nodes also carry a [`Parent`] back
//! link, which makes [`SceneGraph::to_parent_transform`] an O(depth) walk.
//! Nodes may reference a drawable ([`Drawable`]) and a [`Name`].
//!
//! The graph stays a tree: [`SceneGraph::add_child`] refuses to attach a node
//! that already has a parent, and any edge that would close a cycle.
//!
//! Entity ids are generational, so handles to removed nodes fail lookups with
//! [`SceneError::NodeNotFound`] instead of aliasing a newer node.
//!
//! # Example
//!
//! ```
//! use glam::{Mat4, Vec3};
//! use lightpass::SceneGraph;
//!
//! let mut graph = SceneGraph::new();
//! let world = graph.create_named("World", None, Mat4::IDENTITY);
//! let camera = graph.create_named("Camera", None, Mat4::from_translation(Vec3::Z * 3.0));
//! let light = graph.create_named("Light0", None, Mat4::from_translation(Vec3::Y));
//! graph.add_child(world, camera).unwrap();
//! graph.add_child(camera, light).unwrap();
//!
//! let light_to_world = graph.to_parent_transform(world, light).unwrap();
//! assert_eq!(light_to_world.transform_point3(Vec3::ZERO), Vec3::new(0.0, 1.0, 3.0));
//! ```

use glam::{Mat4, Vec3};
use hecs::{Entity, World};

use crate::camera::Camera;
use crate::error::{RenderError, SceneError};
use crate::mesh::MeshId;

/// Local-to-parent transform of a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transformation(pub Mat4);

/// Ordered children; list order is draw order.
#[derive(Clone, Debug, Default)]
pub struct Children(pub Vec<Entity>);

/// Back link to the owning node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Mesh drawn at this node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Drawable(pub MeshId);

/// Lookup name, resolved at scene construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

/// Receives the drawables found while traversing the graph.
pub trait DrawMesh {
    /// Draws `mesh` with the root-space `model` matrix for one light pass.
    fn draw_mesh(
        &mut self,
        mesh: MeshId,
        model: Mat4,
        camera: &Camera,
        light_pass: usize,
    ) -> Result<(), RenderError>;
}

/// A tree of transform nodes.
#[derive(Default)]
pub struct SceneGraph {
    world: World,
}

impl SceneGraph {
    /// An empty graph. Roots are ordinary nodes without a parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached node.
    pub fn create_node(&mut self, drawable: Option<MeshId>, transformation: Mat4) -> Entity {
        let node = self
            .world
            .spawn((Transformation(transformation), Children::default()));
        if let Some(mesh) = drawable {
            let _ = self.world.insert_one(node, Drawable(mesh));
        }
        node
    }

    /// Creates a detached node that [`find`](Self::find) can resolve by `name`.
    pub fn create_named(
        &mut self,
        name: &str,
        drawable: Option<MeshId>,
        transformation: Mat4,
    ) -> Entity {
        let node = self.create_node(drawable, transformation);
        let _ = self.world.insert_one(node, Name(name.to_string()));
        node
    }

    /// Whether `node` is alive. Removed handles stay false even after the
    /// slot is reused.
    pub fn contains(&self, node: Entity) -> bool {
        self.world.contains(node)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    fn ensure(&self, node: Entity) -> Result<(), SceneError> {
        if self.world.contains(node) {
            Ok(())
        } else {
            Err(SceneError::NodeNotFound(node))
        }
    }

    /// Appends `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        if self.parent(child)?.is_some() {
            return Err(SceneError::AlreadyAttached(child));
        }
        if parent == child || self.is_ancestor(child, parent)? {
            return Err(SceneError::WouldCreateCycle { parent, child });
        }
        self.world
            .get::<&mut Children>(parent)
            .map_err(|_| SceneError::NodeNotFound(parent))?
            .0
            .push(child);
        self.world
            .insert_one(child, Parent(parent))
            .map_err(|_| SceneError::NodeNotFound(child))?;
        Ok(())
    }

    /// Removes `child` from its parent's list. Detached nodes are left as is.
    pub fn detach(&mut self, child: Entity) -> Result<(), SceneError> {
        let Some(parent) = self.parent(child)? else {
            return Ok(());
        };
        if let Ok(mut children) = self.world.get::<&mut Children>(parent) {
            children.0.retain(|c| *c != child);
        }
        let _ = self.world.remove_one::<Parent>(child);
        Ok(())
    }

    /// Detaches all children of `node`. The children stay alive.
    pub fn clear_children(&mut self, node: Entity) -> Result<(), SceneError> {
        for child in self.children(node)? {
            let _ = self.world.remove_one::<Parent>(child);
        }
        self.world
            .get::<&mut Children>(node)
            .map_err(|_| SceneError::NodeNotFound(node))?
            .0
            .clear();
        Ok(())
    }

    /// Replaces the children of `node`, detaching each new child from its
    /// previous parent first.
    pub fn set_children(&mut self, node: Entity, children: &[Entity]) -> Result<(), SceneError> {
        self.clear_children(node)?;
        for &child in children {
            self.detach(child)?;
            self.add_child(node, child)?;
        }
        Ok(())
    }

    /// Children of `node` in draw order.
    pub fn children(&self, node: Entity) -> Result<Vec<Entity>, SceneError> {
        self.world
            .get::<&Children>(node)
            .map(|c| c.0.clone())
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    /// The node `node` is attached to, `None` for roots and detached nodes.
    pub fn parent(&self, node: Entity) -> Result<Option<Entity>, SceneError> {
        self.ensure(node)?;
        Ok(self.world.get::<&Parent>(node).ok().map(|p| p.0))
    }

    /// Mesh drawn at `node`, if any.
    pub fn drawable(&self, node: Entity) -> Result<Option<MeshId>, SceneError> {
        self.ensure(node)?;
        Ok(self.world.get::<&Drawable>(node).ok().map(|d| d.0))
    }

    pub fn set_drawable(&mut self, node: Entity, mesh: Option<MeshId>) -> Result<(), SceneError> {
        self.ensure(node)?;
        match mesh {
            Some(mesh) => {
                let _ = self.world.insert_one(node, Drawable(mesh));
            }
            None => {
                let _ = self.world.remove_one::<Drawable>(node);
            }
        }
        Ok(())
    }

    pub fn name(&self, node: Entity) -> Option<String> {
        self.world.get::<&Name>(node).ok().map(|n| n.0.clone())
    }

    /// Resolves a node by name.
    pub fn find(&self, name: &str) -> Result<Entity, SceneError> {
        self.world
            .query::<&Name>()
            .iter()
            .find(|(_, n)| n.0 == name)
            .map(|(node, _)| node)
            .ok_or_else(|| SceneError::UnknownName(name.to_string()))
    }

    pub fn transformation(&self, node: Entity) -> Result<Mat4, SceneError> {
        self.world
            .get::<&Transformation>(node)
            .map(|t| t.0)
            .map_err(|_| SceneError::NodeNotFound(node))
    }

    pub fn set_transformation(&mut self, node: Entity, m: Mat4) -> Result<(), SceneError> {
        self.update_transformation(node, |t| *t = m)
    }

    /// Edits the local transform of `node` in place.
    pub fn update_transformation(
        &mut self,
        node: Entity,
        f: impl FnOnce(&mut Mat4),
    ) -> Result<(), SceneError> {
        let mut t = self
            .world
            .get::<&mut Transformation>(node)
            .map_err(|_| SceneError::NodeNotFound(node))?;
        f(&mut t.0);
        Ok(())
    }

    fn is_ancestor(&self, ancestor: Entity, node: Entity) -> Result<bool, SceneError> {
        let mut current = self.parent(node)?;
        while let Some(p) = current {
            if p == ancestor {
                return Ok(true);
            }
            current = self.parent(p)?;
        }
        Ok(false)
    }

    /// Maps `descendant`-local coordinates into `ancestor`-local space.
    ///
    /// The result is `T(a₁) · … · T(descendant)` where `a₁` is the child of
    /// `ancestor` on the path; the ancestor's own transform is not included.
    /// Returns identity when both handles are the same node.
    pub fn to_parent_transform(
        &self,
        ancestor: Entity,
        descendant: Entity,
    ) -> Result<Mat4, SceneError> {
        self.ensure(ancestor)?;
        self.ensure(descendant)?;
        if ancestor == descendant {
            return Ok(Mat4::IDENTITY);
        }

        let mut m = self.transformation(descendant)?;
        let mut current = descendant;
        loop {
            match self.parent(current)? {
                None => {
                    return Err(SceneError::NotADescendant {
                        ancestor,
                        descendant,
                    });
                }
                Some(p) if p == ancestor => return Ok(m),
                Some(p) => {
                    m = self.transformation(p)? * m;
                    current = p;
                }
            }
        }
    }

    /// Origin of `node` expressed in `root` space.
    pub fn world_position(&self, root: Entity, node: Entity) -> Result<Vec3, SceneError> {
        Ok(self
            .to_parent_transform(root, node)?
            .transform_point3(Vec3::ZERO))
    }

    /// Detaches `node` and despawns it together with its descendants.
    /// Returns the number of removed nodes.
    pub fn remove_subtree(&mut self, node: Entity) -> Result<usize, SceneError> {
        self.detach(node)?;
        let mut stack = vec![node];
        let mut removed = 0;
        while let Some(n) = stack.pop() {
            if let Ok(children) = self.children(n) {
                stack.extend(children);
            }
            if self.world.despawn(n).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Draws the subtree below `root` for one light pass.
    ///
    /// Traversal is depth-first pre-order with children in list order. Each
    /// drawable receives the product of all transforms from `root` (inclusive)
    /// down to its node.
    pub fn draw(
        &self,
        root: Entity,
        camera: &Camera,
        light_pass: usize,
        drawer: &mut impl DrawMesh,
    ) -> Result<(), RenderError> {
        self.draw_node(root, Mat4::IDENTITY, camera, light_pass, drawer)
    }

    fn draw_node(
        &self,
        node: Entity,
        parent_to_root: Mat4,
        camera: &Camera,
        light_pass: usize,
        drawer: &mut impl DrawMesh,
    ) -> Result<(), RenderError> {
        let model = parent_to_root * self.transformation(node)?;
        if let Some(mesh) = self.drawable(node)? {
            drawer.draw_mesh(mesh, model, camera, light_pass)?;
        }
        for child in self.children(node)? {
            self.draw_node(child, model, camera, light_pass, drawer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-5)
    }

    struct Recorder(Vec<(MeshId, Mat4)>);

    impl DrawMesh for Recorder {
        fn draw_mesh(
            &mut self,
            mesh: MeshId,
            model: Mat4,
            _: &Camera,
            _: usize,
        ) -> Result<(), RenderError> {
            self.0.push((mesh, model));
            Ok(())
        }
    }

    /// root -> a -> b -> c, plus root -> d
    fn chain() -> (SceneGraph, [Entity; 5], [Mat4; 5]) {
        let mats = [
            Mat4::from_translation(Vec3::new(9.0, 9.0, 9.0)),
            Mat4::from_rotation_translation(Quat::from_rotation_y(0.3), Vec3::X),
            Mat4::from_scale(Vec3::splat(2.0)),
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            Mat4::from_rotation_z(1.0),
        ];
        let mut g = SceneGraph::new();
        let nodes = mats.map(|m| g.create_node(None, m));
        let [root, a, b, c, d] = nodes;
        g.add_child(root, a).unwrap();
        g.add_child(a, b).unwrap();
        g.add_child(b, c).unwrap();
        g.add_child(root, d).unwrap();
        (g, nodes, mats)
    }

    #[test]
    fn to_parent_transform_excludes_ancestor() {
        let (g, [root, a, b, c, _], [_, ma, mb, mc, _]) = chain();
        assert!(approx(g.to_parent_transform(root, c).unwrap(), ma * mb * mc));
        assert!(approx(g.to_parent_transform(a, c).unwrap(), mb * mc));
        assert_eq!(g.to_parent_transform(c, c).unwrap(), Mat4::IDENTITY);
        assert!(approx(g.to_parent_transform(b, c).unwrap(), mc));
    }

    #[test]
    fn unrelated_nodes_are_not_descendants() {
        let (g, [_, a, _, c, d], _) = chain();
        assert_eq!(
            g.to_parent_transform(d, c),
            Err(SceneError::NotADescendant {
                ancestor: d,
                descendant: c
            })
        );
        assert!(g.to_parent_transform(c, a).is_err());
    }

    #[test]
    fn swapping_subtrees_leaves_other_nodes_alone() {
        let (mut g, [root, a, _, c, d], _) = chain();
        let e = g.create_node(None, Mat4::from_translation(Vec3::Z));
        g.add_child(d, e).unwrap();
        let before = g.to_parent_transform(root, c).unwrap();

        // swap the subtree order below root and move e under a different parent
        g.set_children(root, &[d, a]).unwrap();
        g.detach(e).unwrap();
        g.add_child(root, e).unwrap();

        assert_eq!(g.to_parent_transform(root, c).unwrap(), before);
    }

    #[test]
    fn cycles_and_double_parents_are_rejected() {
        let (mut g, [root, a, _, c, d], _) = chain();
        assert_eq!(g.add_child(c, a), Err(SceneError::AlreadyAttached(a)));
        g.detach(a).unwrap();
        assert_eq!(
            g.add_child(c, a),
            Err(SceneError::WouldCreateCycle { parent: c, child: a })
        );
        assert_eq!(g.add_child(d, d), Err(SceneError::AlreadyAttached(d)));
        let lone = g.create_node(None, Mat4::IDENTITY);
        assert_eq!(
            g.add_child(lone, lone),
            Err(SceneError::WouldCreateCycle { parent: lone, child: lone })
        );
        assert_eq!(g.children(root).unwrap(), vec![d]);
    }

    #[test]
    fn removed_nodes_fail_lookups() {
        let (mut g, [root, a, b, c, _], _) = chain();
        assert_eq!(g.remove_subtree(b).unwrap(), 2);
        assert_eq!(g.to_parent_transform(root, c), Err(SceneError::NodeNotFound(c)));
        assert_eq!(g.children(a).unwrap(), Vec::<Entity>::new());
        assert!(!g.contains(b));
    }

    #[test]
    fn draw_visits_in_pre_order_with_root_space_models() {
        let mut g = SceneGraph::new();
        let root = g.create_node(None, Mat4::IDENTITY);
        let first = g.create_node(Some(MeshId(1)), Mat4::from_translation(Vec3::X));
        let inner = g.create_node(Some(MeshId(2)), Mat4::from_translation(Vec3::Y));
        let second = g.create_node(Some(MeshId(3)), Mat4::IDENTITY);
        g.add_child(root, first).unwrap();
        g.add_child(first, inner).unwrap();
        g.add_child(root, second).unwrap();

        let mut rec = Recorder(Vec::new());
        g.draw(root, &Camera::default(), 0, &mut rec).unwrap();
        let order: Vec<_> = rec.0.iter().map(|(m, _)| *m).collect();
        assert_eq!(order, vec![MeshId(1), MeshId(2), MeshId(3)]);
        assert_eq!(rec.0[1].1.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn names_resolve_once() {
        let mut g = SceneGraph::new();
        let world = g.create_named("World", None, Mat4::IDENTITY);
        assert_eq!(g.find("World"), Ok(world));
        assert_eq!(g.find("Teapot"), Err(SceneError::UnknownName("Teapot".into())));
        assert_eq!(g.name(world).as_deref(), Some("World"));
    }

    #[test]
    fn world_position_of_nested_node() {
        let (g, [root, _, _, c, _], [_, ma, mb, mc, _]) = chain();
        let expected = (ma * mb * mc).transform_point3(Vec3::ZERO);
        assert!((g.world_position(root, c).unwrap() - expected).length() < 1e-5);
    }
}
