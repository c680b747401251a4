//! Input-to-transform navigators.
//!
//! A navigator edits the local transformation of one target node in response
//! to key and pointer events. Movement directions are given in the camera's
//! (or the world's) frame and converted into the node's frame through the
//! scene graph at the moment of the event, never cached, so the result stays
//! correct while other navigators move the camera or the node's ancestors.
//!
//! Navigators hold plain [`Entity`] handles ([`NodeRefs`]). Once a referenced
//! node has been removed from the graph, every event that needs it fails with
//! [`SceneError::NodeNotFound`] and leaves the graph untouched.
//!
//! Every handler returns whether the graph changed, so the caller knows when
//! to request a redraw.

mod plane;
mod position;
mod rotate_y;
mod trackball;

pub use plane::PlaneNavigator;
pub use position::{Frame, PositionNavigator};
pub use rotate_y::RotateYNavigator;
pub use trackball::ModelTrackball;

use glam::{Mat4, Vec2};
use hecs::Entity;

use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Keys navigators react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
}

impl Key {
    /// Arrow key with the same meaning, WSAD mapping onto the arrows.
    pub fn as_arrow(self) -> Key {
        match self {
            Key::W => Key::Up,
            Key::S => Key::Down,
            Key::A => Key::Left,
            Key::D => Key::Right,
            arrow => arrow,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        alt: false,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer state carried by mouse events. `position` is in window pixels,
/// top-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pointer {
    pub position: Vec2,
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

impl Pointer {
    pub fn new(position: Vec2, button: Option<MouseButton>, modifiers: Modifiers) -> Self {
        Self {
            position,
            button,
            modifiers,
        }
    }
}

/// A single input event routed to navigators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    KeyPress(Key, Modifiers),
    KeyRelease(Key, Modifiers),
    MousePress(Pointer),
    MouseMove(Pointer),
    MouseRelease(Pointer),
    /// Scroll in lines, positive away from the user.
    Wheel(f32, Modifiers),
}

/// Non-owning references to the nodes a navigator works with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRefs {
    /// The node whose transformation is edited.
    pub node: Entity,
    /// Root the other transforms are resolved against.
    pub world: Entity,
    /// Node the camera is attached to.
    pub camera: Entity,
}

impl NodeRefs {
    pub fn new(node: Entity, world: Entity, camera: Entity) -> Self {
        Self {
            node,
            world,
            camera,
        }
    }

    /// Maps camera coordinates into the node's local coordinates.
    pub fn camera_to_node(&self, graph: &SceneGraph) -> Result<Mat4, SceneError> {
        let camera_to_world = graph.to_parent_transform(self.world, self.camera)?;
        let node_to_world = graph.to_parent_transform(self.world, self.node)?;
        Ok(node_to_world.inverse() * camera_to_world)
    }

    /// Maps `from`'s coordinates into the coordinates the node's
    /// transformation is expressed in (its parent's frame).
    pub fn to_node_parent(&self, graph: &SceneGraph, from: Entity) -> Result<Mat4, SceneError> {
        let from_to_world = graph.to_parent_transform(self.world, from)?;
        let parent_to_world = match graph.parent(self.node)? {
            Some(parent) => graph.to_parent_transform(self.world, parent)?,
            None => Mat4::IDENTITY,
        };
        Ok(parent_to_world.inverse() * from_to_world)
    }

    /// Fails if any referenced node is gone.
    pub fn check(&self, graph: &SceneGraph) -> Result<(), SceneError> {
        for node in [self.node, self.world, self.camera] {
            if !graph.contains(node) {
                return Err(SceneError::NodeNotFound(node));
            }
        }
        Ok(())
    }
}

/// Turns input events into edits of a target node's transformation.
///
/// All handlers default to doing nothing and reporting no change.
pub trait Navigator {
    fn refs(&self) -> NodeRefs;

    fn key_press(
        &mut self,
        _graph: &mut SceneGraph,
        _key: Key,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    fn key_release(
        &mut self,
        _graph: &mut SceneGraph,
        _key: Key,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    fn mouse_press(
        &mut self,
        _graph: &mut SceneGraph,
        _pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    fn mouse_move(
        &mut self,
        _graph: &mut SceneGraph,
        _pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    fn mouse_release(
        &mut self,
        _graph: &mut SceneGraph,
        _pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    fn wheel(
        &mut self,
        _graph: &mut SceneGraph,
        _delta: f32,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        Ok(false)
    }

    /// Advances continuous motion by `dt` seconds.
    fn update(&mut self, _graph: &mut SceneGraph, _dt: f32) -> Result<bool, SceneError> {
        Ok(false)
    }

    /// Routes `event` to the matching handler.
    fn handle(&mut self, graph: &mut SceneGraph, event: &InputEvent) -> Result<bool, SceneError> {
        match event {
            InputEvent::KeyPress(key, mods) => self.key_press(graph, *key, *mods),
            InputEvent::KeyRelease(key, mods) => self.key_release(graph, *key, *mods),
            InputEvent::MousePress(pointer) => self.mouse_press(graph, pointer),
            InputEvent::MouseMove(pointer) => self.mouse_move(graph, pointer),
            InputEvent::MouseRelease(pointer) => self.mouse_release(graph, pointer),
            InputEvent::Wheel(delta, mods) => self.wheel(graph, *delta, *mods),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn camera_to_node_follows_the_current_graph() {
        let mut graph = SceneGraph::new();
        let world = graph.create_node(None, Mat4::IDENTITY);
        let node = graph.create_node(None, Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let camera = graph.create_node(None, Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)));
        graph.add_child(world, node).unwrap();
        graph.add_child(world, camera).unwrap();
        let refs = NodeRefs::new(node, world, camera);

        // camera x axis seen from a node turned a quarter around y
        let x = refs.camera_to_node(&graph).unwrap() * Vec4::X;
        assert!((x - Vec4::new(0.0, 0.0, 1.0, 0.0)).length() < 1e-5);

        graph.set_transformation(node, Mat4::IDENTITY).unwrap();
        let x = refs.camera_to_node(&graph).unwrap() * Vec4::X;
        assert!((x - Vec4::X).length() < 1e-5);
    }

    #[test]
    fn removed_nodes_fail_resolution() {
        let mut graph = SceneGraph::new();
        let world = graph.create_node(None, Mat4::IDENTITY);
        let node = graph.create_node(None, Mat4::IDENTITY);
        let camera = graph.create_node(None, Mat4::IDENTITY);
        graph.add_child(world, node).unwrap();
        graph.add_child(world, camera).unwrap();
        let refs = NodeRefs::new(node, world, camera);
        graph.remove_subtree(camera).unwrap();

        assert_eq!(refs.check(&graph), Err(SceneError::NodeNotFound(camera)));
        assert_eq!(
            refs.camera_to_node(&graph),
            Err(SceneError::NodeNotFound(camera))
        );
    }
}
