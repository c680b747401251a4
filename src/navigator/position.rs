use glam::{Mat4, Vec3};

use super::{Key, Modifiers, Navigator, NodeRefs};
use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Axes the position navigator moves along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Frame {
    /// Screen right / up / towards the viewer.
    #[default]
    Camera,
    /// World x / y / z.
    World,
}

/// Translates a node with the arrow keys (or WSAD).
///
/// Left/right move along x, up/down along y. With shift held, up/down move
/// along the depth axis instead (up goes away from the viewer).
#[derive(Clone, Debug)]
pub struct PositionNavigator {
    refs: NodeRefs,
    pub frame: Frame,
    /// Distance per key press.
    pub step: f32,
}

impl PositionNavigator {
    pub fn new(refs: NodeRefs, frame: Frame) -> Self {
        Self {
            refs,
            frame,
            step: 0.1,
        }
    }

    /// Direction of `key` in the navigator's frame, if it is a movement key.
    fn direction(key: Key, mods: Modifiers) -> Option<Vec3> {
        let dir = match (key.as_arrow(), mods.shift) {
            (Key::Left, _) => Vec3::NEG_X,
            (Key::Right, _) => Vec3::X,
            (Key::Up, false) => Vec3::Y,
            (Key::Down, false) => Vec3::NEG_Y,
            (Key::Up, true) => Vec3::NEG_Z,
            (Key::Down, true) => Vec3::Z,
            _ => return None,
        };
        Some(dir)
    }

    /// Moves the node by `offset` given in the navigator's frame.
    pub fn translate(&self, graph: &mut SceneGraph, offset: Vec3) -> Result<(), SceneError> {
        let basis = match self.frame {
            Frame::Camera => self.refs.camera,
            Frame::World => self.refs.world,
        };
        let to_parent = self.refs.to_node_parent(graph, basis)?;
        let offset = to_parent.transform_vector3(offset);
        graph.update_transformation(self.refs.node, |t| {
            *t = Mat4::from_translation(offset) * *t;
        })
    }
}

impl Navigator for PositionNavigator {
    fn refs(&self) -> NodeRefs {
        self.refs
    }

    fn key_press(
        &mut self,
        graph: &mut SceneGraph,
        key: Key,
        mods: Modifiers,
    ) -> Result<bool, SceneError> {
        let Some(dir) = Self::direction(key, mods) else {
            return Ok(false);
        };
        self.translate(graph, dir * self.step)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(frame: Frame) -> (SceneGraph, PositionNavigator) {
        let mut graph = SceneGraph::new();
        let world = graph.create_node(None, Mat4::IDENTITY);
        let node = graph.create_node(None, Mat4::from_rotation_z(1.0));
        // camera looking down the world x axis
        let camera = graph.create_node(None, Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2));
        graph.add_child(world, node).unwrap();
        graph.add_child(world, camera).unwrap();
        (graph, PositionNavigator::new(NodeRefs::new(node, world, camera), frame))
    }

    fn position(graph: &SceneGraph, nav: &PositionNavigator) -> Vec3 {
        graph.world_position(nav.refs().world, nav.refs().node).unwrap()
    }

    #[test]
    fn camera_frame_follows_camera_axes() {
        let (mut graph, mut nav) = setup(Frame::Camera);
        assert!(nav.key_press(&mut graph, Key::Right, Modifiers::NONE).unwrap());
        // camera x is world -z
        assert!((position(&graph, &nav) - Vec3::new(0.0, 0.0, -0.1)).length() < 1e-6);
        nav.key_press(&mut graph, Key::W, Modifiers::SHIFT).unwrap();
        assert!((position(&graph, &nav) - Vec3::new(-0.1, 0.0, -0.1)).length() < 1e-6);
    }

    #[test]
    fn world_frame_ignores_camera_and_node_orientation() {
        let (mut graph, mut nav) = setup(Frame::World);
        nav.key_press(&mut graph, Key::D, Modifiers::NONE).unwrap();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        assert!((position(&graph, &nav) - Vec3::new(0.1, 0.1, 0.0)).length() < 1e-6);
        // orientation untouched
        let t = graph.transformation(nav.refs().node).unwrap();
        let expected = Mat4::from_rotation_z(1.0).transform_vector3(Vec3::X);
        assert!((t.transform_vector3(Vec3::X) - expected).length() < 1e-6);
    }

    #[test]
    fn other_keys_do_nothing() {
        let (mut graph, mut nav) = setup(Frame::World);
        assert!(!nav.key_release(&mut graph, Key::Up, Modifiers::NONE).unwrap());
        assert_eq!(position(&graph, &nav), Vec3::ZERO);
    }
}
