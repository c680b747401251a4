use glam::{Mat4, Vec2, Vec3, Vec4};

use super::{Modifiers, MouseButton, Navigator, NodeRefs, Pointer};
use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Rotates and pans a model with the mouse.
///
/// Left-drag rotates the node about the camera's horizontal and vertical
/// axes, both expressed in the node's own frame, so the model turns the way
/// the pointer moves no matter how node and camera are oriented.
/// Shift-drag pans in the screen plane and the wheel dollies along the view
/// direction.
#[derive(Clone, Debug)]
pub struct ModelTrackball {
    refs: NodeRefs,
    /// Radians per pixel of drag.
    pub rotation_sensitivity: f32,
    /// Camera units per pixel of drag.
    pub pan_sensitivity: f32,
    /// Camera units per wheel line.
    pub dolly_sensitivity: f32,
    last: Option<Vec2>,
}

impl ModelTrackball {
    pub fn new(refs: NodeRefs) -> Self {
        Self {
            refs,
            rotation_sensitivity: 15f32.to_radians().to_radians(),
            pan_sensitivity: 0.003,
            dolly_sensitivity: 0.1,
            last: None,
        }
    }

    /// Rotates by `xy.y` radians about the camera x axis, then by `xy.x` about
    /// the camera y axis.
    pub fn rotate(&self, graph: &mut SceneGraph, xy: Vec2) -> Result<(), SceneError> {
        let camera_to_node = self.refs.camera_to_node(graph)?;
        let x_axis = (camera_to_node * Vec4::X).truncate().normalize_or(Vec3::X);
        let y_axis = (camera_to_node * Vec4::Y).truncate().normalize_or(Vec3::Y);
        graph.update_transformation(self.refs.node, |t| {
            *t = *t * Mat4::from_axis_angle(x_axis, xy.y) * Mat4::from_axis_angle(y_axis, xy.x);
        })
    }

    /// Moves the node by `translation_ec` given in camera coordinates.
    pub fn pan(&self, graph: &mut SceneGraph, translation_ec: Vec3) -> Result<(), SceneError> {
        let camera_to_node = self.refs.camera_to_node(graph)?;
        let translation = camera_to_node.transform_vector3(translation_ec);
        graph.update_transformation(self.refs.node, |t| {
            *t = *t * Mat4::from_translation(translation);
        })
    }
}

impl Navigator for ModelTrackball {
    fn refs(&self) -> NodeRefs {
        self.refs
    }

    fn mouse_press(
        &mut self,
        _graph: &mut SceneGraph,
        pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        if pointer.button == Some(MouseButton::Left) {
            self.last = Some(pointer.position);
        }
        Ok(false)
    }

    fn mouse_move(
        &mut self,
        graph: &mut SceneGraph,
        pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        let Some(last) = self.last else {
            return Ok(false);
        };
        let delta = pointer.position - last;
        self.last = Some(pointer.position);
        if delta == Vec2::ZERO {
            return Ok(false);
        }

        if pointer.modifiers.shift {
            let screen = Vec3::new(delta.x, -delta.y, 0.0);
            self.pan(graph, screen * self.pan_sensitivity)?;
        } else {
            self.rotate(graph, delta * self.rotation_sensitivity)?;
        }
        Ok(true)
    }

    fn mouse_release(
        &mut self,
        _graph: &mut SceneGraph,
        _pointer: &Pointer,
    ) -> Result<bool, SceneError> {
        self.last = None;
        Ok(false)
    }

    fn wheel(
        &mut self,
        graph: &mut SceneGraph,
        delta: f32,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        if delta == 0.0 {
            return Ok(false);
        }
        // towards the camera for positive scroll
        self.pan(graph, Vec3::new(0.0, 0.0, delta * self.dolly_sensitivity))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::InputEvent;

    fn setup(node_transform: Mat4) -> (SceneGraph, ModelTrackball) {
        let mut graph = SceneGraph::new();
        let world = graph.create_node(None, Mat4::IDENTITY);
        let node = graph.create_node(None, node_transform);
        let camera = graph.create_node(None, Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)));
        graph.add_child(world, node).unwrap();
        graph.add_child(world, camera).unwrap();
        (graph, ModelTrackball::new(NodeRefs::new(node, world, camera)))
    }

    fn left(at: Vec2, mods: Modifiers) -> Pointer {
        Pointer::new(at, Some(MouseButton::Left), mods)
    }

    fn drag(graph: &mut SceneGraph, nav: &mut ModelTrackball, to: Vec2, mods: Modifiers) -> bool {
        nav.handle(graph, &InputEvent::MousePress(left(Vec2::ZERO, mods)))
            .unwrap();
        let moved = nav.handle(graph, &InputEvent::MouseMove(left(to, mods))).unwrap();
        nav.handle(graph, &InputEvent::MouseRelease(Pointer::new(to, None, mods)))
            .unwrap();
        moved
    }

    #[test]
    fn shift_drag_pans_in_screen_plane() {
        let (mut graph, mut nav) = setup(Mat4::from_scale(Vec3::splat(0.5)));
        assert!(drag(&mut graph, &mut nav, Vec2::new(100.0, 50.0), Modifiers::SHIFT));
        let origin = graph.world_position(nav.refs().world, nav.refs().node).unwrap();
        // world displacement equals the camera-space one, scale notwithstanding
        assert!((origin - Vec3::new(0.3, -0.15, 0.0)).length() < 1e-5);
    }

    #[test]
    fn horizontal_drag_turns_about_screen_up() {
        let (mut graph, mut nav) = setup(Mat4::from_rotation_x(0.7));
        nav.rotation_sensitivity = 0.01;
        drag(&mut graph, &mut nav, Vec2::new(50.0, 0.0), Modifiers::NONE);
        let t = graph.transformation(nav.refs().node).unwrap();
        let expected = Mat4::from_rotation_y(0.5) * Mat4::from_rotation_x(0.7);
        assert!(t.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn moves_without_button_are_ignored() {
        let (mut graph, mut nav) = setup(Mat4::IDENTITY);
        let moved = nav
            .mouse_move(&mut graph, &Pointer::new(Vec2::new(9.0, 9.0), None, Modifiers::NONE))
            .unwrap();
        assert!(!moved);
        assert_eq!(graph.transformation(nav.refs().node).unwrap(), Mat4::IDENTITY);
    }

    #[test]
    fn removed_camera_fails_cleanly() {
        let (mut graph, mut nav) = setup(Mat4::IDENTITY);
        let camera = nav.refs().camera;
        graph.remove_subtree(camera).unwrap();
        nav.mouse_press(&mut graph, &left(Vec2::ZERO, Modifiers::NONE))
            .unwrap();
        let err = nav.mouse_move(&mut graph, &left(Vec2::ONE, Modifiers::NONE)).unwrap_err();
        assert_eq!(err, SceneError::NodeNotFound(camera));
        assert_eq!(graph.transformation(nav.refs().node).unwrap(), Mat4::IDENTITY);
    }
}
