use glam::{Mat4, Vec3};

use super::{Key, Modifiers, Navigator, NodeRefs};
use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Orbits a node around its parent's y axis at a fixed distance.
///
/// The node's transformation is rebuilt from two numbers on every change:
/// a rotation of `angle` about y, then a translation of `distance` along z.
/// Left/right turn the orbit, up/down move the node closer or further away.
/// With shift held the steps are five times larger.
#[derive(Clone, Debug)]
pub struct RotateYNavigator {
    refs: NodeRefs,
    angle: f32,
    distance: f32,
    /// Radians per key press.
    pub angle_step: f32,
    /// Distance change per key press.
    pub distance_step: f32,
    /// Closest the node may get to the orbit axis.
    pub min_distance: f32,
}

impl RotateYNavigator {
    pub fn new(refs: NodeRefs) -> Self {
        Self {
            refs,
            angle: 0.0,
            distance: 0.0,
            angle_step: 5f32.to_radians(),
            distance_step: 0.1,
            min_distance: 0.1,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Places the node `distance` away from the axis, keeping the angle.
    pub fn set_distance(
        &mut self,
        graph: &mut SceneGraph,
        distance: f32,
    ) -> Result<(), SceneError> {
        self.refs.check(graph)?;
        self.distance = distance.max(self.min_distance);
        self.apply(graph)
    }

    /// Orbit transformation for the current angle and distance.
    pub fn transformation(&self) -> Mat4 {
        Mat4::from_rotation_y(self.angle) * Mat4::from_translation(Vec3::Z * self.distance)
    }

    fn apply(&self, graph: &mut SceneGraph) -> Result<(), SceneError> {
        self.refs.check(graph)?;
        graph.set_transformation(self.refs.node, self.transformation())
    }
}

impl Navigator for RotateYNavigator {
    fn refs(&self) -> NodeRefs {
        self.refs
    }

    fn key_press(
        &mut self,
        graph: &mut SceneGraph,
        key: Key,
        mods: Modifiers,
    ) -> Result<bool, SceneError> {
        let boost = if mods.shift { 5.0 } else { 1.0 };
        let (angle, distance) = match key.as_arrow() {
            Key::Left => (self.angle - self.angle_step * boost, self.distance),
            Key::Right => (self.angle + self.angle_step * boost, self.distance),
            Key::Up => (self.angle, self.distance - self.distance_step * boost),
            Key::Down => (self.angle, self.distance + self.distance_step * boost),
            _ => return Ok(false),
        };
        self.refs.check(graph)?;
        self.angle = angle;
        self.distance = distance.max(self.min_distance);
        self.apply(graph)?;
        Ok(true)
    }
}
