use glam::{Mat4, Vec3};

use super::{Key, Modifiers, Navigator, NodeRefs};
use crate::error::SceneError;
use crate::scene_graph::SceneGraph;

/// Steers a node across its local xz plane like a vehicle.
///
/// Up/down set the throttle, which accelerates or decelerates the forward
/// speed (clamped to `max_speed`). Left/right set the lateral rate, which
/// turns the heading. Each [`update`](Navigator::update) moves the node
/// forward by `speed * dt` along its own -z and turns it by
/// `lateral_rate * dt` about its own y.
///
/// Releasing a key zeroes that axis' input. The speed and the accumulated
/// heading persist; the lateral rate drops to zero with its key.
#[derive(Clone, Debug)]
pub struct PlaneNavigator {
    refs: NodeRefs,
    /// Speed change per second of full throttle.
    pub acceleration: f32,
    pub max_speed: f32,
    /// Heading change in radians per second of full steering.
    pub steer_rate: f32,
    throttle: f32,
    steer: f32,
    speed: f32,
    heading: f32,
}

impl PlaneNavigator {
    pub fn new(refs: NodeRefs) -> Self {
        Self {
            refs,
            acceleration: 1.0,
            max_speed: 2.0,
            steer_rate: 1.0,
            throttle: 0.0,
            steer: 0.0,
            speed: 0.0,
            heading: 0.0,
        }
    }

    /// Current forward speed.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Current turn rate in radians per second, positive to the left.
    pub fn lateral_rate(&self) -> f32 {
        -self.steer * self.steer_rate
    }

    /// Accumulated heading change in radians.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Throttle and steering inputs, each in `{-1, 0, 1}`.
    pub fn inputs(&self) -> (f32, f32) {
        (self.throttle, self.steer)
    }

    /// Drops all inputs and the speed. The heading is kept.
    pub fn stop(&mut self) {
        self.throttle = 0.0;
        self.steer = 0.0;
        self.speed = 0.0;
    }
}

impl Navigator for PlaneNavigator {
    fn refs(&self) -> NodeRefs {
        self.refs
    }

    fn key_press(
        &mut self,
        _graph: &mut SceneGraph,
        key: Key,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        match key.as_arrow() {
            Key::Up => self.throttle = 1.0,
            Key::Down => self.throttle = -1.0,
            Key::Left => self.steer = -1.0,
            Key::Right => self.steer = 1.0,
            _ => return Ok(false),
        }
        Ok(false)
    }

    fn key_release(
        &mut self,
        _graph: &mut SceneGraph,
        key: Key,
        _mods: Modifiers,
    ) -> Result<bool, SceneError> {
        match key.as_arrow() {
            Key::Up | Key::Down => self.throttle = 0.0,
            Key::Left | Key::Right => self.steer = 0.0,
            _ => {}
        }
        Ok(false)
    }

    fn update(&mut self, graph: &mut SceneGraph, dt: f32) -> Result<bool, SceneError> {
        self.refs.check(graph)?;
        self.speed = (self.speed + self.throttle * self.acceleration * dt)
            .clamp(-self.max_speed, self.max_speed);
        let turn = self.lateral_rate() * dt;
        self.heading += turn;

        let forward = self.speed * dt;
        if forward == 0.0 && turn == 0.0 {
            return Ok(false);
        }
        let step = Mat4::from_translation(Vec3::new(0.0, 0.0, -forward));
        graph.update_transformation(self.refs.node, |t| {
            *t = *t * step * Mat4::from_rotation_y(turn);
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SceneGraph, PlaneNavigator) {
        let mut graph = SceneGraph::new();
        let world = graph.create_node(None, Mat4::IDENTITY);
        let node = graph.create_node(None, Mat4::IDENTITY);
        let camera = graph.create_node(None, Mat4::IDENTITY);
        graph.add_child(world, node).unwrap();
        graph.add_child(world, camera).unwrap();
        (graph, PlaneNavigator::new(NodeRefs::new(node, world, camera)))
    }

    fn run(graph: &mut SceneGraph, nav: &mut PlaneNavigator, seconds: f32) {
        let dt = 0.125;
        for _ in 0..(seconds / dt) as usize {
            nav.update(graph, dt).unwrap();
        }
    }

    #[test]
    fn speed_is_clamped_to_max() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 10.0);
        assert_eq!(nav.speed(), nav.max_speed);
    }

    #[test]
    fn straight_ahead_moves_along_negative_z() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 1.0);
        nav.key_release(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        let p = graph.world_position(nav.refs().world, nav.refs().node).unwrap();
        assert!(p.z < 0.0);
        assert!(p.x.abs() < 1e-6);
    }

    #[test]
    fn steering_turns_and_release_keeps_heading() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Left, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 0.5);
        assert_eq!(nav.lateral_rate(), 1.0);
        nav.key_release(&mut graph, Key::Left, Modifiers::NONE).unwrap();
        assert_eq!(nav.lateral_rate(), 0.0);
        assert!(!nav.update(&mut graph, 0.125).unwrap());
        assert!((nav.heading() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn speed_persists_after_releasing_throttle() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 1.0);
        nav.key_release(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        assert_eq!(nav.inputs(), (0.0, 0.0));

        let before = graph.world_position(nav.refs().world, nav.refs().node).unwrap();
        run(&mut graph, &mut nav, 1.0);
        assert_eq!(nav.speed(), 1.0);
        let after = graph.world_position(nav.refs().world, nav.refs().node).unwrap();
        assert!((before.z - after.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn opposite_throttle_slows_to_zero_then_reverses() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 1.0);
        nav.key_press(&mut graph, Key::Down, Modifiers::NONE).unwrap();
        assert_eq!(nav.inputs().0, -1.0);

        run(&mut graph, &mut nav, 1.0);
        assert_eq!(nav.speed(), 0.0);
        run(&mut graph, &mut nav, 0.5);
        assert_eq!(nav.speed(), -0.5);
    }

    #[test]
    fn opposite_steering_reverses_then_release_zeroes() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Left, Modifiers::NONE).unwrap();
        assert_eq!(nav.lateral_rate(), 1.0);
        nav.key_press(&mut graph, Key::Right, Modifiers::NONE).unwrap();
        assert_eq!(nav.lateral_rate(), -1.0);
        run(&mut graph, &mut nav, 0.5);
        nav.key_release(&mut graph, Key::Left, Modifiers::NONE).unwrap();
        assert_eq!(nav.lateral_rate(), 0.0);
        assert!((nav.heading() + 0.5).abs() < 1e-6);
    }

    #[test]
    fn removed_node_leaves_motion_state_alone() {
        let (mut graph, mut nav) = setup();
        nav.key_press(&mut graph, Key::Up, Modifiers::NONE).unwrap();
        nav.key_press(&mut graph, Key::Left, Modifiers::NONE).unwrap();
        run(&mut graph, &mut nav, 0.5);
        let (speed, heading) = (nav.speed(), nav.heading());

        graph.remove_subtree(nav.refs().node).unwrap();
        assert_eq!(
            nav.update(&mut graph, 0.125),
            Err(SceneError::NodeNotFound(nav.refs().node))
        );
        assert_eq!(nav.speed(), speed);
        assert_eq!(nav.heading(), heading);
    }
}
