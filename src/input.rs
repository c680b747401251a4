//! Translates window events into scene [`Command`]s.
//!
//! Arrow and WSAD keys and the mouse go to the navigators. Letter and digit
//! shortcuts stand in for the control panel: each produces the [`Param`] the
//! panel would emit, computed from the panel's current values.

use glam::Vec2;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

use crate::material::VectorKind;
use crate::navigator::{InputEvent, Key, Modifiers, MouseButton, Pointer};
use crate::scene::{Command, Controls, Model, Param, PostChain, Surface};

/// Cursor and modifier state needed to build pointer events.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputState {
    cursor: Vec2,
    button: Option<MouseButton>,
    modifiers: Modifiers,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Maps one window event to a command, if it means anything.
    pub fn translate(&mut self, event: &WindowEvent, controls: &Controls) -> Option<Command> {
        match event {
            WindowEvent::ModifiersChanged(mods) => {
                self.modifiers = modifiers(mods.state());
                None
            }
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return None;
                };
                let pressed = event.state == ElementState::Pressed;
                if let Some(key) = nav_key(code) {
                    let event = if pressed {
                        InputEvent::KeyPress(key, self.modifiers)
                    } else {
                        InputEvent::KeyRelease(key, self.modifiers)
                    };
                    return Some(Command::Navigate(event));
                }
                if !pressed || event.repeat {
                    return None;
                }
                match code {
                    KeyCode::Escape | KeyCode::KeyQ => Some(Command::Quit),
                    KeyCode::KeyH => Some(Command::ToggleUi),
                    _ => shortcut(code, self.modifiers, controls).map(Command::Set),
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(Command::Navigate(InputEvent::MouseMove(self.pointer())))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = mouse_button(*button)?;
                match state {
                    ElementState::Pressed => {
                        self.button = Some(button);
                        Some(Command::Navigate(InputEvent::MousePress(self.pointer())))
                    }
                    ElementState::Released => {
                        // the release still names the button that was let go
                        let pointer = Pointer::new(self.cursor, Some(button), self.modifiers);
                        self.button = None;
                        Some(Command::Navigate(InputEvent::MouseRelease(pointer)))
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                Some(Command::Navigate(InputEvent::Wheel(lines, self.modifiers)))
            }
            _ => None,
        }
    }

    fn pointer(&self) -> Pointer {
        Pointer::new(self.cursor, self.button, self.modifiers)
    }
}

fn modifiers(state: ModifiersState) -> Modifiers {
    Modifiers {
        shift: state.shift_key(),
        alt: state.alt_key(),
    }
}

fn mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Left),
        winit::event::MouseButton::Right => Some(MouseButton::Right),
        winit::event::MouseButton::Middle => Some(MouseButton::Middle),
        _ => None,
    }
}

/// Navigator key for `code`.
pub fn nav_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        _ => None,
    }
}

/// Parameter change bound to `code`, derived from the current control values.
///
/// | key | effect |
/// |-----|--------|
/// | 1-4 | show cube, sphere, torus, plane |
/// | M   | next surface for the shown model |
/// | F   | next post filter |
/// | P   | split display |
/// | B   | skybox |
/// | E   | environment mapping |
/// | J   | kernel jitter |
/// | O   | buffer export |
/// | G   | wireframe overlay |
/// | N   | bump mapping |
/// | X   | displacement mapping |
/// | V   | next vector overlay (none, normals, tangents, bitangents) |
/// | Space | animation |
/// | T   | flight mode |
/// | + - | kernel size (with shift: first light intensity) |
pub fn shortcut(code: KeyCode, mods: Modifiers, controls: &Controls) -> Option<Param> {
    let model = match controls.current(&Param::SceneModel(Model::Sphere)) {
        Some(Param::SceneModel(model)) => model,
        _ => Model::Sphere,
    };
    let toggle = |param: Param| match controls.current(&param) {
        Some(Param::SplitDisplay(on)) => Some(Param::SplitDisplay(!on)),
        Some(Param::SkyBox(on)) => Some(Param::SkyBox(!on)),
        Some(Param::EnvironmentMapping(on)) => Some(Param::EnvironmentMapping(!on)),
        Some(Param::Jitter(on)) => Some(Param::Jitter(!on)),
        Some(Param::FboPreview(on)) => Some(Param::FboPreview(!on)),
        Some(Param::Animation(on)) => Some(Param::Animation(!on)),
        Some(Param::Flight(on)) => Some(Param::Flight(!on)),
        Some(Param::Wireframe(on)) => Some(Param::Wireframe(!on)),
        Some(Param::BumpMapping(on)) => Some(Param::BumpMapping(!on)),
        Some(Param::DisplacementMapping(on)) => Some(Param::DisplacementMapping(!on)),
        // never set yet: the control starts off
        _ => Some(param),
    };

    match code {
        KeyCode::Digit1 => Some(Param::SceneModel(Model::Cube)),
        KeyCode::Digit2 => Some(Param::SceneModel(Model::Sphere)),
        KeyCode::Digit3 => Some(Param::SceneModel(Model::Torus)),
        KeyCode::Digit4 => Some(Param::SceneModel(Model::Plane)),
        KeyCode::KeyM => {
            let surface = match controls.current(&Param::Material {
                model,
                surface: Surface::Phong,
            }) {
                Some(Param::Material { surface, .. }) => surface,
                _ => Surface::Phong,
            };
            Some(Param::Material {
                model,
                surface: next(&Surface::ALL, surface),
            })
        }
        KeyCode::KeyF => {
            let chain = match controls.current(&Param::PostFilter(PostChain::default())) {
                Some(Param::PostFilter(chain)) => chain,
                _ => PostChain::default(),
            };
            Some(Param::PostFilter(next(&PostChain::ALL, chain)))
        }
        KeyCode::KeyP => toggle(Param::SplitDisplay(true)),
        KeyCode::KeyB => toggle(Param::SkyBox(true)),
        KeyCode::KeyE => toggle(Param::EnvironmentMapping(true)),
        KeyCode::KeyJ => toggle(Param::Jitter(true)),
        KeyCode::KeyO => toggle(Param::FboPreview(true)),
        KeyCode::Space => toggle(Param::Animation(true)),
        KeyCode::KeyT => toggle(Param::Flight(true)),
        KeyCode::KeyG => toggle(Param::Wireframe(true)),
        KeyCode::KeyN => toggle(Param::BumpMapping(true)),
        KeyCode::KeyX => toggle(Param::DisplacementMapping(true)),
        KeyCode::KeyV => {
            let index = match controls.current(&Param::VisualizeVectors(None)) {
                Some(Param::VisualizeVectors(kind)) => kind.map_or(0, VectorKind::index),
                _ => 0,
            };
            Some(Param::VisualizeVectors(VectorKind::from_index((index + 1) % 4)))
        }
        KeyCode::Equal | KeyCode::NumpadAdd => step(controls, mods, 1),
        KeyCode::Minus | KeyCode::NumpadSubtract => step(controls, mods, -1),
        _ => None,
    }
}

fn step(controls: &Controls, mods: Modifiers, direction: i32) -> Option<Param> {
    if mods.shift {
        let value = match controls.current(&Param::LightIntensity { light: 0, value: 0.0 }) {
            Some(Param::LightIntensity { value, .. }) => value,
            _ => 0.0,
        };
        let value = (value + 0.1 * direction as f32).clamp(0.0, 1.0);
        return Some(Param::LightIntensity { light: 0, value });
    }
    let size = match controls.current(&Param::KernelSize(1)) {
        Some(Param::KernelSize(size)) => size as i32,
        _ => 1,
    };
    // odd sizes keep the kernel centred
    Some(Param::KernelSize((size + 2 * direction).clamp(1, 31) as u32))
}

fn next<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let index = all.iter().position(|&v| v == current).unwrap_or(0);
    all[(index + 1) % all.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsad_and_arrows_go_to_the_navigators() {
        assert_eq!(nav_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(nav_key(KeyCode::ArrowLeft), Some(Key::Left));
        assert_eq!(nav_key(KeyCode::KeyM), None);
    }

    #[test]
    fn toggles_invert_the_current_value() {
        let mut controls = Controls::demo(2);
        assert_eq!(
            shortcut(KeyCode::KeyP, Modifiers::NONE, &controls),
            Some(Param::SplitDisplay(false))
        );
        controls.set(Param::SplitDisplay(false));
        assert_eq!(
            shortcut(KeyCode::KeyP, Modifiers::NONE, &controls),
            Some(Param::SplitDisplay(true))
        );
        assert_eq!(
            shortcut(KeyCode::Space, Modifiers::NONE, &controls),
            Some(Param::Animation(false))
        );
    }

    #[test]
    fn surface_cycle_targets_the_shown_model() {
        let mut controls = Controls::demo(1);
        controls.set(Param::SceneModel(Model::Torus));
        // the torus starts toon shaded
        assert_eq!(
            shortcut(KeyCode::KeyM, Modifiers::NONE, &controls),
            Some(Param::Material {
                model: Model::Torus,
                surface: Surface::Dots,
            })
        );
    }

    #[test]
    fn filter_cycle_wraps_around() {
        let mut controls = Controls::demo(1);
        controls.set(Param::PostFilter(PostChain::MotionBlur));
        assert_eq!(
            shortcut(KeyCode::KeyF, Modifiers::NONE, &controls),
            Some(Param::PostFilter(PostChain::Passthrough))
        );
    }

    #[test]
    fn vector_overlay_cycles_through_none() {
        let mut controls = Controls::demo(1);
        assert_eq!(
            shortcut(KeyCode::KeyV, Modifiers::NONE, &controls),
            Some(Param::VisualizeVectors(Some(VectorKind::Normal)))
        );
        controls.set(Param::VisualizeVectors(Some(VectorKind::Bitangent)));
        assert_eq!(
            shortcut(KeyCode::KeyV, Modifiers::NONE, &controls),
            Some(Param::VisualizeVectors(None))
        );
        assert_eq!(
            shortcut(KeyCode::KeyG, Modifiers::NONE, &controls),
            Some(Param::Wireframe(true))
        );
    }

    #[test]
    fn plus_and_minus_step_kernel_or_light() {
        let controls = Controls::demo(2);
        assert_eq!(
            shortcut(KeyCode::Equal, Modifiers::NONE, &controls),
            Some(Param::KernelSize(7))
        );
        assert_eq!(
            shortcut(KeyCode::Minus, Modifiers::NONE, &controls),
            Some(Param::KernelSize(3))
        );
        match shortcut(KeyCode::Minus, Modifiers::SHIFT, &controls) {
            Some(Param::LightIntensity { light: 0, value }) => assert!((value - 0.7).abs() < 1e-6),
            other => panic!("unexpected {:?}", other),
        }
    }
}
