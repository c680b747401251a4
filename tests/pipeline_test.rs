mod common;

use common::{Harness, STEP, assert_close, pixel, pixels};
use lightpass::error::MaterialError;
use lightpass::navigator::{InputEvent, Modifiers, MouseButton, Pointer};
use lightpass::scene::{Model, PostChain};
use lightpass::shader::gaussian_weights;
use lightpass::{Command, Param, Response, Vec2, Vec3, Vec4};

fn scene_with_lights(first: f32, second: f32) -> Option<Vec<Vec4>> {
    let mut h = Harness::new(24, 18)?;
    h.scene.apply_param(Param::PostFilter(PostChain::Passthrough)).unwrap();
    h.scene.apply_param(Param::Background(Vec3::ZERO)).unwrap();
    h.scene
        .apply_param(Param::LightIntensity { light: 0, value: first })
        .unwrap();
    h.scene
        .apply_param(Param::LightIntensity { light: 1, value: second })
        .unwrap();
    h.frame();
    Some(pixels(&h.buffer("scene")))
}

#[test]
fn light_passes_add_up() {
    let Some(both) = scene_with_lights(0.8, 0.4) else { return };
    let none = scene_with_lights(0.0, 0.0).unwrap();
    let first = scene_with_lights(0.8, 0.0).unwrap();
    let second = scene_with_lights(0.0, 0.4).unwrap();

    // each pass contributes independently of the others, up to rounding
    // and away from saturated pixels
    for i in 0..both.len() {
        if both[i].truncate().max_element() >= 1.0 - STEP {
            continue;
        }
        assert_close(both[i] + none[i], first[i] + second[i], 4.0 * STEP, "pixel sum");
    }
    assert!(
        both.iter().zip(&first).any(|(b, f)| (*b - *f).max_element() > 2.0 * STEP),
        "second light never showed up"
    );
}

#[test]
fn two_stage_gaussian_equals_the_2d_kernel() {
    let Some(mut h) = Harness::new(20, 16) else { return };
    h.scene.apply_param(Param::PostFilter(PostChain::Gauss)).unwrap();
    h.scene.apply_param(Param::KernelSize(5)).unwrap();
    h.scene.apply_param(Param::SplitDisplay(false)).unwrap();
    h.frame();

    let scene = h.buffer("scene");
    let filtered = h.buffer("post B");
    let weights = gaussian_weights(5);
    let radius = (weights.len() / 2) as i32;
    let (w, hgt) = (scene.width() as i32, scene.height() as i32);
    // the horizontal pass is stored in 8 bits before the vertical one runs

    for y in 0..hgt {
        for x in 0..w {
            let mut expected = Vec4::ZERO;
            for (j, wy) in weights.iter().enumerate() {
                for (i, wx) in weights.iter().enumerate() {
                    let sx = (x + i as i32 - radius).clamp(0, w - 1) as u32;
                    let sy = (y + j as i32 - radius).clamp(0, hgt - 1) as u32;
                    expected += wx * wy * pixel(&scene, sx, sy);
                }
            }
            let actual = pixel(&filtered, x as u32, y as u32);
            assert_close(actual, expected, 2.0 * STEP, "gauss");
        }
    }

    // without the split the screen shows the filtered image
    let screen = h.screen();
    assert_eq!(screen.get_pixel(3, 4), filtered.get_pixel(3, 4));
}

#[test]
fn split_screen_shows_both_images() {
    let Some(mut h) = Harness::new(21, 10) else { return };
    h.scene.apply_param(Param::PostFilter(PostChain::Blur)).unwrap();
    h.scene.apply_param(Param::KernelSize(7)).unwrap();
    h.frame();

    let scene = h.buffer("scene");
    let filtered = h.buffer("post A");
    let screen = h.screen();
    for y in 0..10 {
        for x in 0..21 {
            let expected = if x < 10 {
                scene.get_pixel(x, y)
            } else {
                filtered.get_pixel(x, y)
            };
            assert_eq!(screen.get_pixel(x, y), expected, "split at ({x}, {y})");
        }
    }
    // the blur differs from the scene somewhere, so both halves were drawn
    assert!(scene.pixels().zip(filtered.pixels()).any(|(a, b)| a != b));
}

#[test]
fn resize_recreates_targets_once() {
    let Some(mut h) = Harness::new(16, 16) else { return };
    h.scene.apply_param(Param::PostFilter(PostChain::Gauss)).unwrap();
    h.frame();
    assert_eq!(h.renderer.targets().stats().created, 3);

    h.resize(16, 16);
    h.frame();
    assert_eq!(h.renderer.targets().stats().created, 3);

    h.resize(30, 20);
    h.resize(30, 20);
    assert_eq!(h.renderer.targets().live_count(), 0);
    h.frame();
    h.frame();
    let stats = h.renderer.targets().stats();
    assert_eq!(stats.created, 6);
    assert_eq!(stats.deleted, 3);
    assert_eq!(h.screen().dimensions(), (30, 20));
    assert_eq!(h.buffer("scene").width(), 30);
}

#[test]
fn materials_reject_missing_light_passes() {
    let Some(h) = Harness::new(8, 8) else { return };
    let id = h.scene.current_material().unwrap();
    let material = h.scene.materials.get(id).unwrap();

    assert!(material.apply(1).is_ok());
    assert_eq!(
        material.apply(2),
        Err(MaterialError::LightPassOutOfRange { pass: 2, lights: 2 })
    );
}

#[test]
fn models_and_materials_switch_independently() {
    let Some(mut h) = Harness::new(12, 12) else { return };
    h.scene.apply_param(Param::SceneModel(Model::Torus)).unwrap();
    assert_eq!(
        h.scene.graph.children(h.scene.nodes.scene).unwrap(),
        vec![h.scene.models.node(Model::Torus)]
    );
    let torus_material = h.scene.current_material();

    h.scene.apply_param(Param::SceneModel(Model::Cube)).unwrap();
    h.scene.apply_param(Param::SceneModel(Model::Torus)).unwrap();
    assert_eq!(h.scene.current_material(), torus_material);
    h.frame();
}

#[test]
fn dragging_rotates_the_shown_model() {
    let Some(mut h) = Harness::new(12, 12) else { return };
    let parent = h.scene.nodes.scene;
    let before = h.scene.graph.transformation(parent).unwrap();

    let at = |x: f32| Pointer::new(Vec2::new(x, 5.0), Some(MouseButton::Left), Modifiers::NONE);
    h.scene
        .handle_input(Command::Navigate(InputEvent::MousePress(at(5.0))));
    let response = h
        .scene
        .handle_input(Command::Navigate(InputEvent::MouseMove(at(55.0))));
    assert_eq!(response, Response::Redraw);

    let after = h.scene.graph.transformation(parent).unwrap();
    assert!(!after.abs_diff_eq(before, 1e-6));
}

#[test]
fn frames_survive_a_removed_light() {
    let Some(mut h) = Harness::new(8, 8) else { return };
    let light = h.scene.nodes.lights[1];
    h.scene.graph.remove_subtree(light).unwrap();

    let result = h
        .renderer
        .draw_at(&h.gpu, &mut h.scene, &h.screen.output(), 0.0);
    assert!(result.is_err());
    assert_eq!(h.renderer.frame_count(), 0);
    // nothing was recorded, so the next frame starts clean
    h.scene.nodes.lights.truncate(1);
    h.frame();
}

#[test]
fn filters_keep_a_flat_image_flat() {
    let Some(mut h) = Harness::new(10, 6) else { return };
    h.scene.apply_param(Param::Background(Vec3::new(0.2, 0.6, 1.0))).unwrap();
    h.scene.graph.clear_children(h.scene.nodes.scene).unwrap();
    h.scene.apply_param(Param::KernelSize(7)).unwrap();
    h.frame();
    let flat = pixel(&h.buffer("scene"), 0, 0);

    for chain in PostChain::ALL {
        h.scene.apply_param(Param::PostFilter(chain)).unwrap();
        h.frame();
        let what = format!("{:?}", chain);
        for actual in pixels(&h.screen()) {
            assert_close(actual, flat, STEP, &what);
        }
    }
}

#[test]
fn wireframe_overlay_draws_lines_over_the_model() {
    let Some(mut h) = Harness::new(32, 32) else { return };
    h.scene.apply_param(Param::PostFilter(PostChain::Passthrough)).unwrap();
    h.scene.apply_param(Param::SceneModel(Model::Cube)).unwrap();
    h.frame();
    let plain = h.buffer("scene");

    h.scene.apply_param(Param::Wireframe(true)).unwrap();
    h.frame();
    let wired = h.buffer("scene");
    assert!(plain.pixels().zip(wired.pixels()).any(|(a, b)| a != b));
}
