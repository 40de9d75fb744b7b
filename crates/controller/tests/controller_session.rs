//! A full interaction session against a simulated controller model: grab,
//! fade, highlight, pulse, and a controller re-pairing mid-sequence.

use std::time::Duration;

use vrctl_common::{Color, EntityId};
use vrctl_controller::{ControllerActions, ControllerConfig, ControllerError};
use vrctl_input::{SimulatedDevices, TrackedIndex};
use vrctl_scene::{Material, Renderer, Scene, SceneEvent, Shader};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

struct Model {
    root: EntityId,
    body: EntityId,
    trigger: EntityId,
    trackpad: EntityId,
    button: EntityId,
    tip: EntityId,
}

fn build_model(scene: &mut Scene) -> Model {
    let root = scene.spawn("Controller (right)", None).unwrap();
    let model = scene.spawn("Model", Some(root)).unwrap();
    let shared = scene.add_material(Material::opaque(Color::rgba(0.2, 0.2, 0.2, 1.0)));
    let mut part = |name: &str| {
        let id = scene.spawn(name, Some(model)).unwrap();
        scene.set_renderer(id, Renderer::mesh(shared)).unwrap();
        id
    };
    let body = part("body");
    let trigger = part("trigger");
    let trackpad = part("trackpad");
    let button = part("button");
    part("lgrip");
    part("rgrip");
    let tip = scene.spawn("tip", Some(root)).unwrap();
    let tip_mat = scene.add_material(Material::default());
    scene.set_renderer(tip, Renderer::skinned(tip_mat)).unwrap();
    Model {
        root,
        body,
        trigger,
        trackpad,
        button,
        tip,
    }
}

#[test]
fn grab_hides_model_but_keeps_held_object() {
    let mut scene = Scene::new();
    let m = build_model(&mut scene);
    let mut c = ControllerActions::attach(
        &mut scene,
        m.root,
        TrackedIndex(2),
        ControllerConfig::default(),
    )
    .unwrap();

    let held = scene.spawn("sword", Some(m.root)).unwrap();
    let blade = scene.spawn("blade", Some(held)).unwrap();
    let steel = scene.add_material(Material::default());
    scene.set_renderer(held, Renderer::mesh(steel)).unwrap();
    scene.set_renderer(blade, Renderer::skinned(steel)).unwrap();

    c.set_model_visible(&mut scene, false, Some(held)).unwrap();
    for id in [m.body, m.trigger, m.trackpad, m.button, m.tip] {
        assert!(!scene.renderer(id).unwrap().enabled);
    }
    assert!(scene.renderer(held).unwrap().enabled);
    assert!(scene.renderer(blade).unwrap().enabled);

    let toggles = scene
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, SceneEvent::RendererToggled { enabled: false, .. }))
        .count();
    assert_eq!(toggles, 7);
}

#[test]
fn fade_reaches_shared_materials() {
    let mut scene = Scene::new();
    let m = build_model(&mut scene);
    let mut c =
        ControllerActions::attach(&mut scene, m.root, TrackedIndex(2), ControllerConfig::default())
            .unwrap();
    c.set_opacity(&mut scene, 0.4).unwrap();
    for id in [m.body, m.trigger, m.tip] {
        let mat = scene.material_of(id).unwrap();
        assert_eq!(mat.color.alpha(), 0.4);
        assert!(!mat.depth_write);
    }
}

#[test]
fn highlight_aliases_follow_interaction() {
    let mut scene = Scene::new();
    let m = build_model(&mut scene);
    let mut c =
        ControllerActions::attach(&mut scene, m.root, TrackedIndex(2), ControllerConfig::default())
            .unwrap();
    let untouched = scene.material_of(m.body).unwrap().clone();

    c.set_highlight_trigger(&mut scene, true, Color::YELLOW).unwrap();
    c.set_highlight_touchpad(&mut scene, true, Color::GREEN).unwrap();
    c.set_highlight_application_menu(&mut scene, true, Color::RED)
        .unwrap();
    assert_eq!(scene.material_of(m.trigger).unwrap().color, Color::YELLOW);
    assert_eq!(scene.material_of(m.trackpad).unwrap().color, Color::GREEN);
    assert_eq!(scene.material_of(m.button).unwrap().shader, Shader::unlit_color());
    assert_eq!(scene.material_of(m.body).unwrap(), &untouched);

    c.set_highlight_trigger(&mut scene, false, Color::YELLOW)
        .unwrap();
    assert_eq!(scene.material_of(m.trigger).unwrap(), &untouched);

    // releasing a trigger that was never pressed is reported, not fatal
    let err = c
        .set_highlight_trigger(&mut scene, false, Color::YELLOW)
        .unwrap_err();
    assert!(matches!(err, ControllerError::NotHighlighted(id) if id == m.trigger));
    assert!(c.is_highlighted(m.trackpad));
}

#[test]
fn pulse_survives_repairing_through_events() {
    let mut scene = Scene::new();
    let m = build_model(&mut scene);
    let mut devices = SimulatedDevices::new();
    devices.connect(TrackedIndex(2));
    let mut c =
        ControllerActions::attach(&mut scene, m.root, TrackedIndex(2), ControllerConfig::default())
            .unwrap();

    c.pulse_for(&mut devices, 9000, 0.5, 0.1, ms(0)).unwrap();
    let mut t = 0;
    while t < 700 {
        t += 20;
        if t == 160 {
            // power cycle: same slot, new device
            devices.disconnect(TrackedIndex(2));
            devices.connect(TrackedIndex(2));
            for ev in devices.drain_events() {
                c.on_device_event(&ev);
            }
        }
        devices.advance_to(ms(t));
        c.tick(&mut devices, ms(t)).unwrap();
    }

    let pulses = devices.pulses();
    assert_eq!(pulses.len(), 5);
    assert!(pulses.iter().all(|p| p.strength == 3999));
    assert_ne!(pulses[0].device, pulses[4].device);
    assert_eq!(c.active_pulses(), 0);
}
