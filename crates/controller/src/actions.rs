use std::time::Duration;

use vrctl_common::{Color, EntityId};
use vrctl_input::{DeviceEvent, DeviceHandle, HapticDevices, InputError, TrackedIndex};
use vrctl_scene::{
    BlendFactor, KEYWORD_ALPHABLEND, KEYWORD_ALPHAPREMULTIPLY, KEYWORD_ALPHATEST, Material,
    RenderQueue, Scene,
};

use crate::config::{ControllerConfig, PulseOverlap};
use crate::error::ControllerError;
use crate::highlight::{HighlightState, HighlightTable};
use crate::pulse::{PulseHandle, PulseScheduler};

/// Mutable per-controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub visible: bool,
    /// Clamped strength of the most recent pulse request.
    pub active_haptic_strength: u16,
    pub tracked_index: TrackedIndex,
}

/// Visual and haptic actions for one VR controller.
///
/// Owns the controller's visibility flag, highlight state machine and pulse
/// scheduler. The scene graph and the hardware are borrowed per call; the
/// controller only references the root node and its descendants.
#[derive(Debug)]
pub struct ControllerActions {
    root: EntityId,
    config: ControllerConfig,
    state: ControllerState,
    device: Option<DeviceHandle>,
    highlights: HighlightTable,
    pulses: PulseScheduler,
}

impl ControllerActions {
    /// Attach to the controller subtree at `root`.
    ///
    /// Moves `root` onto the raycast-ignore layer so the model never blocks
    /// pointer rays.
    pub fn attach(
        scene: &mut Scene,
        root: EntityId,
        tracked_index: TrackedIndex,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        if !scene.contains(root) {
            return Err(ControllerError::UnknownEntity(root));
        }
        config.validate()?;
        scene.set_layer(root, config.ignore_layer()?)?;
        tracing::info!(root = %root, index = %tracked_index, "controller attached");
        Ok(Self {
            root,
            config,
            state: ControllerState {
                visible: true,
                active_haptic_strength: 0,
                tracked_index,
            },
            device: None,
            highlights: HighlightTable::new(),
            pulses: PulseScheduler::new(),
        })
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn active_haptic_strength(&self) -> u16 {
        self.state.active_haptic_strength
    }

    pub fn tracked_index(&self) -> TrackedIndex {
        self.state.tracked_index
    }

    /// Point the controller at a different hardware slot.
    pub fn set_tracked_index(&mut self, index: TrackedIndex) {
        if index != self.state.tracked_index {
            self.state.tracked_index = index;
            self.device = None;
        }
    }

    /// The device handle currently cached, if any.
    pub fn cached_device(&self) -> Option<DeviceHandle> {
        self.device
    }

    // --- Visibility ---

    /// Show or hide every mesh renderer of the model, leaving `excluded` and
    /// everything under it untouched (e.g. an object held in the hand).
    pub fn set_model_visible(
        &mut self,
        scene: &mut Scene,
        on: bool,
        excluded: Option<EntityId>,
    ) -> Result<(), ControllerError> {
        let mut toggled = 0usize;
        for id in scene.descendants(self.root) {
            let Some(renderer) = scene.renderer(id) else {
                continue;
            };
            if !renderer.kind.is_mesh() {
                continue;
            }
            if excluded.is_some_and(|ex| scene.is_self_or_descendant_of(id, ex)) {
                continue;
            }
            scene.set_renderer_enabled(id, on)?;
            toggled += 1;
        }
        self.state.visible = on;
        tracing::debug!(on, toggled, ?excluded, "model visibility set");
        Ok(())
    }

    // --- Opacity ---

    /// Fade every renderer under the root. Below 1 the materials switch to
    /// premultiplied alpha in the transparent queue; at 1 they go back to
    /// opaque. Materials are edited in place, shared ones included.
    pub fn set_opacity(&mut self, scene: &mut Scene, alpha: f32) -> Result<(), ControllerError> {
        let alpha = if alpha.is_nan() {
            0.0
        } else {
            alpha.clamp(0.0, 1.0)
        };
        for id in scene.descendants(self.root) {
            if scene.material_of(id).is_none() {
                continue;
            }
            scene.modify_material(id, |m| apply_opacity(m, alpha))?;
        }
        tracing::debug!(alpha, "controller opacity set");
        Ok(())
    }

    // --- Highlights ---

    pub fn is_highlighted(&self, element: EntityId) -> bool {
        self.highlights.is_highlighted(element)
    }

    pub fn highlight_state(&self, element: EntityId) -> &HighlightState {
        self.highlights.state(element)
    }

    /// Tint `element` with a flat unlit colour, remembering its material.
    ///
    /// No-op if the element has no renderer or material. Highlighting an
    /// already highlighted element only changes the colour; the material
    /// saved by the first highlight is kept.
    pub fn highlight_element(
        &mut self,
        scene: &mut Scene,
        element: EntityId,
        color: Color,
    ) -> Result<(), ControllerError> {
        let Some(current) = scene.material_of(element).cloned() else {
            tracing::debug!(element = %element, "highlight skipped: no material");
            return Ok(());
        };
        if self.highlights.is_highlighted(element) {
            scene.modify_material(element, |m| m.color = color)?;
            tracing::debug!(element = %element, "highlight colour updated");
            return Ok(());
        }
        // private copy so the tint doesn't leak into other renderers
        if let Some(handle) = scene.material_handle(element) {
            if scene.material_users(handle) > 1 {
                scene.instance_material(element)?;
            }
        }
        let shader = self.config.highlight_shader.clone();
        scene.modify_material(element, |m| {
            m.color = color;
            m.shader = shader;
        })?;
        self.highlights.highlight(element, current);
        tracing::debug!(element = %element, "element highlighted");
        Ok(())
    }

    /// Put back the material saved by [`Self::highlight_element`].
    ///
    /// No-op if the element has no renderer or material, mirroring
    /// [`Self::highlight_element`]. Otherwise returns
    /// [`ControllerError::NotHighlighted`] if there is nothing to restore;
    /// the scene is left untouched in that case.
    pub fn unhighlight_element(
        &mut self,
        scene: &mut Scene,
        element: EntityId,
    ) -> Result<(), ControllerError> {
        if scene.material_of(element).is_none() && !self.highlights.is_highlighted(element) {
            tracing::debug!(element = %element, "unhighlight skipped: no material");
            return Ok(());
        }
        let Some(saved) = self.highlights.restore(element) else {
            tracing::warn!(element = %element, "unhighlight without prior highlight");
            return Err(ControllerError::NotHighlighted(element));
        };
        if scene.material_of(element).is_some() {
            scene.modify_material(element, move |m| *m = saved)?;
        }
        tracing::debug!(element = %element, "element unhighlighted");
        Ok(())
    }

    /// Highlight or unhighlight depending on `state`. `None` is a no-op.
    pub fn set_highlight(
        &mut self,
        scene: &mut Scene,
        state: bool,
        element: Option<EntityId>,
        color: Color,
    ) -> Result<(), ControllerError> {
        let Some(element) = element else {
            return Ok(());
        };
        if state {
            self.highlight_element(scene, element, color)
        } else {
            self.unhighlight_element(scene, element)
        }
    }

    pub fn set_highlight_trigger(
        &mut self,
        scene: &mut Scene,
        state: bool,
        color: Color,
    ) -> Result<(), ControllerError> {
        let paths = self.config.element_paths.trigger.clone();
        self.set_highlight_paths(scene, state, &paths, color)
    }

    /// Both grip sides.
    pub fn set_highlight_grip(
        &mut self,
        scene: &mut Scene,
        state: bool,
        color: Color,
    ) -> Result<(), ControllerError> {
        let paths = self.config.element_paths.grip.clone();
        self.set_highlight_paths(scene, state, &paths, color)
    }

    pub fn set_highlight_touchpad(
        &mut self,
        scene: &mut Scene,
        state: bool,
        color: Color,
    ) -> Result<(), ControllerError> {
        let paths = self.config.element_paths.touchpad.clone();
        self.set_highlight_paths(scene, state, &paths, color)
    }

    pub fn set_highlight_application_menu(
        &mut self,
        scene: &mut Scene,
        state: bool,
        color: Color,
    ) -> Result<(), ControllerError> {
        let paths = self.config.element_paths.application_menu.clone();
        self.set_highlight_paths(scene, state, &paths, color)
    }

    /// Apply `set_highlight` to each path that exists in the current model.
    /// Every path is attempted; the first error is returned.
    fn set_highlight_paths(
        &mut self,
        scene: &mut Scene,
        state: bool,
        paths: &[String],
        color: Color,
    ) -> Result<(), ControllerError> {
        let mut first_err = None;
        for path in paths {
            let element = scene.find_child(self.root, path);
            if element.is_none() {
                tracing::trace!(path = %path, "no such element in model");
            }
            if let Err(e) = self.set_highlight(scene, state, element, color) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    // --- Haptics ---

    /// Clamp a requested strength to the configured maximum.
    pub fn clamp_strength(&self, strength: u16) -> u16 {
        strength.min(self.config.max_haptic_strength)
    }

    /// Fire a single pulse on the controller.
    pub fn pulse<D: HapticDevices>(
        &mut self,
        devices: &mut D,
        strength: u16,
    ) -> Result<(), ControllerError> {
        let strength = self.clamp_strength(strength);
        self.state.active_haptic_strength = strength;
        let device = self.device(devices)?;
        self.fire(devices, device, strength)
    }

    /// Pulse every `interval` seconds for `duration` seconds, starting now.
    ///
    /// Returns `Ok(None)` and does nothing if `interval` or `duration` is
    /// not positive. Otherwise the first pulse fires immediately and the
    /// rest are driven by [`Self::tick`].
    pub fn pulse_for<D: HapticDevices>(
        &mut self,
        devices: &mut D,
        strength: u16,
        duration: f32,
        interval: f32,
        now: Duration,
    ) -> Result<Option<PulseHandle>, ControllerError> {
        let strength = self.clamp_strength(strength);
        self.state.active_haptic_strength = strength;
        if !(interval > 0.0) || !(duration > 0.0) {
            tracing::debug!(duration, interval, "timed pulse ignored");
            return Ok(None);
        }
        let device = self.device(devices)?;
        if self.config.pulse_overlap == PulseOverlap::Replace {
            let cancelled = self.pulses.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "replacing running pulse sequence");
            }
        }
        let handle = self.pulses.start(strength, duration, interval, now, |s| {
            devices.trigger_pulse(device, s)
        });
        match handle {
            Ok(h) => Ok(h),
            Err(e) => {
                self.forget_device_on(&e);
                Err(e.into())
            }
        }
    }

    /// Stop a running timed pulse. Returns false if it had already finished.
    pub fn cancel_pulse(&mut self, handle: PulseHandle) -> bool {
        self.pulses.cancel(handle)
    }

    pub fn is_pulsing(&self, handle: PulseHandle) -> bool {
        self.pulses.is_running(handle)
    }

    pub fn active_pulses(&self) -> usize {
        self.pulses.running()
    }

    /// Advance timed pulses. Call once per frame with a monotonic clock.
    ///
    /// Returns the number of pulses fired. If the device cannot be resolved
    /// every running sequence is dropped and the error returned. A sequence
    /// whose pulse fails is dropped and the first such error is returned.
    pub fn tick<D: HapticDevices>(
        &mut self,
        devices: &mut D,
        now: Duration,
    ) -> Result<usize, ControllerError> {
        let _span = tracing::info_span!("controller_tick", index = %self.state.tracked_index)
            .entered();
        if !self.pulses.has_due(now) {
            return Ok(0);
        }
        let device = match self.device(devices) {
            Ok(d) => d,
            Err(e) => {
                let dropped = self.pulses.cancel_all();
                tracing::warn!(dropped, "no device for running pulses: {e}");
                return Err(e);
            }
        };
        let mut lost = None;
        let fired = self.pulses.tick(now, |s| {
            devices.trigger_pulse(device, s).inspect_err(|e| {
                lost.get_or_insert(e.clone());
            })
        });
        if let Some(e) = lost {
            self.forget_device_on(&e);
            return Err(e.into());
        }
        Ok(fired)
    }

    /// React to a change in the runtime's device bindings. The cached handle
    /// is dropped when the event touches this controller's slot, and
    /// resolved again on the next haptic call.
    pub fn on_device_event(&mut self, event: &DeviceEvent) {
        if event.affects(self.state.tracked_index) && self.device.take().is_some() {
            tracing::debug!(index = %self.state.tracked_index, ?event, "device handle invalidated");
        }
    }

    fn device<D: HapticDevices>(&mut self, devices: &D) -> Result<DeviceHandle, ControllerError> {
        if let Some(d) = self.device {
            return Ok(d);
        }
        let d = devices.resolve(self.state.tracked_index).inspect_err(|e| {
            tracing::warn!(index = %self.state.tracked_index, "device resolution failed: {e}");
        })?;
        tracing::debug!(index = %self.state.tracked_index, device = ?d, "device resolved");
        self.device = Some(d);
        Ok(d)
    }

    fn fire<D: HapticDevices>(
        &mut self,
        devices: &mut D,
        device: DeviceHandle,
        strength: u16,
    ) -> Result<(), ControllerError> {
        devices.trigger_pulse(device, strength).map_err(|e| {
            self.forget_device_on(&e);
            e.into()
        })
    }

    fn forget_device_on(&mut self, err: &InputError) {
        if matches!(err, InputError::Disconnected(_)) {
            self.device = None;
        }
    }
}

/// Blend state for a controller faded to `alpha`.
fn apply_opacity(m: &mut Material, alpha: f32) {
    m.src_blend = BlendFactor::One;
    m.disable_keyword(KEYWORD_ALPHATEST);
    m.disable_keyword(KEYWORD_ALPHABLEND);
    if alpha < 1.0 {
        m.dst_blend = BlendFactor::OneMinusSrcAlpha;
        m.depth_write = false;
        m.enable_keyword(KEYWORD_ALPHAPREMULTIPLY);
        m.render_queue = RenderQueue::Explicit(RenderQueue::TRANSPARENT);
    } else {
        m.dst_blend = BlendFactor::Zero;
        m.depth_write = true;
        m.disable_keyword(KEYWORD_ALPHAPREMULTIPLY);
        m.render_queue = RenderQueue::FromShader;
    }
    m.color = m.color.with_alpha(alpha);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrctl_input::SimulatedDevices;
    use vrctl_scene::{Layer, Renderer, RendererKind, Shader};

    struct Rig {
        scene: Scene,
        devices: SimulatedDevices,
        controller: ControllerActions,
        body: EntityId,
        trigger: EntityId,
        lgrip: EntityId,
        rgrip: EntityId,
    }

    fn rig() -> Rig {
        let mut scene = Scene::new();
        let root = scene.spawn("Controller (left)", None).unwrap();
        let model = scene.spawn("Model", Some(root)).unwrap();
        let body = scene.spawn("body", Some(model)).unwrap();
        let trigger = scene.spawn("trigger", Some(model)).unwrap();
        let lgrip = scene.spawn("lgrip", Some(model)).unwrap();
        let rgrip = scene.spawn("rgrip", Some(model)).unwrap();

        let shared = scene.add_material(Material::opaque(Color::rgba(0.3, 0.3, 0.3, 1.0)));
        for id in [body, trigger, lgrip, rgrip] {
            scene.set_renderer(id, Renderer::mesh(shared)).unwrap();
        }

        let mut devices = SimulatedDevices::new();
        devices.connect(TrackedIndex(1));
        let controller =
            ControllerActions::attach(&mut scene, root, TrackedIndex(1), ControllerConfig::default())
                .unwrap();
        Rig {
            scene,
            devices,
            controller,
            body,
            trigger,
            lgrip,
            rgrip,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn attach_moves_root_to_ignore_raycast() {
        let r = rig();
        assert_eq!(r.scene.layer(r.controller.root()), Some(Layer::IGNORE_RAYCAST));
        // children keep their layer
        assert_eq!(r.scene.layer(r.body), Some(Layer::DEFAULT));
        assert!(r.controller.is_visible());
        assert_eq!(r.controller.active_haptic_strength(), 0);
    }

    #[test]
    fn attach_to_unknown_root_fails() {
        let mut scene = Scene::new();
        let ghost = EntityId::new();
        let err = ControllerActions::attach(
            &mut scene,
            ghost,
            TrackedIndex(0),
            ControllerConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ControllerError::UnknownEntity(id) if id == ghost));
    }

    #[test]
    fn attach_rejects_invalid_config() {
        let mut scene = Scene::new();
        let root = scene.spawn("Controller", None).unwrap();
        let config = ControllerConfig {
            max_haptic_strength: 0,
            ..ControllerConfig::default()
        };
        let err = ControllerActions::attach(&mut scene, root, TrackedIndex(0), config).unwrap_err();
        assert!(matches!(err, ControllerError::Config(_)));
    }

    #[test]
    fn hide_model_except_grabbed() {
        let mut r = rig();
        let held = r.scene.spawn("held_cube", Some(r.body)).unwrap();
        let mat = r.scene.add_material(Material::default());
        r.scene.set_renderer(held, Renderer::mesh(mat)).unwrap();

        r.controller
            .set_model_visible(&mut r.scene, false, Some(r.body))
            .unwrap();
        assert!(!r.controller.is_visible());
        assert!(r.scene.renderer(r.body).unwrap().enabled);
        assert!(r.scene.renderer(held).unwrap().enabled);
        assert!(!r.scene.renderer(r.trigger).unwrap().enabled);
        assert!(!r.scene.renderer(r.lgrip).unwrap().enabled);

        r.controller.set_model_visible(&mut r.scene, true, None).unwrap();
        assert!(r.controller.is_visible());
        assert!(r.scene.renderer(r.trigger).unwrap().enabled);
    }

    #[test]
    fn visibility_skips_sprites_and_tolerates_empty_models() {
        let mut r = rig();
        let label = r.scene.spawn("label", Some(r.controller.root())).unwrap();
        let mat = r.scene.add_material(Material::default());
        r.scene.set_renderer(label, Renderer::sprite(mat)).unwrap();
        r.controller.set_model_visible(&mut r.scene, false, None).unwrap();
        assert!(r.scene.renderer(label).unwrap().enabled);

        let mut scene = Scene::new();
        let root = scene.spawn("Empty", None).unwrap();
        let mut empty =
            ControllerActions::attach(&mut scene, root, TrackedIndex(0), ControllerConfig::default())
                .unwrap();
        empty.set_model_visible(&mut scene, false, None).unwrap();
        assert!(!empty.is_visible());
    }

    #[test]
    fn opacity_switches_blend_state() {
        let mut r = rig();
        r.controller.set_opacity(&mut r.scene, 1.0).unwrap();
        r.controller.set_opacity(&mut r.scene, 0.5).unwrap();
        let m = r.scene.material_of(r.body).unwrap();
        assert!(!m.depth_write);
        assert_eq!(m.src_blend, BlendFactor::One);
        assert_eq!(m.dst_blend, BlendFactor::OneMinusSrcAlpha);
        assert_eq!(m.render_queue, RenderQueue::Explicit(3000));
        assert!(m.is_keyword_enabled(KEYWORD_ALPHAPREMULTIPLY));
        assert_eq!(m.color.alpha(), 0.5);

        r.controller.set_opacity(&mut r.scene, 1.0).unwrap();
        let m = r.scene.material_of(r.body).unwrap();
        assert!(m.depth_write);
        assert_eq!(m.dst_blend, BlendFactor::Zero);
        assert_eq!(m.render_queue, RenderQueue::FromShader);
        assert!(!m.is_keyword_enabled(KEYWORD_ALPHAPREMULTIPLY));
        assert_eq!(m.color.alpha(), 1.0);
    }

    #[test]
    fn opacity_clamps() {
        let mut r = rig();
        for (input, expected) in [(-0.5, 0.0), (0.0, 0.0), (0.25, 0.25), (1.0, 1.0), (7.0, 1.0)] {
            r.controller.set_opacity(&mut r.scene, input).unwrap();
            assert_eq!(r.scene.material_of(r.trigger).unwrap().color.alpha(), expected);
        }
        r.controller.set_opacity(&mut r.scene, f32::NAN).unwrap();
        assert_eq!(r.scene.material_of(r.trigger).unwrap().color.alpha(), 0.0);
    }

    #[test]
    fn opacity_skips_renderers_without_material() {
        let mut r = rig();
        let bare = r.scene.spawn("bare", Some(r.controller.root())).unwrap();
        r.scene
            .set_renderer(bare, Renderer::bare(RendererKind::Mesh))
            .unwrap();
        assert!(r.controller.set_opacity(&mut r.scene, 0.3).is_ok());
    }

    #[test]
    fn highlight_and_restore() {
        let mut r = rig();
        let before = r.scene.material_of(r.trigger).unwrap().clone();

        r.controller
            .highlight_element(&mut r.scene, r.trigger, Color::YELLOW)
            .unwrap();
        let lit = r.scene.material_of(r.trigger).unwrap();
        assert_eq!(lit.color, Color::YELLOW);
        assert_eq!(lit.shader, Shader::unlit_color());
        assert!(r.controller.is_highlighted(r.trigger));
        // the shared body material is untouched
        assert_eq!(r.scene.material_of(r.body).unwrap(), &before);

        r.controller
            .unhighlight_element(&mut r.scene, r.trigger)
            .unwrap();
        assert_eq!(r.scene.material_of(r.trigger).unwrap(), &before);
        assert_eq!(r.controller.highlight_state(r.trigger), &HighlightState::Normal);

        let err = r
            .controller
            .unhighlight_element(&mut r.scene, r.trigger)
            .unwrap_err();
        assert!(matches!(err, ControllerError::NotHighlighted(id) if id == r.trigger));
    }

    #[test]
    fn double_highlight_restores_original() {
        let mut r = rig();
        let before = r.scene.material_of(r.trigger).unwrap().clone();
        r.controller
            .highlight_element(&mut r.scene, r.trigger, Color::RED)
            .unwrap();
        r.controller
            .highlight_element(&mut r.scene, r.trigger, Color::GREEN)
            .unwrap();
        assert_eq!(r.scene.material_of(r.trigger).unwrap().color, Color::GREEN);
        r.controller
            .unhighlight_element(&mut r.scene, r.trigger)
            .unwrap();
        assert_eq!(r.scene.material_of(r.trigger).unwrap(), &before);
    }

    #[test]
    fn highlight_without_material_is_noop() {
        let mut r = rig();
        let root = r.controller.root();
        r.controller
            .highlight_element(&mut r.scene, root, Color::RED)
            .unwrap();
        assert!(!r.controller.is_highlighted(root));
    }

    #[test]
    fn set_highlight_none_is_noop() {
        let mut r = rig();
        assert!(r
            .controller
            .set_highlight(&mut r.scene, false, None, Color::RED)
            .is_ok());
    }

    #[test]
    fn grip_alias_covers_both_sides() {
        let mut r = rig();
        r.controller
            .set_highlight_grip(&mut r.scene, true, Color::BLUE)
            .unwrap();
        assert!(r.controller.is_highlighted(r.lgrip));
        assert!(r.controller.is_highlighted(r.rgrip));
        r.controller
            .set_highlight_grip(&mut r.scene, false, Color::BLUE)
            .unwrap();
        assert!(!r.controller.is_highlighted(r.lgrip));
        assert!(!r.controller.is_highlighted(r.rgrip));
    }

    #[test]
    fn alias_for_missing_element_is_noop() {
        let mut r = rig();
        // this model has no trackpad or menu button
        r.controller
            .set_highlight_touchpad(&mut r.scene, true, Color::RED)
            .unwrap();
        r.controller
            .set_highlight_application_menu(&mut r.scene, false, Color::RED)
            .unwrap();
    }

    #[test]
    fn release_on_element_without_renderer_is_noop() {
        let mut scene = Scene::new();
        let root = scene.spawn("Controller", None).unwrap();
        let model = scene.spawn("Model", Some(root)).unwrap();
        let trigger = scene.spawn("trigger", Some(model)).unwrap();
        let mut c =
            ControllerActions::attach(&mut scene, root, TrackedIndex(0), ControllerConfig::default())
                .unwrap();

        c.set_highlight_trigger(&mut scene, true, Color::RED).unwrap();
        assert!(!c.is_highlighted(trigger));
        c.set_highlight_trigger(&mut scene, false, Color::RED).unwrap();
        c.unhighlight_element(&mut scene, trigger).unwrap();
    }

    #[test]
    fn single_pulse_is_clamped() {
        let mut r = rig();
        r.controller.pulse(&mut r.devices, 5000).unwrap();
        assert_eq!(r.devices.pulses()[0].strength, 3999);
        assert_eq!(r.controller.active_haptic_strength(), 3999);

        r.controller.pulse(&mut r.devices, 700).unwrap();
        assert_eq!(r.devices.pulses()[1].strength, 700);
    }

    #[test]
    fn device_handle_is_cached_until_event() {
        let mut r = rig();
        r.controller.pulse(&mut r.devices, 100).unwrap();
        r.controller.pulse(&mut r.devices, 100).unwrap();
        assert_eq!(r.devices.lookups(), 1);

        r.devices.reindex(TrackedIndex(1), TrackedIndex(3)).unwrap();
        for ev in r.devices.drain_events() {
            r.controller.on_device_event(&ev);
        }
        assert!(r.controller.cached_device().is_none());
        let err = r.controller.pulse(&mut r.devices, 100).unwrap_err();
        assert!(matches!(err, ControllerError::Device(InputError::Unassigned(_))));

        r.controller.set_tracked_index(TrackedIndex(3));
        r.controller.pulse(&mut r.devices, 100).unwrap();
        assert_eq!(r.devices.pulses().len(), 3);
    }

    #[test]
    fn stale_handle_is_dropped_after_disconnect() {
        let mut r = rig();
        r.controller.pulse(&mut r.devices, 100).unwrap();
        // replaced without anyone forwarding the events
        r.devices.connect(TrackedIndex(1));
        assert!(r.controller.pulse(&mut r.devices, 100).is_err());
        assert!(r.controller.cached_device().is_none());
        r.controller.pulse(&mut r.devices, 100).unwrap();
    }

    #[test]
    fn timed_pulse_fires_three_times() {
        let mut r = rig();
        let handle = r
            .controller
            .pulse_for(&mut r.devices, 100, 0.3, 0.1, ms(0))
            .unwrap();
        assert!(handle.is_some());
        for t in (10..=400).step_by(10) {
            r.devices.advance_to(ms(t));
            r.controller.tick(&mut r.devices, ms(t)).unwrap();
        }
        let at: Vec<Duration> = r.devices.pulses().iter().map(|p| p.at).collect();
        assert_eq!(at, vec![ms(0), ms(100), ms(200)]);
        assert_eq!(r.controller.active_pulses(), 0);
    }

    #[test]
    fn timed_pulse_with_zero_interval_does_nothing() {
        let mut r = rig();
        let handle = r
            .controller
            .pulse_for(&mut r.devices, 100, 1.0, 0.0, ms(0))
            .unwrap();
        assert!(handle.is_none());
        assert!(r.devices.pulses().is_empty());
        assert_eq!(r.devices.lookups(), 0);
    }

    #[test]
    fn replace_policy_cancels_previous_sequence() {
        let mut r = rig();
        r.controller.config.pulse_overlap = PulseOverlap::Replace;
        let first = r
            .controller
            .pulse_for(&mut r.devices, 100, 1.0, 0.1, ms(0))
            .unwrap()
            .unwrap();
        let second = r
            .controller
            .pulse_for(&mut r.devices, 200, 1.0, 0.1, ms(50))
            .unwrap()
            .unwrap();
        assert!(!r.controller.is_pulsing(first));
        assert!(r.controller.is_pulsing(second));
        assert_eq!(r.controller.active_pulses(), 1);
    }

    #[test]
    fn concurrent_by_default_keeps_both() {
        let mut scene = Scene::new();
        let root = scene.spawn("Controller", None).unwrap();
        let mut devices = SimulatedDevices::new();
        devices.connect(TrackedIndex(0));
        let mut c =
            ControllerActions::attach(&mut scene, root, TrackedIndex(0), ControllerConfig::default())
                .unwrap();
        c.pulse_for(&mut devices, 100, 1.0, 0.1, ms(0)).unwrap();
        c.pulse_for(&mut devices, 100, 1.0, 0.1, ms(0)).unwrap();
        assert_eq!(c.active_pulses(), 2);
        assert_eq!(c.tick(&mut devices, ms(100)).unwrap(), 2);
    }

    #[test]
    fn cancel_stops_timed_pulse() {
        let mut r = rig();
        let h = r
            .controller
            .pulse_for(&mut r.devices, 100, 1.0, 0.1, ms(0))
            .unwrap()
            .unwrap();
        assert!(r.controller.cancel_pulse(h));
        assert_eq!(r.controller.tick(&mut r.devices, ms(100)).unwrap(), 0);
        assert_eq!(r.devices.pulses().len(), 1);
    }

    #[test]
    fn lost_device_drops_running_pulses() {
        let mut r = rig();
        r.controller
            .pulse_for(&mut r.devices, 100, 1.0, 0.1, ms(0))
            .unwrap();
        r.devices.disconnect(TrackedIndex(1));
        for ev in r.devices.drain_events() {
            r.controller.on_device_event(&ev);
        }
        assert!(r.controller.tick(&mut r.devices, ms(100)).is_err());
        assert_eq!(r.controller.active_pulses(), 0);
    }

    #[test]
    fn pulse_lost_mid_sequence_is_reported() {
        let mut r = rig();
        r.controller
            .pulse_for(&mut r.devices, 100, 1.0, 0.1, ms(0))
            .unwrap();
        // replaced without anyone forwarding the events
        r.devices.connect(TrackedIndex(1));
        let err = r.controller.tick(&mut r.devices, ms(100)).unwrap_err();
        assert!(matches!(err, ControllerError::Device(InputError::Disconnected(_))));
        assert_eq!(r.controller.active_pulses(), 0);
        assert!(r.controller.cached_device().is_none());
        assert_eq!(r.devices.pulses().len(), 1);
    }

    #[test]
    fn pulse_without_device_fails() {
        let mut r = rig();
        r.controller.set_tracked_index(TrackedIndex(9));
        let err = r.controller.pulse(&mut r.devices, 10).unwrap_err();
        assert_eq!(err.to_string(), "device error: no device assigned to tracked index #9");
    }
}
