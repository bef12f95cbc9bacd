//! The live tweak panel: named control bindings over the scene state.
//!
//! Bindings are retained — asset completions register them, a load that never
//! resolves registers nothing — while the widgets themselves are immediate
//! mode: every frame [`Panel::show`] rebuilds the egui window from the current
//! binding list and routes user changes back into [`SceneState`] through the
//! binding callbacks.

use std::ops::RangeInclusive;

use winit::window::Window;

use crate::state::SceneState;

type ReadF32 = Box<dyn Fn(&SceneState) -> f32>;
type WriteF32 = Box<dyn FnMut(&mut SceneState, f32)>;
type ReadBool = Box<dyn Fn(&SceneState) -> bool>;
type WriteBool = Box<dyn FnMut(&mut SceneState, bool)>;
type ReadChoice = Box<dyn Fn(&SceneState) -> Option<usize>>;
type WriteChoice = Box<dyn FnMut(&mut SceneState, Option<usize>)>;
type Fire = Box<dyn FnMut(&mut SceneState)>;

/// One interactive widget: a view over a value reached through the scene
/// state, plus the side effect to run when the user changes it.
pub enum Control {
    /// Numeric value constrained to a range; the widget enforces the domain.
    Slider {
        label: String,
        range: RangeInclusive<f32>,
        read: ReadF32,
        write: WriteF32,
    },
    Toggle {
        label: String,
        read: ReadBool,
        write: WriteBool,
    },
    /// One-shot action button.
    Action { label: String, fire: Fire },
    /// Exclusive selection among named options, with an explicit off state.
    Choice {
        label: String,
        options: Vec<String>,
        read: ReadChoice,
        write: WriteChoice,
    },
}

impl Control {
    pub fn label(&self) -> &str {
        match self {
            Control::Slider { label, .. }
            | Control::Toggle { label, .. }
            | Control::Action { label, .. }
            | Control::Choice { label, .. } => label,
        }
    }
}

/// Named set of controls, usually scoped to one asset.
#[derive(Default)]
pub struct Group {
    pub name: String,
    controls: Vec<Control>,
}

impl Group {
    pub fn slider(
        &mut self,
        label: impl Into<String>,
        range: RangeInclusive<f32>,
        read: impl Fn(&SceneState) -> f32 + 'static,
        write: impl FnMut(&mut SceneState, f32) + 'static,
    ) -> &mut Self {
        self.controls.push(Control::Slider {
            label: label.into(),
            range,
            read: Box::new(read),
            write: Box::new(write),
        });
        self
    }

    pub fn toggle(
        &mut self,
        label: impl Into<String>,
        read: impl Fn(&SceneState) -> bool + 'static,
        write: impl FnMut(&mut SceneState, bool) + 'static,
    ) -> &mut Self {
        self.controls.push(Control::Toggle {
            label: label.into(),
            read: Box::new(read),
            write: Box::new(write),
        });
        self
    }

    pub fn action(
        &mut self,
        label: impl Into<String>,
        fire: impl FnMut(&mut SceneState) + 'static,
    ) -> &mut Self {
        self.controls.push(Control::Action {
            label: label.into(),
            fire: Box::new(fire),
        });
        self
    }

    pub fn choice(
        &mut self,
        label: impl Into<String>,
        options: Vec<String>,
        read: impl Fn(&SceneState) -> Option<usize> + 'static,
        write: impl FnMut(&mut SceneState, Option<usize>) + 'static,
    ) -> &mut Self {
        self.controls.push(Control::Choice {
            label: label.into(),
            options,
            read: Box::new(read),
            write: Box::new(write),
        });
        self
    }

    /// Drop all controls, keeping the group. Asset completions that rebuild
    /// their bindings (e.g. a choice whose options grew) clear first so the
    /// group never shows duplicates.
    pub fn clear(&mut self) {
        self.controls.clear();
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

/// The retained binding list rendered as one debug window.
pub struct Panel {
    pub title: String,
    groups: Vec<Group>,
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            groups: Vec::new(),
        }
    }

    /// Get or create the group named `name`.
    pub fn group(&mut self, name: impl Into<String>) -> &mut Group {
        let name = name.into();
        if let Some(idx) = self.groups.iter().position(|g| g.name == name) {
            return &mut self.groups[idx];
        }
        self.groups.push(Group {
            name,
            controls: Vec::new(),
        });
        self.groups.last_mut().unwrap()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.name == name)
    }

    pub fn binding_count(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.binding_count() == 0
    }

    /// Build the widgets and apply any user changes to `state`.
    pub fn show(&mut self, egui_ctx: &egui::Context, state: &mut SceneState) {
        if self.is_empty() {
            return;
        }
        egui::Window::new(self.title.as_str())
            .resizable(false)
            .default_width(260.0)
            .show(egui_ctx, |ui| {
                for group in &mut self.groups {
                    if group.is_empty() {
                        continue;
                    }
                    ui.label(
                        egui::RichText::new(group.name.as_str())
                            .size(14.0)
                            .color(egui::Color32::from_rgb(200, 150, 100)),
                    );
                    for control in &mut group.controls {
                        draw_control(ui, control, state);
                    }
                    ui.add_space(5.0);
                    ui.separator();
                    ui.add_space(5.0);
                }
            });
    }
}

fn draw_control(ui: &mut egui::Ui, control: &mut Control, state: &mut SceneState) {
    match control {
        Control::Slider {
            label,
            range,
            read,
            write,
        } => {
            let mut value = read(state);
            let response = ui.add(egui::Slider::new(&mut value, range.clone()).text(label.as_str()));
            if response.changed() {
                write(state, value);
            }
        }
        Control::Toggle { label, read, write } => {
            let mut value = read(state);
            if ui.checkbox(&mut value, label.as_str()).changed() {
                write(state, value);
            }
        }
        Control::Action { label, fire } => {
            if ui.button(label.as_str()).clicked() {
                fire(state);
            }
        }
        Control::Choice {
            label,
            options,
            read,
            write,
        } => {
            let current = read(state);
            ui.label(label.as_str());
            if ui
                .selectable_label(current.is_none(), "(off)")
                .clicked()
            {
                write(state, None);
            }
            for (idx, option) in options.iter().enumerate() {
                if ui
                    .selectable_label(current == Some(idx), option.as_str())
                    .clicked()
                {
                    write(state, Some(idx));
                }
            }
        }
    }
}

/// The egui plumbing: winit input translation plus wgpu paint.
pub struct PanelRenderer {
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl PanelRenderer {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, window: &Window) -> Self {
        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    /// Returns true when egui consumed the event (pointer over a widget).
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui_state.on_window_event(window, event).consumed
    }

    /// Run the panel UI and paint it over the scene in its own render pass.
    pub fn draw(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: [u32; 2],
        panel: &mut Panel,
        state: &mut SceneState,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            panel.show(ctx, state);
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: size,
            pixels_per_point: window.scale_factor() as f32,
        };

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panel pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let mut render_pass = render_pass.forget_lifetime();

            self.egui_renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_created_once_and_reused() {
        let mut panel = Panel::new("debug");
        panel.group("animation").toggle("run", |_| true, |_, _| {});
        panel
            .group("animation")
            .slider("speed", 0.0..=3.0, |_| 1.0, |_, _| {});

        assert!(panel.has_group("animation"));
        assert_eq!(panel.binding_count(), 2);
    }

    #[test]
    fn a_panel_without_resolved_loads_stays_empty() {
        // Bindings only appear when a load completion registers them; a
        // pending or failed load must leave nothing behind.
        let panel = Panel::new("debug");
        assert!(panel.is_empty());
        assert!(!panel.has_group("fox"));
    }

    #[test]
    fn callbacks_reach_the_scene_state() {
        let mut panel = Panel::new("debug");
        let mut state = SceneState::new();
        state.players.push(crate::anim::AnimationPlayer::new(vec![]));

        panel.group("animation").slider(
            "speed",
            0.0..=3.0,
            |s| s.players[0].speed,
            |s, v| s.players[0].speed = v,
        );

        // Drive the binding directly, the way the widget does on change.
        let group = panel.group("animation");
        match &mut group.controls[0] {
            Control::Slider { read, write, .. } => {
                assert_eq!(read(&state), 1.0);
                write(&mut state, 2.5);
                assert_eq!(read(&state), 2.5);
            }
            _ => unreachable!(),
        }
        assert_eq!(state.players[0].speed, 2.5);
    }
}
