//! The frame orchestrator: bootstrap, update loop and completion routing.
//!
//! A [`Scene`] describes one demo; [`run`] bootstraps the context for it and
//! then drives the loop until the window closes. Each frame: advance the
//! time-dependent state by the elapsed delta, step the camera damping, poll
//! video sources, render the scene and the panel, schedule the next redraw.
//!
//! Asset loads requested through the [`AssetServer`] resolve out-of-band and
//! arrive here as user events; their apply callbacks run between frames, so a
//! completion and a frame update never touch the shared state concurrently.
//! Whether a given completion lands before or after any given frame is
//! unspecified, and nothing below assumes either order.

use std::sync::{Arc, Mutex};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::assets::{AssetServer, Dispatch, Mutation};
use crate::context::Context;
use crate::model::DrawModel;
use crate::panel::Panel;
use crate::state::SceneState;
use crate::texture::Texture;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// One demo scene. Implementations configure the world once everything is
/// bootstrapped and can hook per-frame and per-event updates.
pub trait Scene {
    /// Called once, after the context exists. Issue asset loads here and
    /// register panel bindings; anything loaded arrives later through the
    /// apply callbacks passed to [`AssetServer::spawn`].
    fn on_ready(
        &mut self,
        ctx: &mut Context,
        state: &mut SceneState,
        panel: &mut Panel,
        assets: &AssetServer,
    );

    /// Called every frame with the elapsed delta, before rendering.
    fn on_update(&mut self, _ctx: &mut Context, _state: &mut SceneState, _dt: Duration) {}

    /// Raw window events, delivered after the panel and camera had their turn.
    fn on_window_events(&mut self, _ctx: &mut Context, _state: &mut SceneState, _event: &WindowEvent) {
    }
}

/// Events injected into the winit loop from outside the frame cycle.
pub enum StageEvent {
    /// Deferred bootstrap handoff; only used on the web, where the context
    /// future cannot be blocked on.
    #[cfg(target_arch = "wasm32")]
    Initialized(Context),
    /// A resolved asset load, to be applied between frames.
    Applied(Mutation),
}

struct ProxyDispatch(Mutex<EventLoopProxy<StageEvent>>);

impl Dispatch for ProxyDispatch {
    fn dispatch(&self, mutation: Mutation) {
        let proxy = self.0.lock().unwrap();
        if proxy.send_event(StageEvent::Applied(mutation)).is_err() {
            log::warn!("event loop closed before a load completion could be applied");
        }
    }
}

/// Wall-clock for the loop: monotone elapsed time, per-frame delta.
struct Clock {
    last: Instant,
}

impl Clock {
    fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        dt
    }
}

/// Everything that exists only after bootstrap.
struct AppState {
    ctx: Context,
    scene_state: SceneState,
    panel: Panel,
    is_surface_configured: bool,
}

impl AppState {
    fn new(ctx: Context) -> Self {
        Self {
            ctx,
            scene_state: SceneState::new(),
            panel: Panel::new("Controls"),
            is_surface_configured: false,
        }
    }

    /// Keep projection and render surface consistent with the display area.
    /// Runs synchronously inside the resize event, never mid-frame.
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // keep the loop scheduled
        self.ctx.window.request_redraw();

        if !self.is_surface_configured {
            return Ok(());
        }

        // Refresh world transforms and push them into the per-model instance
        // buffers before the pass borrows them.
        self.scene_state.graph.propagate();
        let mut batches = Vec::new();
        for handle in self.scene_state.graph.referenced_models() {
            let instances = self.scene_state.graph.instances_of(handle);
            if instances.is_empty() {
                continue;
            }
            self.scene_state.models.write_instances(
                &self.ctx.device,
                &self.ctx.queue,
                handle,
                &instances,
            );
            batches.push((handle, instances.len() as u32));
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.ctx.pipelines.scene);
            for (handle, count) in &batches {
                render_pass
                    .set_vertex_buffer(1, self.scene_state.models.instance_buffer(*handle).slice(..));
                render_pass.draw_model_instanced(
                    self.scene_state.models.model(*handle),
                    0..*count,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.gui.draw(
            &self.ctx.window,
            &self.ctx.device,
            &self.ctx.queue,
            &mut encoder,
            &view,
            [self.ctx.config.width, self.ctx.config.height],
            &mut self.panel,
            &mut self.scene_state,
        );

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<S: Scene> {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<StageEvent>,
    scene: S,
    app: Option<AppState>,
    clock: Clock,
}

impl<S: Scene> App<S> {
    fn new(event_loop: &EventLoop<StageEvent>, scene: S) -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            runtime: tokio::runtime::Runtime::new().expect("failed to start the async runtime"),
            proxy: event_loop.create_proxy(),
            scene,
            app: None,
            clock: Clock::new(),
        }
    }

    fn mk_asset_server(&self) -> AssetServer {
        let dispatch = Arc::new(ProxyDispatch(Mutex::new(self.proxy.clone())));
        #[cfg(not(target_arch = "wasm32"))]
        {
            AssetServer::new(dispatch, self.runtime.handle().clone())
        }
        #[cfg(target_arch = "wasm32")]
        {
            AssetServer::new(dispatch)
        }
    }

    /// Bootstrap finished: wire up the asset server, let the scene populate
    /// the world, and kick off the loop.
    fn finish_init(&mut self, ctx: Context) {
        let mut app = AppState::new(ctx);
        let size = app.ctx.window.inner_size();
        app.resize(size.width, size.height);

        let assets = self.mk_asset_server();
        self.scene.on_ready(
            &mut app.ctx,
            &mut app.scene_state,
            &mut app.panel,
            &assets,
        );

        app.ctx.window.request_redraw();
        self.clock = Clock::new();
        self.app = Some(app);
    }
}

impl<S: Scene> ApplicationHandler<StageEvent> for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes();

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .expect("failed to create the window"),
        );

        #[cfg(not(target_arch = "wasm32"))]
        {
            // Missing adapter/device is a fatal startup condition.
            let ctx = self
                .runtime
                .block_on(Context::new(window))
                .expect("scene bootstrap failed");
            self.finish_init(ctx);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = Context::new(window).await.expect_throw("scene bootstrap failed");
                assert!(proxy.send_event(StageEvent::Initialized(ctx)).is_ok());
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: StageEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            StageEvent::Initialized(ctx) => self.finish_init(ctx),
            StageEvent::Applied(mutation) => {
                // A completion may land before bootstrap only on the web; the
                // asset server doesn't exist until after it, so in practice
                // `app` is always populated here.
                if let Some(app) = &mut self.app {
                    mutation(&mut app.ctx, &mut app.scene_state, &mut app.panel);
                } else {
                    log::warn!("dropping a load completion that arrived before bootstrap");
                }
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(app) = &mut self.app else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            app.ctx.camera.controller.handle_mouse(dx, dy);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = &mut self.app else {
            return;
        };

        // The panel gets first refusal on input; pointer events it consumed
        // must not also orbit the camera.
        let consumed = app.ctx.gui.on_window_event(&app.ctx.window, &event);
        if !consumed {
            app.ctx.camera.controller.handle_window_events(&event);
        }

        self.scene
            .on_window_events(&mut app.ctx, &mut app.scene_state, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.clock.tick();

                // Advance animation players and poll video sources, then let
                // the scene hook run before anything is uploaded.
                app.scene_state.advance(dt);
                self.scene
                    .on_update(&mut app.ctx, &mut app.scene_state, dt);

                let ctx = &mut app.ctx;
                ctx.camera
                    .controller
                    .update(&mut ctx.camera.camera, dt);
                ctx.camera
                    .uniform
                    .update_view_proj(&ctx.camera.camera, &ctx.projection);
                ctx.queue.write_buffer(
                    &ctx.camera.buffer,
                    0,
                    bytemuck::cast_slice(&[ctx.camera.uniform]),
                );

                // Positional audio follows the camera.
                let eye = ctx.camera.camera.eye();
                app.scene_state
                    .audio
                    .set_listener_position([eye.x, eye.y, eye.z]);

                app.scene_state.upload_videos(&app.ctx.queue);

                match app.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = app.ctx.window.inner_size();
                        app.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("unable to render: {e}");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Start the given scene and run its loop until the window closes.
pub fn run<S: Scene + 'static>(scene: S) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {e}");
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<StageEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, scene);
    event_loop.run_app(&mut app)?;

    Ok(())
}
