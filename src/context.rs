use std::sync::Arc;

use anyhow::anyhow;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection};
use crate::panel::PanelRenderer;
use crate::pipelines::{
    Pipelines,
    light::{LightResources, LightUniform},
};
use crate::texture::Texture;

/// The GPU and window side of a running scene: surface, device, camera and
/// light resources, depth buffer, pipelines and the panel renderer. Created
/// once at startup; resized in lockstep with the window.
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub gui: PanelRenderer,
    pub clear_color: wgpu::Color,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("no compatible graphics adapter: {e}"))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The scene shader assumes an sRGB surface; fall back to whatever the
        // adapter offers first otherwise.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = Camera::new((0.0, 0.0, 0.0), cgmath::Deg(-90.0), cgmath::Deg(20.0), 5.0);
        let projection = Projection::new(config.width, config.height, cgmath::Deg(45.0), 0.1, 500.0);
        let controller = OrbitController::default();

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let light = LightResources::new(
            &device,
            LightUniform::new([4.0, 6.0, 4.0], [1.0, 1.0, 1.0]),
        );

        let pipelines = Pipelines::new(
            &device,
            &config,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );

        let gui = PanelRenderer::new(&device, config.format, &window);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            gui,
            clear_color: wgpu::Color {
                r: 0.05,
                g: 0.06,
                b: 0.08,
                a: 1.0,
            },
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}
