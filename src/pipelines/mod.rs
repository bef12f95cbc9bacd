//! Render pipeline construction.

pub mod light;
pub mod scene;

/// The pipelines the orchestrator renders with.
#[derive(Debug)]
pub struct Pipelines {
    pub scene: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        light_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        Self {
            scene: scene::mk_scene_pipeline(
                device,
                config,
                camera_bind_group_layout,
                light_bind_group_layout,
            ),
        }
    }
}
