//! Meshes, materials and instanced model storage.
//!
//! A [`Model`] is a set of meshes plus the materials they index. Models live
//! in [`Models`], keyed by [`ModelHandle`]; each slot owns the instance buffer
//! the scene graph's world transforms are written into before drawing.

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::graph::TransformRaw;
use crate::texture::Texture;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Bind group layout shared by every material: diffuse texture + sampler.
pub fn diffuse_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse_texture.sampler),
                },
            ],
            label: Some(name),
        });

        Self {
            name: name.to_string(),
            diffuse_texture,
            bind_group,
        }
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
        material: usize,
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Vertex Buffer")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Index Buffer")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
            material,
        }
    }
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

/// Handle into [`Models`]. Stays valid for the scene's lifetime; models are
/// never evicted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelHandle(usize);

impl ModelHandle {
    #[cfg(test)]
    pub fn for_tests(idx: usize) -> Self {
        Self(idx)
    }
}

#[derive(Debug)]
struct ModelSlot {
    model: Model,
    instance_buffer: wgpu::Buffer,
    capacity: usize,
}

/// All loaded models plus their per-model instance buffers.
#[derive(Debug, Default)]
pub struct Models {
    slots: Vec<ModelSlot>,
}

impl Models {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, device: &wgpu::Device, model: Model) -> ModelHandle {
        let handle = ModelHandle(self.slots.len());
        let instance_buffer = Self::mk_instance_buffer(device, &[TransformRaw::zeroed()]);
        self.slots.push(ModelSlot {
            model,
            instance_buffer,
            capacity: 1,
        });
        handle
    }

    pub fn model(&self, handle: ModelHandle) -> &Model {
        &self.slots[handle.0].model
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Upload this frame's world transforms for `handle`. Regrows the buffer
    /// when the instance count exceeds its capacity.
    pub fn write_instances(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        handle: ModelHandle,
        instances: &[TransformRaw],
    ) {
        let slot = &mut self.slots[handle.0];
        if instances.is_empty() {
            return;
        }
        if instances.len() > slot.capacity {
            slot.instance_buffer = Self::mk_instance_buffer(device, instances);
            slot.capacity = instances.len();
        } else {
            queue.write_buffer(&slot.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
    }

    pub fn instance_buffer(&self, handle: ModelHandle) -> &wgpu::Buffer {
        &self.slots[handle.0].instance_buffer
    }

    fn mk_instance_buffer(device: &wgpu::Device, contents: &[TransformRaw]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(contents),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }
}

/// Unit cube centered on the origin, one material slot.
pub fn cube_mesh(device: &wgpu::Device, name: &str) -> Mesh {
    #[rustfmt::skip]
    const POSITIONS: [([f32; 3], [f32; 3]); 6] = [
        // (face normal, u axis) pairs; v axis is normal x u
        ([ 0.0,  0.0,  1.0], [1.0, 0.0, 0.0]),
        ([ 0.0,  0.0, -1.0], [-1.0, 0.0, 0.0]),
        ([ 1.0,  0.0,  0.0], [0.0, 0.0, -1.0]),
        ([-1.0,  0.0,  0.0], [0.0, 0.0, 1.0]),
        ([ 0.0,  1.0,  0.0], [1.0, 0.0, 0.0]),
        ([ 0.0, -1.0,  0.0], [1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u_axis) in POSITIONS {
        let n = cgmath::Vector3::from(normal);
        let u = cgmath::Vector3::from(u_axis);
        let v = n.cross(u);
        let base = vertices.len() as u32;
        for (du, dv, tex) in [
            (-0.5, -0.5, [0.0, 1.0]),
            (0.5, -0.5, [1.0, 1.0]),
            (0.5, 0.5, [1.0, 0.0]),
            (-0.5, 0.5, [0.0, 0.0]),
        ] {
            let pos = n * 0.5 + u * du + v * dv;
            vertices.push(ModelVertex {
                position: pos.into(),
                tex_coords: tex,
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new(device, name, &vertices, &indices, 0)
}

/// Unit quad in the xy plane facing +z, one material slot.
pub fn quad_mesh(device: &wgpu::Device, name: &str) -> Mesh {
    let vertices = [
        ModelVertex {
            position: [-0.5, -0.5, 0.0],
            tex_coords: [0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [0.5, -0.5, 0.0],
            tex_coords: [1.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [0.5, 0.5, 0.0],
            tex_coords: [1.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [-0.5, 0.5, 0.0],
            tex_coords: [0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
    ];
    let indices = [0u32, 1, 2, 0, 2, 3];

    Mesh::new(device, name, &vertices, &indices, 0)
}

/// Drawing a [`Model`] with the camera and light bind groups set up by the
/// basic pipeline.
pub trait DrawModel<'a> {
    fn draw_model_instanced(
        &mut self,
        model: &'a Model,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_model_instanced(
        &mut self,
        model: &'b Model,
        instances: std::ops::Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            let material = &model.materials[mesh.material];
            self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            self.set_bind_group(0, &material.bind_group, &[]);
            self.set_bind_group(1, camera_bind_group, &[]);
            self.set_bind_group(2, light_bind_group, &[]);
            self.draw_indexed(0..mesh.num_elements, 0, instances.clone());
        }
    }
}
