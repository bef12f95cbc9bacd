//! GLTF decoding, split into a GPU-free decode half and an instantiate half.
//!
//! [`load_gltf`] runs inside a load future: it fetches the file, resolves its
//! buffers and textures and produces a plain [`ModelData`]. [`instantiate`]
//! runs in the apply callback on the event-loop thread, where the GPU device
//! lives: it uploads meshes and materials, grows the scene graph and remaps
//! animation channels onto the freshly created node handles.

use std::collections::HashMap;
use std::io::{BufReader, Cursor};

use anyhow::{Context as _, anyhow};

use crate::anim::{AnimationClip, Channel, Keyframes};
use crate::graph::{NodeId, Transform};
use crate::model::{Material, Mesh, Model, ModelHandle, ModelVertex, diffuse_layout};
use crate::state::SceneState;
use crate::texture::Texture;

use super::load_binary;

/// One GLTF primitive, decoded.
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    /// Index into [`ModelData::materials`].
    pub material: usize,
}

/// Decoded material pixels, ready for upload.
pub struct MaterialData {
    pub name: String,
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One node of the document's hierarchy, by GLTF node index.
pub struct NodeData {
    pub name: String,
    pub transform: Transform,
    /// GLTF mesh index; resolved to a model handle at instantiation.
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

pub struct ChannelData {
    /// GLTF node index of the animated node.
    pub target: usize,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

pub struct ClipData {
    pub name: String,
    pub channels: Vec<ChannelData>,
}

/// Everything a GLTF file contributes, CPU-side.
pub struct ModelData {
    pub label: String,
    pub meshes: Vec<MeshData>,
    /// GLTF mesh index -> indices into `meshes` (one per primitive).
    pub mesh_primitives: Vec<Vec<usize>>,
    pub materials: Vec<MaterialData>,
    pub nodes: Vec<NodeData>,
    /// GLTF node indices of the default scene's roots.
    pub roots: Vec<usize>,
    pub clips: Vec<ClipData>,
}

/// What [`instantiate`] put into the scene.
pub struct Instantiated {
    pub root: NodeId,
    pub clips: Vec<AnimationClip>,
}

/// Fetch and decode a GLTF/GLB file. No GPU access.
pub async fn load_gltf(file_name: &str) -> anyhow::Result<ModelData> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_reader(BufReader::new(Cursor::new(bytes)))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow!("GLB declares a binary chunk but carries none"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri)
                    .await
                    .with_context(|| format!("buffer '{uri}' referenced by {file_name}"))?;
                buffer_data.push(bin);
            }
        }
    }

    let mut materials = Vec::new();
    for material in gltf.materials() {
        let name = material.name().unwrap_or("unnamed material").to_string();
        let pbr = material.pbr_metallic_roughness();
        let data = match pbr.base_color_texture() {
            Some(info) => {
                let encoded = match info.texture().source().source() {
                    gltf::image::Source::View { view, .. } => {
                        let buffer = &buffer_data[view.buffer().index()];
                        buffer[view.offset()..view.offset() + view.length()].to_vec()
                    }
                    gltf::image::Source::Uri { uri, .. } => load_binary(uri)
                        .await
                        .with_context(|| format!("image '{uri}' referenced by {file_name}"))?,
                };
                let img = image::load_from_memory(&encoded)?.to_rgba8();
                MaterialData {
                    name,
                    width: img.width(),
                    height: img.height(),
                    rgba: img.into_raw(),
                }
            }
            None => {
                // Untextured material: bake the base color factor into one texel.
                let factor = pbr.base_color_factor();
                MaterialData {
                    name,
                    rgba: factor.map(|c| (c * 255.0) as u8).to_vec(),
                    width: 1,
                    height: 1,
                }
            }
        };
        materials.push(data);
    }
    // Primitives without a material fall back to this white texel.
    let fallback_material = materials.len();
    materials.push(MaterialData {
        name: "fallback".to_string(),
        rgba: vec![255; 4],
        width: 1,
        height: 1,
    });

    let mut meshes = Vec::new();
    let mut mesh_primitives = Vec::new();
    for mesh in gltf.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffer_data[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            let mut vertices: Vec<ModelVertex> = positions
                .into_iter()
                .map(|position| ModelVertex {
                    position,
                    tex_coords: Default::default(),
                    normal: Default::default(),
                })
                .collect();
            if let Some(normals) = reader.read_normals() {
                for (vertex, normal) in vertices.iter_mut().zip(normals) {
                    vertex.normal = normal;
                }
            }
            if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
                    vertex.tex_coords = tex_coord;
                }
            }
            let indices: Vec<u32> = match reader.read_indices() {
                Some(raw) => raw.into_u32().collect(),
                // Unindexed primitive: draw the vertices in order.
                None => (0..vertices.len() as u32).collect(),
            };

            primitives.push(meshes.len());
            meshes.push(MeshData {
                name: mesh.name().unwrap_or("unnamed mesh").to_string(),
                vertices,
                indices,
                material: primitive
                    .material()
                    .index()
                    .unwrap_or(fallback_material),
            });
        }
        mesh_primitives.push(primitives);
    }

    let nodes = gltf
        .nodes()
        .map(|node| {
            let (position, rotation, scale) = node.transform().decomposed();
            NodeData {
                name: node.name().unwrap_or("unnamed node").to_string(),
                transform: Transform {
                    position: position.into(),
                    rotation: rotation.into(),
                    scale: scale.into(),
                },
                mesh: node.mesh().map(|m| m.index()),
                children: node.children().map(|c| c.index()).collect(),
            }
        })
        .collect();

    let roots = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .map(|scene| scene.nodes().map(|n| n.index()).collect())
        .unwrap_or_default();

    let mut clips = Vec::new();
    for animation in gltf.animations() {
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| Some(&buffer_data[buffer.index()]));
            let timestamps: Vec<f32> = match reader.read_inputs() {
                Some(gltf::accessor::Iter::Standard(times)) => times.collect(),
                _ => {
                    log::warn!("animation channel without standard inputs, skipping");
                    continue;
                }
            };
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(iter)) => {
                    Keyframes::Translation(iter.map(Into::into).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(iter)) => {
                    Keyframes::Rotation(iter.into_f32().map(Into::into).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Scales(iter)) => {
                    Keyframes::Scale(iter.map(Into::into).collect())
                }
                // Morph target weights have no counterpart in the graph.
                _ => continue,
            };
            channels.push(ChannelData {
                target: channel.target().node().index(),
                timestamps,
                keyframes,
            });
        }
        clips.push(ClipData {
            name: animation.name().unwrap_or("Default").to_string(),
            channels,
        });
    }

    Ok(ModelData {
        label: file_name.to_string(),
        meshes,
        mesh_primitives,
        materials,
        nodes,
        roots,
        clips,
    })
}

/// Upload the decoded model and splice it into the scene under `parent`.
pub fn instantiate(
    data: ModelData,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    state: &mut SceneState,
    parent: Option<NodeId>,
) -> Instantiated {
    let layout = diffuse_layout(device);

    let textures: Vec<Texture> = data
        .materials
        .iter()
        .map(|m| Texture::from_rgba(device, queue, &m.rgba, m.width, m.height, &m.name))
        .collect();

    // One Model per GLTF mesh so nodes sharing a mesh share the handle and
    // get drawn as instances of each other.
    let mut model_handles: Vec<Option<ModelHandle>> = Vec::with_capacity(data.mesh_primitives.len());
    for primitives in &data.mesh_primitives {
        if primitives.is_empty() {
            model_handles.push(None);
            continue;
        }
        // Per-model material table, remapped from document indices.
        let mut local_materials = Vec::new();
        let mut local_index: HashMap<usize, usize> = HashMap::new();
        let mut meshes = Vec::new();
        for &primitive in primitives {
            let mesh_data = &data.meshes[primitive];
            let material = *local_index.entry(mesh_data.material).or_insert_with(|| {
                local_materials.push(Material::new(
                    device,
                    &data.materials[mesh_data.material].name,
                    textures[mesh_data.material].clone(),
                    &layout,
                ));
                local_materials.len() - 1
            });
            meshes.push(Mesh::new(
                device,
                &mesh_data.name,
                &mesh_data.vertices,
                &mesh_data.indices,
                material,
            ));
        }
        model_handles.push(Some(state.models.insert(
            device,
            Model {
                meshes,
                materials: local_materials,
            },
        )));
    }

    // Group the document's roots under one container node.
    let root = state
        .graph
        .add_node(parent, data.label.clone(), Transform::new(), None);
    let mut node_map: Vec<Option<NodeId>> = vec![None; data.nodes.len()];
    let mut pending: Vec<(usize, NodeId)> = data.roots.iter().map(|&idx| (idx, root)).collect();
    while let Some((idx, parent)) = pending.pop() {
        let node_data = &data.nodes[idx];
        let model = node_data.mesh.and_then(|mesh| model_handles[mesh]);
        let id = state.graph.add_node(
            Some(parent),
            node_data.name.clone(),
            node_data.transform.clone(),
            model,
        );
        node_map[idx] = Some(id);
        for &child in &node_data.children {
            pending.push((child, id));
        }
    }

    let clips = data
        .clips
        .into_iter()
        .map(|clip| AnimationClip {
            name: clip.name,
            channels: clip
                .channels
                .into_iter()
                .filter_map(|channel| {
                    // Channels may target nodes outside the instantiated scene.
                    let target = node_map.get(channel.target).copied().flatten()?;
                    Some(Channel {
                        target,
                        timestamps: channel.timestamps,
                        keyframes: channel.keyframes,
                    })
                })
                .collect(),
        })
        .collect();

    Instantiated { root, clips }
}
