//! Scene graph: an arena of positioned nodes rendered together.
//!
//! Nodes are addressed by [`NodeId`] handles so animation channels and asset
//! completions can keep stable references to what they target. Every node
//! carries a local and a world transform; [`SceneGraph::propagate`] refreshes
//! the world transforms top-down as `parent * local`.

use std::ops::Mul;

use cgmath::{Matrix3, Matrix4, One, Quaternion, Vector3};

use crate::model::ModelHandle;

/// Position, rotation and scale of a node relative to its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position<P: Into<Vector3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            ..Self::new()
        }
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> TransformRaw {
        TransformRaw {
            model: self.to_matrix().into(),
            normal: Matrix3::from(self.rotation).into(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, rhs: &'b Transform) -> Transform {
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        Transform {
            position: self.position + (self.rotation * scaled_rhs_pos),
            rotation: self.rotation * rhs.rotation,
            scale: Vector3::new(
                self.scale.x * rhs.scale.x,
                self.scale.y * rhs.scale.y,
                self.scale.z * rhs.scale.z,
            ),
        }
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        &self * &rhs
    }
}

/// The raw transform layout stored in the per-instance GPU buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl TransformRaw {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<TransformRaw>() as wgpu::BufferAddress,
            // advance per instance, not per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // model matrix, one vec4 per slot
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // normal matrix as 3x3
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Stable handle to a node in the graph. Nodes are never removed, so handles
/// stay valid for the lifetime of the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub local: Transform,
    pub world: Transform,
    pub model: Option<ModelHandle>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Hierarchical collection of positioned nodes.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under `parent`, or as a root when `parent` is `None`.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        local: Transform,
        model: Option<ModelHandle>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            world: local.clone(),
            local,
            model,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn set_local(&mut self, id: NodeId, local: Transform) {
        self.nodes[id.0].local = local;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Refresh all world transforms from the roots down.
    pub fn propagate(&mut self) {
        // Parents always precede their children in the arena, so one forward
        // sweep is a valid topological order.
        for i in 0..self.nodes.len() {
            let world = match self.nodes[i].parent {
                Some(parent) => &self.nodes[parent.0].world * &self.nodes[i].local,
                None => self.nodes[i].local.clone(),
            };
            self.nodes[i].world = world;
        }
    }

    /// World transforms of every node carrying `model`, in arena order.
    pub fn instances_of(&self, model: ModelHandle) -> Vec<TransformRaw> {
        self.nodes
            .iter()
            .filter(|node| node.model == Some(model))
            .map(|node| node.world.to_raw())
            .collect()
    }

    /// Handles of all models referenced anywhere in the graph.
    pub fn referenced_models(&self) -> Vec<ModelHandle> {
        let mut handles: Vec<ModelHandle> = self.nodes.iter().filter_map(|n| n.model).collect();
        handles.sort_unstable();
        handles.dedup();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3};

    fn assert_vec3_close(actual: Vector3<f32>, expected: Vector3<f32>) {
        for axis in 0..3 {
            assert!(
                (actual[axis] - expected[axis]).abs() < 1e-6,
                "expected {expected:?}, got {actual:?}"
            );
        }
    }

    #[test]
    fn world_transform_composes_parent_and_local() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_node(
            None,
            "parent",
            Transform {
                position: Vector3::new(1.0, 0.0, 0.0),
                rotation: Quaternion::one(),
                scale: Vector3::new(2.0, 2.0, 2.0),
            },
            None,
        );
        let child = graph.add_node(
            Some(parent),
            "child",
            Transform::from_position([1.0, 0.0, 0.0]),
            None,
        );

        graph.propagate();

        let world = &graph.node(child).world;
        assert_vec3_close(world.position, Vector3::new(3.0, 0.0, 0.0));
        assert_vec3_close(world.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn rotation_applies_to_child_offset() {
        let mut graph = SceneGraph::new();
        let parent = graph.add_node(
            None,
            "parent",
            Transform {
                position: Vector3::new(0.0, 0.0, 0.0),
                rotation: Quaternion::from_angle_y(Deg(90.0)),
                scale: Vector3::new(1.0, 1.0, 1.0),
            },
            None,
        );
        let child = graph.add_node(
            Some(parent),
            "child",
            Transform::from_position([1.0, 0.0, 0.0]),
            None,
        );

        graph.propagate();

        // +x rotated 90 degrees around y lands on -z
        let world = &graph.node(child).world;
        assert_vec3_close(world.position, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn instances_are_grouped_by_model() {
        let mut graph = SceneGraph::new();
        let a = ModelHandle::for_tests(0);
        let b = ModelHandle::for_tests(1);
        graph.add_node(None, "a0", Transform::new(), Some(a));
        graph.add_node(None, "b0", Transform::new(), Some(b));
        graph.add_node(None, "a1", Transform::new(), Some(a));
        graph.add_node(None, "bare", Transform::new(), None);

        graph.propagate();

        assert_eq!(graph.instances_of(a).len(), 2);
        assert_eq!(graph.instances_of(b).len(), 1);
        assert_eq!(graph.referenced_models(), vec![a, b]);
    }
}
