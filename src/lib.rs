//! vignette
//!
//! A small, cross-platform runner for staged 3D demo scenes, native and WASM.
//! One frame orchestrator drives everything: a scene bootstraps its camera,
//! lights and panel bindings, requests assets that stream in asynchronously,
//! and an update loop advances animation, camera damping, audio and
//! time-varying textures once per display refresh.
//!
//! High-level modules
//! - `anim`: keyframe clips and the time-driven animation player
//! - `assets`: async loading (GLTF, audio, images) and the completion registry
//! - `audio`: audio output, spatial tracks and the exclusive soundboard
//! - `camera`: orbit camera, projection and the damped controller
//! - `context`: central GPU and window context
//! - `graph`: the scene graph arena
//! - `model`: meshes, materials and instanced model storage
//! - `panel`: live tweak panel bindings over the scene state
//! - `pipelines`: render pipeline and light resources
//! - `stage`: the orchestrator itself (event loop, update loop, `run`)
//! - `state`: the shared `SceneState` record
//! - `video`: textures refreshed from decoding frame sources
//!

pub mod anim;
pub mod assets;
pub mod audio;
pub mod camera;
pub mod context;
pub mod graph;
pub mod model;
pub mod panel;
pub mod pipelines;
pub mod stage;
pub mod state;
pub mod texture;
pub mod video;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use wgpu::*;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::DeviceEvent;
pub use winit::event::WindowEvent;
