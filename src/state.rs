//! The shared scene record every part of the orchestrator mutates.

use instant::Duration;

use crate::anim::AnimationPlayer;
use crate::audio::{AudioOutput, Soundboard};
use crate::graph::SceneGraph;
use crate::model::Models;
use crate::video::VideoTexture;

/// Everything a running scene owns besides the GPU context: the graph, the
/// loaded models, animation players, audio and time-varying textures.
///
/// Constructed once at startup and torn down at process end. All mutation
/// happens on the event-loop thread: bootstrap fills in the initial scene,
/// asset completions attach what they loaded, panel callbacks tweak values,
/// and the update loop advances the time-dependent parts. Anything loadable
/// simply isn't here until its load resolved.
pub struct SceneState {
    pub graph: SceneGraph,
    pub models: Models,
    pub players: Vec<AnimationPlayer>,
    pub audio: AudioOutput,
    pub soundboard: Soundboard,
    pub videos: Vec<VideoTexture>,
    /// Monotone time since bootstrap; reset only at process start.
    pub elapsed: Duration,
}

impl SceneState {
    pub fn new() -> Self {
        Self {
            graph: SceneGraph::new(),
            models: Models::new(),
            players: Vec::new(),
            audio: AudioOutput::default(),
            soundboard: Soundboard::new(),
            videos: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Advance all time-dependent state by `dt`: running animation players
    /// move their clip time and write poses into the graph, video sources are
    /// polled and mark frames for re-upload.
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        for player in &mut self.players {
            player.advance(dt);
            player.apply(&mut self.graph);
        }
        for video in &mut self.videos {
            video.poll_source(dt);
        }
    }

    /// Upload any video frames that became ready, right before rendering.
    pub fn upload_videos(&mut self, queue: &wgpu::Queue) {
        for video in &mut self.videos {
            video.upload(queue);
        }
    }
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new()
    }
}
