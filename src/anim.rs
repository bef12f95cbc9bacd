//! Keyframe clips and the time-driven animation player.
//!
//! Clips come out of the GLTF loader as per-property channels (translation,
//! rotation, scale) targeting scene-graph nodes. The player owns the clock:
//! while running it advances clip time by `delta * speed` each frame and
//! samples every channel of the active clip onto its target node's local
//! transform.

use cgmath::{Quaternion, Vector3, VectorSpace};
use instant::Duration;

use crate::graph::{NodeId, SceneGraph};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
}

/// One animated property of one node.
#[derive(Clone, Debug)]
pub struct Channel {
    pub target: NodeId,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

/// A named animation with all its channels.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Clip length: the largest timestamp across all channels.
    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.timestamps.last().copied())
            .fold(0.0, f32::max)
    }
}

/// Plays one clip of a set against the scene graph.
#[derive(Debug)]
pub struct AnimationPlayer {
    clips: Vec<AnimationClip>,
    active: usize,
    time: f32,
    pub speed: f32,
    pub running: bool,
    pub looping: bool,
}

impl AnimationPlayer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        Self {
            clips,
            active: 0,
            time: 0.0,
            speed: 1.0,
            running: true,
            looping: true,
        }
    }

    pub fn clip_names(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.name.clone()).collect()
    }

    pub fn active_clip(&self) -> usize {
        self.active
    }

    /// Switch clips and restart from the beginning.
    pub fn set_active_clip(&mut self, idx: usize) {
        if idx < self.clips.len() && idx != self.active {
            self.active = idx;
            self.time = 0.0;
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance clip time by `dt * speed`. Does nothing while stopped; wraps
    /// at the clip's duration when looping, clamps otherwise.
    pub fn advance(&mut self, dt: Duration) {
        if !self.running {
            return;
        }
        let Some(clip) = self.clips.get(self.active) else {
            return;
        };
        self.time += dt.as_secs_f32() * self.speed;

        let duration = clip.duration();
        if duration <= 0.0 {
            return;
        }
        if self.looping {
            self.time %= duration;
        } else {
            self.time = self.time.min(duration);
        }
    }

    /// Write the sampled pose of the active clip into the graph.
    pub fn apply(&self, graph: &mut SceneGraph) {
        let Some(clip) = self.clips.get(self.active) else {
            return;
        };
        for channel in &clip.channels {
            let local = &mut graph.node_mut(channel.target).local;
            match &channel.keyframes {
                Keyframes::Translation(frames) => {
                    if let Some(v) = sample_vec3(&channel.timestamps, frames, self.time) {
                        local.position = v;
                    }
                }
                Keyframes::Rotation(frames) => {
                    if let Some(q) = sample_quat(&channel.timestamps, frames, self.time) {
                        local.rotation = q;
                    }
                }
                Keyframes::Scale(frames) => {
                    if let Some(v) = sample_vec3(&channel.timestamps, frames, self.time) {
                        local.scale = v;
                    }
                }
            }
        }
    }
}

/// Index of the keyframe at or before `t`, plus the interpolation factor
/// toward the next one. None when the channel has no usable data.
fn locate(timestamps: &[f32], frames_len: usize, t: f32) -> Option<(usize, usize, f32)> {
    let len = timestamps.len().min(frames_len);
    if len == 0 {
        return None;
    }
    if t <= timestamps[0] {
        return Some((0, 0, 0.0));
    }
    let last = len - 1;
    if t >= timestamps[last] {
        return Some((last, last, 0.0));
    }
    let next = timestamps[..len].partition_point(|&ts| ts <= t);
    let prev = next - 1;
    let span = timestamps[next] - timestamps[prev];
    let alpha = if span > 0.0 {
        (t - timestamps[prev]) / span
    } else {
        0.0
    };
    Some((prev, next, alpha))
}

fn sample_vec3(timestamps: &[f32], frames: &[Vector3<f32>], t: f32) -> Option<Vector3<f32>> {
    let (prev, next, alpha) = locate(timestamps, frames.len(), t)?;
    Some(frames[prev].lerp(frames[next], alpha))
}

fn sample_quat(timestamps: &[f32], frames: &[Quaternion<f32>], t: f32) -> Option<Quaternion<f32>> {
    let (prev, next, alpha) = locate(timestamps, frames.len(), t)?;
    if prev == next {
        return Some(frames[prev]);
    }
    Some(frames[prev].slerp(frames[next], alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Transform;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_vec3_close(actual: Vector3<f32>, expected: Vector3<f32>) {
        for axis in 0..3 {
            assert!(
                (actual[axis] - expected[axis]).abs() < 1e-6,
                "expected {expected:?}, got {actual:?}"
            );
        }
    }

    fn one_node_graph() -> (SceneGraph, NodeId) {
        let mut graph = SceneGraph::new();
        let node = graph.add_node(None, "target", Transform::new(), None);
        (graph, node)
    }

    fn translation_clip(target: NodeId) -> AnimationClip {
        AnimationClip {
            name: "slide".into(),
            channels: vec![Channel {
                target,
                timestamps: vec![0.0, 1.0, 2.0],
                keyframes: Keyframes::Translation(vec![
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(1.0, 1.0, 0.0),
                ]),
            }],
        }
    }

    #[test]
    fn advance_scales_delta_by_speed() {
        let (_, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);
        player.speed = 2.0;

        player.advance(Duration::from_secs_f32(0.016));
        assert_close(player.time(), 0.032);
    }

    #[test]
    fn advance_is_monotone_while_running() {
        let (_, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);
        player.looping = false;

        let mut last = player.time();
        for _ in 0..50 {
            player.advance(Duration::from_millis(16));
            assert!(player.time() >= last);
            last = player.time();
        }
    }

    #[test]
    fn stopped_player_does_not_move() {
        let (_, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);
        player.running = false;

        player.advance(Duration::from_secs(1));
        assert_eq!(player.time(), 0.0);
    }

    #[test]
    fn looping_wraps_at_clip_duration() {
        let (_, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);

        player.advance(Duration::from_secs_f32(2.5));
        assert_close(player.time(), 0.5);
    }

    #[test]
    fn apply_interpolates_between_keyframes() {
        let (mut graph, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);
        player.looping = false;

        player.advance(Duration::from_secs_f32(0.5));
        player.apply(&mut graph);
        assert_vec3_close(graph.node(node).local.position, Vector3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn apply_clamps_past_the_last_keyframe() {
        let (mut graph, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![translation_clip(node)]);
        player.looping = false;

        player.advance(Duration::from_secs(5));
        player.apply(&mut graph);
        assert_vec3_close(graph.node(node).local.position, Vector3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn switching_clips_restarts_time() {
        let (_, node) = one_node_graph();
        let mut player = AnimationPlayer::new(vec![
            translation_clip(node),
            AnimationClip {
                name: "other".into(),
                channels: vec![],
            },
        ]);

        player.advance(Duration::from_secs_f32(1.5));
        assert!(player.time() > 0.0);
        player.set_active_clip(1);
        assert_eq!(player.time(), 0.0);
        assert_eq!(player.active_clip(), 1);
    }
}
