//! Update-loop behavior across modules: advancing the scene state moves
//! animated nodes by delta x speed and nothing else.

use std::time::Duration;

use cgmath::Vector3;
use vignette::anim::{AnimationClip, AnimationPlayer, Channel, Keyframes};
use vignette::graph::{NodeId, Transform};
use vignette::state::SceneState;

fn assert_vec3_close(actual: Vector3<f32>, expected: Vector3<f32>) {
    for axis in 0..3 {
        assert!(
            (actual[axis] - expected[axis]).abs() < 1e-6,
            "expected {expected:?}, got {actual:?}"
        );
    }
}

fn slide_clip(target: NodeId) -> AnimationClip {
    AnimationClip {
        name: "slide".into(),
        channels: vec![Channel {
            target,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
            ]),
        }],
    }
}

fn state_with_player() -> (SceneState, NodeId) {
    let mut state = SceneState::new();
    let node = state.graph.add_node(None, "animated", Transform::new(), None);
    let mut player = AnimationPlayer::new(vec![slide_clip(node)]);
    player.looping = false;
    state.players.push(player);
    (state, node)
}

#[test]
fn advancing_the_state_moves_animated_nodes() {
    let (mut state, node) = state_with_player();

    state.advance(Duration::from_secs_f32(0.25));
    assert_vec3_close(
        state.graph.node(node).local.position,
        Vector3::new(0.25, 0.0, 0.0),
    );
}

#[test]
fn speed_factor_scales_the_advance() {
    let (mut state, _node) = state_with_player();
    state.players[0].speed = 2.0;

    state.advance(Duration::from_secs_f32(0.016));
    let time = state.players[0].time();
    assert!((time - 0.032).abs() < 1e-6, "expected 0.032, got {time}");
}

#[test]
fn a_stopped_player_keeps_its_clip_time() {
    let (mut state, node) = state_with_player();
    state.players[0].running = false;

    for _ in 0..10 {
        state.advance(Duration::from_millis(100));
    }
    assert_eq!(state.players[0].time(), 0.0);
    // The pose stays pinned at the clip start.
    assert_vec3_close(
        state.graph.node(node).local.position,
        Vector3::new(0.0, 0.0, 0.0),
    );
}

#[test]
fn repeated_small_deltas_accumulate_monotonically() {
    let (mut state, _node) = state_with_player();

    let mut last = 0.0;
    for _ in 0..30 {
        state.advance(Duration::from_millis(16));
        let time = state.players[0].time();
        assert!(time >= last);
        last = time;
    }
    assert!((last - 0.48).abs() < 1e-3, "expected 0.48, got {last}");
}
