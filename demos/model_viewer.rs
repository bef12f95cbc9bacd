//! Streams in an animated GLTF model and binds its player to the panel.
//!
//! Until the load resolves the scene stays empty and the panel shows no
//! animation group at all; a failed load leaves it that way.

use vignette::anim::AnimationPlayer;
use vignette::assets::{AssetServer, gltf};
use vignette::context::Context;
use vignette::panel::Panel;
use vignette::stage::{self, Scene};
use vignette::state::SceneState;

const MODEL: &str = "models/fox.glb";

struct ModelViewer;

impl Scene for ModelViewer {
    fn on_ready(
        &mut self,
        ctx: &mut Context,
        _state: &mut SceneState,
        _panel: &mut Panel,
        assets: &AssetServer,
    ) {
        ctx.camera.camera.distance = 8.0;

        assets.spawn(MODEL, gltf::load_gltf(MODEL), |data, ctx, state, panel| {
            let spawned = gltf::instantiate(data, &ctx.device, &ctx.queue, state, None);
            if spawned.clips.is_empty() {
                // Static model: nothing to drive, nothing to bind.
                return;
            }

            let player = AnimationPlayer::new(spawned.clips);
            let clip_names = player.clip_names();
            let idx = state.players.len();
            state.players.push(player);

            let group = panel.group("animation");
            group.toggle(
                "run",
                move |s| s.players[idx].running,
                move |s, v| s.players[idx].running = v,
            );
            group.slider(
                "speed",
                0.0..=3.0,
                move |s| s.players[idx].speed,
                move |s, v| s.players[idx].speed = v,
            );
            group.choice(
                "clip",
                clip_names,
                move |s| s.players[idx].running.then(|| s.players[idx].active_clip()),
                move |s, choice| match choice {
                    Some(clip) => {
                        s.players[idx].set_active_clip(clip);
                        s.players[idx].running = true;
                    }
                    None => s.players[idx].running = false,
                },
            );
        });
    }
}

fn main() -> anyhow::Result<()> {
    stage::run(ModelViewer)
}
