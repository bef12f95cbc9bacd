//! A quad whose texture is refreshed from a decoding image sequence, the
//! same contract a video texture has: new frame available, re-upload.

use vignette::assets::{AssetServer, load_binary};
use vignette::context::Context;
use vignette::graph::Transform;
use vignette::model::{Material, Model, diffuse_layout, quad_mesh};
use vignette::panel::Panel;
use vignette::stage::{self, Scene};
use vignette::state::SceneState;
use vignette::video::{ImageSequence, VideoTexture};

const FRAME_COUNT: usize = 24;
const FRAME_RATE: f32 = 12.0;

struct Billboard;

impl Scene for Billboard {
    fn on_ready(
        &mut self,
        ctx: &mut Context,
        _state: &mut SceneState,
        _panel: &mut Panel,
        assets: &AssetServer,
    ) {
        ctx.camera.camera.distance = 4.0;

        assets.spawn(
            "frames",
            futures::future::try_join_all((0..FRAME_COUNT).map(|i| async move {
                load_binary(&format!("frames/frame_{i:02}.png")).await
            })),
            |encoded, ctx, state, panel| {
                let sequence = match ImageSequence::decode(&encoded, FRAME_RATE) {
                    Ok(sequence) => sequence,
                    Err(e) => {
                        log::warn!("could not decode the frame sequence: {e:#}");
                        return;
                    }
                };

                let video = VideoTexture::new(&ctx.device, &ctx.queue, Box::new(sequence));
                let layout = diffuse_layout(&ctx.device);
                let material = Material::new(&ctx.device, "billboard", video.texture(), &layout);
                let mesh = quad_mesh(&ctx.device, "billboard");
                let handle = state.models.insert(
                    &ctx.device,
                    Model {
                        meshes: vec![mesh],
                        materials: vec![material],
                    },
                );
                let node =
                    state
                        .graph
                        .add_node(None, "billboard", Transform::new(), Some(handle));
                state.videos.push(video);

                panel.group("billboard").slider(
                    "size",
                    0.5..=4.0,
                    move |s| s.graph.node(node).local.scale.x,
                    move |s, v| {
                        s.graph.node_mut(node).local.scale = [v, v, 1.0].into();
                    },
                );
            },
        );
    }
}

fn main() -> anyhow::Result<()> {
    stage::run(Billboard)
}
