//! The first scene: a pink box, a perspective camera, resize handling.

use cgmath::{Deg, Quaternion, Rotation3};
use vignette::assets::AssetServer;
use vignette::context::Context;
use vignette::graph::{NodeId, Transform};
use vignette::model::{Material, Model, cube_mesh, diffuse_layout};
use vignette::panel::Panel;
use vignette::stage::{self, Scene};
use vignette::state::SceneState;
use vignette::texture::Texture;

#[derive(Default)]
struct FirstScene {
    cube: Option<NodeId>,
}

impl Scene for FirstScene {
    fn on_ready(
        &mut self,
        ctx: &mut Context,
        state: &mut SceneState,
        _panel: &mut Panel,
        _assets: &AssetServer,
    ) {
        ctx.camera.camera.distance = 3.0;

        let layout = diffuse_layout(&ctx.device);
        let pink = Texture::solid_color(&ctx.device, &ctx.queue, [255, 105, 180, 255], "pink");
        let material = Material::new(&ctx.device, "pink", pink, &layout);
        let mesh = cube_mesh(&ctx.device, "box");
        let handle = state.models.insert(
            &ctx.device,
            Model {
                meshes: vec![mesh],
                materials: vec![material],
            },
        );
        self.cube = Some(
            state
                .graph
                .add_node(None, "box", Transform::new(), Some(handle)),
        );
    }

    fn on_update(&mut self, _ctx: &mut Context, state: &mut SceneState, _dt: std::time::Duration) {
        // A slow turn, so there is something to watch besides the clear color.
        if let Some(cube) = self.cube {
            let angle = Deg(20.0 * state.elapsed.as_secs_f32());
            state.graph.node_mut(cube).local.rotation = Quaternion::from_angle_y(angle);
        }
    }
}

fn main() -> anyhow::Result<()> {
    stage::run(FirstScene::default())
}
