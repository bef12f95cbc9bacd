//! Three positional audio tracks with an exclusive selection: starting one
//! stops whichever was playing. Each track loads independently; the choice
//! binding is rebuilt as tracks arrive.

use vignette::assets::{AssetServer, audio};
use vignette::audio::AudioTrack;
use vignette::context::Context;
use vignette::graph::Transform;
use vignette::model::{Material, Model, cube_mesh, diffuse_layout};
use vignette::panel::Panel;
use vignette::stage::{self, Scene};
use vignette::state::SceneState;
use vignette::texture::Texture;

const TRACKS: [(&str, &str, [f32; 3]); 3] = [
    ("drums", "audio/drums.ogg", [-4.0, 0.0, 0.0]),
    ("keys", "audio/keys.ogg", [0.0, 0.0, -4.0]),
    ("bass", "audio/bass.ogg", [4.0, 0.0, 0.0]),
];

struct Jukebox;

impl Scene for Jukebox {
    fn on_ready(
        &mut self,
        ctx: &mut Context,
        state: &mut SceneState,
        _panel: &mut Panel,
        assets: &AssetServer,
    ) {
        ctx.camera.camera.distance = 12.0;

        // A marker cube per speaker position.
        let layout = diffuse_layout(&ctx.device);
        let texture = Texture::solid_color(&ctx.device, &ctx.queue, [80, 170, 255, 255], "speaker");
        let material = Material::new(&ctx.device, "speaker", texture, &layout);
        let mesh = cube_mesh(&ctx.device, "speaker");
        let handle = state.models.insert(
            &ctx.device,
            Model {
                meshes: vec![mesh],
                materials: vec![material],
            },
        );
        for (name, _, position) in TRACKS {
            state
                .graph
                .add_node(None, name, Transform::from_position(position), Some(handle));
        }

        for (name, path, position) in TRACKS {
            assets.spawn(path, audio::load_sound(path), move |sound, _ctx, state, panel| {
                let track = AudioTrack::new(name, sound).positioned(&mut state.audio, position);
                state.soundboard.add_track(track);

                // Tracks resolve in any order; rebuild the exclusive choice
                // over whatever has arrived so far.
                let names: Vec<String> = (0..state.soundboard.len())
                    .filter_map(|i| state.soundboard.track(i).map(|t| t.name.clone()))
                    .collect();
                let group = panel.group("audio");
                group.clear();
                group.choice(
                    "track",
                    names,
                    |s| s.soundboard.active(),
                    |s, choice| s.soundboard.select(&mut s.audio, choice),
                );
            });
        }
    }
}

fn main() -> anyhow::Result<()> {
    stage::run(Jukebox)
}
