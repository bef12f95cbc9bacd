//! Time-varying textures refreshed from a decoding frame source.
//!
//! Once per frame the update loop polls every [`VideoTexture`]'s source with
//! the elapsed delta; a frame that became ready is held as pending until
//! [`upload`](VideoTexture::upload) writes it into the GPU texture right
//! before rendering. A source that yields nothing costs nothing.

use std::sync::Arc;

use instant::Duration;

use crate::texture::Texture;

/// One decoded RGBA frame. Cheap to clone; the pixel data is shared.
#[derive(Clone, Debug)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<Vec<u8>>,
}

/// Produces decoded frames as playback time passes.
pub trait FrameSource {
    /// Advance playback by `dt` and return the newest frame that became
    /// available, if any. Intermediate frames skipped by a large delta are
    /// dropped, not queued.
    fn poll(&mut self, dt: Duration) -> Option<RgbaFrame>;

    fn dimensions(&self) -> (u32, u32);
}

/// A texture whose pixel data follows a [`FrameSource`].
pub struct VideoTexture {
    texture: Texture,
    source: Box<dyn FrameSource>,
    pending: Option<RgbaFrame>,
}

impl VideoTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, source: Box<dyn FrameSource>) -> Self {
        let (width, height) = source.dimensions();
        let placeholder = vec![0u8; (width * height * 4) as usize];
        let texture = Texture::from_rgba(device, queue, &placeholder, width, height, "video");
        Self {
            texture,
            source,
            pending: None,
        }
    }

    /// Clones share the underlying GPU texture, so a material built from this
    /// sees every later [`upload`](Self::upload).
    pub fn texture(&self) -> Texture {
        self.texture.clone()
    }

    /// Poll the source; a yielded frame is marked for re-upload.
    pub fn poll_source(&mut self, dt: Duration) {
        if let Some(frame) = self.source.poll(dt) {
            self.pending = Some(frame);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Write the pending frame into the texture, if there is one.
    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if let Some(frame) = self.pending.take() {
            self.texture
                .write_rgba(queue, &frame.data, frame.width, frame.height);
        }
    }
}

/// Pre-decoded frames played back at a fixed rate, looping.
pub struct ImageSequence {
    frames: Vec<RgbaFrame>,
    frame_time: Duration,
    acc: Duration,
    cursor: usize,
}

impl ImageSequence {
    /// `frames` must be non-empty and uniformly sized; `fps` > 0.
    pub fn new(frames: Vec<RgbaFrame>, fps: f32) -> Self {
        assert!(!frames.is_empty(), "image sequence needs at least one frame");
        Self {
            frames,
            frame_time: Duration::from_secs_f32(1.0 / fps),
            acc: Duration::ZERO,
            cursor: 0,
        }
    }

    /// Decode a list of encoded images (PNG, JPEG, ...) into a sequence.
    pub fn decode(encoded: &[Vec<u8>], fps: f32) -> anyhow::Result<Self> {
        let mut frames = Vec::with_capacity(encoded.len());
        for bytes in encoded {
            let img = image::load_from_memory(bytes)?;
            let rgba = img.to_rgba8();
            frames.push(RgbaFrame {
                width: rgba.width(),
                height: rgba.height(),
                data: Arc::new(rgba.into_raw()),
            });
        }
        Ok(Self::new(frames, fps))
    }
}

impl FrameSource for ImageSequence {
    fn poll(&mut self, dt: Duration) -> Option<RgbaFrame> {
        self.acc += dt;
        let mut advanced = false;
        while self.acc >= self.frame_time {
            self.acc -= self.frame_time;
            self.cursor = (self.cursor + 1) % self.frames.len();
            advanced = true;
        }
        advanced.then(|| self.frames[self.cursor].clone())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frames[0].width, self.frames[0].height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> RgbaFrame {
        RgbaFrame {
            width: 1,
            height: 1,
            data: Arc::new(vec![tag, 0, 0, 255]),
        }
    }

    fn sequence(n: u8, fps: f32) -> ImageSequence {
        ImageSequence::new((0..n).map(frame).collect(), fps)
    }

    #[test]
    fn no_frame_before_the_frame_time_elapses() {
        let mut seq = sequence(4, 10.0);
        assert!(seq.poll(Duration::from_millis(40)).is_none());
        assert!(seq.poll(Duration::from_millis(40)).is_none());
    }

    #[test]
    fn yields_the_next_frame_after_one_period() {
        let mut seq = sequence(4, 10.0);
        let frame = seq.poll(Duration::from_millis(100)).unwrap();
        assert_eq!(frame.data[0], 1);
    }

    #[test]
    fn large_delta_skips_to_the_newest_frame() {
        let mut seq = sequence(4, 10.0);
        // 350ms at 10fps crosses three frame boundaries; only the last matters
        let frame = seq.poll(Duration::from_millis(350)).unwrap();
        assert_eq!(frame.data[0], 3);
    }

    #[test]
    fn playback_loops() {
        let mut seq = sequence(2, 10.0);
        let frame = seq.poll(Duration::from_millis(200)).unwrap();
        assert_eq!(frame.data[0], 0);
    }
}
