//! Audio output and the exclusive-selection soundboard.
//!
//! [`AudioOutput`] wraps the kira manager plus one listener. When no audio
//! device is available the whole subsystem stays inert instead of failing
//! startup. [`Soundboard`] holds alternative tracks and guarantees that at
//! most one of them is playing at any observed instant: `select` is the only
//! way to start a track, and it stops the previous one first.

use kira::listener::ListenerHandle;
use kira::sound::PlaybackState;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::track::{SpatialTrackBuilder, SpatialTrackHandle};
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};

struct AudioOutputInner {
    manager: AudioManager<DefaultBackend>,
    listener: ListenerHandle,
}

impl AudioOutputInner {
    fn new() -> Option<Self> {
        let mut manager = match AudioManager::new(AudioManagerSettings::default()) {
            Ok(manager) => manager,
            Err(e) => {
                log::error!("audio manager could not be initialized: {e:?}");
                return None;
            }
        };

        let listener = match manager.add_listener([0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]) {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("failed to add audio listener: {e}");
                return None;
            }
        };

        Some(Self { manager, listener })
    }
}

/// Handle to the host's audio device, or an inert stub when there is none.
pub struct AudioOutput {
    inner: Option<AudioOutputInner>,
}

impl Default for AudioOutput {
    fn default() -> Self {
        Self {
            inner: AudioOutputInner::new(),
        }
    }
}

impl AudioOutput {
    /// Move the listener; called once per frame with the camera eye.
    pub fn set_listener_position(&mut self, position: [f32; 3]) {
        if let Some(this) = self.inner.as_mut() {
            this.listener.set_position(position, Tween::default());
        }
    }

    pub fn set_listener_orientation(&mut self, orientation: [f32; 4]) {
        if let Some(this) = self.inner.as_mut() {
            this.listener.set_orientation(orientation, Tween::default());
        }
    }

    /// Returns `None` without a device or when the spatial track limit is hit.
    pub fn add_spatial_track(
        &mut self,
        position: [f32; 3],
        track: SpatialTrackBuilder,
    ) -> Option<SpatialTrackHandle> {
        self.inner.as_mut().and_then(|this| {
            this.manager
                .add_spatial_sub_track(this.listener.id(), position, track)
                .ok()
        })
    }

    fn play(&mut self, sound: StaticSoundData) -> Option<StaticSoundHandle> {
        self.inner
            .as_mut()
            .and_then(|this| this.manager.play(sound).ok())
    }
}

/// Control seam over one playable track, so the soundboard's exclusivity
/// logic stays testable without an audio device.
pub trait Playback {
    /// Start from the beginning. Returns false when playback could not start.
    fn begin(&mut self, output: &mut AudioOutput) -> bool;
    fn halt(&mut self);
    fn is_playing(&self) -> bool;
}

/// A decoded sound, optionally positioned in the scene.
pub struct AudioTrack {
    pub name: String,
    sound: StaticSoundData,
    spatial: Option<SpatialTrackHandle>,
    handle: Option<StaticSoundHandle>,
}

impl AudioTrack {
    pub fn new(name: impl Into<String>, sound: StaticSoundData) -> Self {
        Self {
            name: name.into(),
            sound,
            spatial: None,
            handle: None,
        }
    }

    /// Give the track a position; perceived volume and pan then depend on the
    /// listener. Without a device this is a no-op and the track stays flat.
    pub fn positioned(mut self, output: &mut AudioOutput, position: [f32; 3]) -> Self {
        self.spatial = output.add_spatial_track(position, SpatialTrackBuilder::new());
        self
    }

    pub fn set_position(&mut self, position: [f32; 3]) {
        if let Some(track) = self.spatial.as_mut() {
            track.set_position(position, Tween::default());
        }
    }
}

impl Playback for AudioTrack {
    fn begin(&mut self, output: &mut AudioOutput) -> bool {
        self.halt();
        self.handle = match self.spatial.as_mut() {
            Some(track) => track.play(self.sound.clone()).ok(),
            None => output.play(self.sound.clone()),
        };
        self.handle.is_some()
    }

    fn halt(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop(Tween::default());
        }
    }

    fn is_playing(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| h.state() == PlaybackState::Playing)
    }
}

/// Alternative tracks with one exclusive active selection.
pub struct Soundboard<T: Playback = AudioTrack> {
    tracks: Vec<T>,
    active: Option<usize>,
}

impl<T: Playback> Default for Soundboard<T> {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            active: None,
        }
    }
}

impl<T: Playback> Soundboard<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_track(&mut self, track: T) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn track(&self, idx: usize) -> Option<&T> {
        self.tracks.get(idx)
    }

    pub fn track_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.tracks.get_mut(idx)
    }

    /// Switch the active selection. The previously active track is stopped
    /// before the new one starts; `None` stops everything. Out-of-range
    /// choices stop the current track and leave nothing selected.
    pub fn select(&mut self, output: &mut AudioOutput, choice: Option<usize>) {
        if let Some(previous) = self.active.take() {
            if let Some(track) = self.tracks.get_mut(previous) {
                track.halt();
            }
        }
        if let Some(idx) = choice {
            if let Some(track) = self.tracks.get_mut(idx) {
                if track.begin(output) {
                    self.active = Some(idx);
                }
            }
        }
    }

    /// How many tracks report playing right now. The soundboard invariant is
    /// that this never exceeds one.
    pub fn playing_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_playing()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Playback stub; flips a flag instead of touching a device.
    struct FakeTrack {
        playing: bool,
        can_start: bool,
    }

    impl FakeTrack {
        fn new() -> Self {
            Self {
                playing: false,
                can_start: true,
            }
        }

        fn broken() -> Self {
            Self {
                playing: false,
                can_start: false,
            }
        }
    }

    impl Playback for FakeTrack {
        fn begin(&mut self, _: &mut AudioOutput) -> bool {
            self.playing = self.can_start;
            self.playing
        }

        fn halt(&mut self) {
            self.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    fn board(n: usize) -> (Soundboard<FakeTrack>, AudioOutput) {
        let mut board = Soundboard::new();
        for _ in 0..n {
            board.add_track(FakeTrack::new());
        }
        // No assertion on an actual device here; FakeTrack never touches it.
        (board, AudioOutput { inner: None })
    }

    #[test]
    fn at_most_one_track_plays() {
        let (mut board, mut out) = board(3);

        for choice in [Some(0), Some(1), Some(2), Some(1), None, Some(0)] {
            board.select(&mut out, choice);
            assert!(board.playing_count() <= 1);
            assert_eq!(board.active(), choice.filter(|&i| i < 3));
        }
    }

    #[test]
    fn selecting_a_new_track_stops_the_old_one() {
        let (mut board, mut out) = board(2);

        board.select(&mut out, Some(0));
        assert!(board.track(0).unwrap().is_playing());

        board.select(&mut out, Some(1));
        assert!(!board.track(0).unwrap().is_playing());
        assert!(board.track(1).unwrap().is_playing());
    }

    #[test]
    fn selecting_none_silences_the_board() {
        let (mut board, mut out) = board(2);

        board.select(&mut out, Some(1));
        board.select(&mut out, None);
        assert_eq!(board.playing_count(), 0);
        assert_eq!(board.active(), None);
    }

    #[test]
    fn failed_start_leaves_no_active_selection() {
        let mut board: Soundboard<FakeTrack> = Soundboard::new();
        board.add_track(FakeTrack::broken());
        let mut out = AudioOutput { inner: None };

        board.select(&mut out, Some(0));
        assert_eq!(board.active(), None);
        assert_eq!(board.playing_count(), 0);
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let (mut board, mut out) = board(1);

        board.select(&mut out, Some(0));
        board.select(&mut out, Some(7));
        assert_eq!(board.active(), None);
        assert_eq!(board.playing_count(), 0);
    }
}
