//! Audio file loading into decoded, playable sound data.

use std::io::Cursor;

use kira::sound::static_sound::StaticSoundData;

use super::load_binary;

/// Fetch and decode an audio file (ogg, mp3, wav, flac). The returned data is
/// fully decoded and cheap to clone into playback.
pub async fn load_sound(file_name: &str) -> anyhow::Result<StaticSoundData> {
    let bytes = load_binary(file_name).await?;
    let sound = StaticSoundData::from_cursor(Cursor::new(bytes))?;
    Ok(sound)
}
