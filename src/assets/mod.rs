//! Decoding of external media: generated frame images and audio sources.

pub(crate) mod decode;
pub(crate) mod media;

pub use media::{
    AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo, is_ffmpeg_on_path, load_audio, read_wav,
};
