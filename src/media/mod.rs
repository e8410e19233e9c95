//! Data-URI encoding for inline prompt media and the PCM → WAV wrapper used
//! for synthesized speech.

mod data_uri;
mod wav;

pub use data_uri::{from_data_uri, pcm_rate_from_mime, to_data_uri, MediaRef};
pub use wav::pcm_to_wav;

/// Speech synthesis returns 24 kHz mono 16-bit PCM unless its mime says otherwise.
pub const DEFAULT_SPEECH_RATE: u32 = 24_000;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("empty media payload")]
    Empty,
    #[error("data uri has no payload")]
    MissingPayload,
    #[error("data uri is not base64 encoded: {0}")]
    NotBase64(String),
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
}
