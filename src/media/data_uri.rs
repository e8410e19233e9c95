use base64ct::{Base64, Encoding};

use super::CodecError;

/// Mime type assumed for a bare base64 payload.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Decoded inline media: raw bytes plus the mime type they were tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl MediaRef {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_data_uri(&self) -> String {
        to_data_uri(&self.data, &self.mime_type)
    }
}

/// `data:<mime>;base64,<payload>`
pub fn to_data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, Base64::encode_string(bytes))
}

/// Accepts a full data URI or a bare base64 payload.
pub fn from_data_uri(text: &str) -> Result<MediaRef, CodecError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CodecError::Empty);
    }

    let (mime_type, payload) = match text.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(CodecError::MissingPayload)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| CodecError::NotBase64(header.to_string()))?;
            let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
            (mime.to_string(), payload)
        }
        None => (DEFAULT_MIME.to_string(), text),
    };

    let data = Base64::decode_vec(payload).map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
    Ok(MediaRef { mime_type, data })
}

/// Sample rate advertised by a raw PCM mime such as `audio/L16;codec=pcm;rate=24000`.
pub fn pcm_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse::<u32>().ok())
        .unwrap_or(super::DEFAULT_SPEECH_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes_and_mime() {
        let bytes = vec![0u8, 1, 2, 254, 255, 42, 7];
        let uri = to_data_uri(&bytes, "image/png");
        assert!(uri.starts_with("data:image/png;base64,"));

        let decoded = from_data_uri(&uri).expect("decode");
        assert_eq!(decoded.data, bytes);
        assert_eq!(decoded.mime_type, "image/png");
    }

    #[test]
    fn keeps_mime_parameters() {
        let uri = to_data_uri(b"pcm", "audio/L16;codec=pcm;rate=24000");
        let decoded = from_data_uri(&uri).unwrap();
        assert_eq!(decoded.mime_type, "audio/L16;codec=pcm;rate=24000");
        assert_eq!(decoded.data, b"pcm");
    }

    #[test]
    fn accepts_bare_payload() {
        let decoded = from_data_uri("aGVsbG8=").unwrap();
        assert_eq!(decoded.data, b"hello");
        assert_eq!(decoded.mime_type, DEFAULT_MIME);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(from_data_uri("   "), Err(CodecError::Empty)));
        assert!(matches!(
            from_data_uri("data:image/png;base64"),
            Err(CodecError::MissingPayload)
        ));
        assert!(matches!(
            from_data_uri("data:text/plain,hello"),
            Err(CodecError::NotBase64(_))
        ));
        assert!(matches!(
            from_data_uri("data:image/png;base64,@@@"),
            Err(CodecError::InvalidBase64(_))
        ));
    }

    #[test]
    fn reads_pcm_rate() {
        assert_eq!(pcm_rate_from_mime("audio/L16;codec=pcm;rate=48000"), 48000);
        assert_eq!(pcm_rate_from_mime("audio/L16"), 24000);
    }
}
