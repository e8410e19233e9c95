use bytes::{BufMut, Bytes, BytesMut};

pub const WAV_HEADER_LEN: usize = 44;

/// Wraps headerless linear PCM in a RIFF/WAVE container.
///
/// Sizes are taken from `pcm.len()` as given; a buffer that does not end on a
/// frame boundary is written through unchanged.
pub fn pcm_to_wav(pcm: &[u8], channels: u16, sample_rate: u32, bit_depth: u16) -> Bytes {
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
    // Header fields saturate on out-of-range rates.
    let block_align = channels.saturating_mul(bit_depth / 8);
    let byte_rate = sample_rate.saturating_mul(u32::from(block_align));

    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + pcm.len());
    buf.put_slice(b"RIFF");
    buf.put_u32_le(data_len.saturating_add(36));
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1); // PCM
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(bit_depth);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);
    buf.freeze()
}
