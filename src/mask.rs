//! Payload masking as described in [RFC 6455 Section 5.3](https://datatracker.ietf.org/doc/html/rfc6455#section-5.3).
//!
//! Masking is an XOR with a 4-byte key, so applying the same key twice restores the input.

/// Mask or unmask `buf` in place with `mask`.
///
/// The bulk of the buffer is processed one 32-bit word at a time; each word starts at an
/// offset that is a multiple of four, so the key never needs rotating.
#[inline]
pub(crate) fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);

    let mut words = buf.chunks_exact_mut(4);
    for word in &mut words {
        let value = u32::from_ne_bytes([word[0], word[1], word[2], word[3]]) ^ mask_u32;
        word.copy_from_slice(&value.to_ne_bytes());
    }

    apply_mask_bytewise(words.into_remainder(), mask);
}

/// Byte-at-a-time masking, used for the tail of the buffer.
#[inline]
fn apply_mask_bytewise(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}
