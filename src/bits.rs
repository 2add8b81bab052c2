//! Range and mask arithmetic on `u128` values.
//!
//! Bits are addressed LSB-first: bit 0 is the least significant bit of the value.
//! All functions here are total; widths saturate at [MAX_WIDTH].

/// Widest value a view can hold, in bits.
pub const MAX_WIDTH: u32 = u128::BITS;

/// Mask with the low `n` bits set. Saturates at [MAX_WIDTH].
pub fn low_mask(n: u32) -> u128 {
    match 1u128.checked_shl(n) {
        Some(bit) => bit - 1,
        None => u128::MAX,
    }
}

/// Mask with exactly bits `[start, stop)` set. Empty when `stop <= start`.
pub fn mask_for(start: u32, stop: u32) -> u128 {
    low_mask(stop) & !low_mask(start)
}

/// Smallest `[start, stop)` range covering every set bit of `mask`.
pub fn range_of(mask: u128) -> Option<(u32, u32)> {
    if mask == 0 {
        return None;
    }

    Some((mask.trailing_zeros(), bit_length(mask)))
}

/// Number of bits needed to represent `value`; 0 for 0.
pub fn bit_length(value: u128) -> u32 {
    MAX_WIDTH - value.leading_zeros()
}

/// Configured size if present, otherwise the bit length of `value`.
pub fn width_of(size: Option<u32>, value: u128) -> u32 {
    size.unwrap_or_else(|| bit_length(value))
}

/// Bytes needed for `bits` bits, never less than 1.
pub fn byte_length(bits: u32) -> u32 {
    bits.div_ceil(8).max(1)
}

/// Sign-extends the low `bits` of `value` to a full `i128`.
pub fn sign_extend(value: u128, bits: u32) -> i128 {
    if bits == 0 {
        return 0;
    }

    let shift = MAX_WIDTH - bits.min(MAX_WIDTH);
    ((value << shift) as i128) >> shift
}
