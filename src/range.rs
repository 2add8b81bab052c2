//! Half-open bit intervals used by mappings and slicing.

use crate::bits::mask_for;

/// Bits `[start, stop)`. `stop == None` runs to the end of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitRange {
    pub start: u32,
    pub stop: Option<u32>,
}

impl BitRange {
    /// Range `[start, stop)`. Callers guarantee `start < stop`.
    pub fn new(start: u32, stop: u32) -> Self {
        BitRange {
            start,
            stop: Some(stop),
        }
    }

    /// Open-ended range starting at `start`.
    pub fn open(start: u32) -> Self {
        BitRange { start, stop: None }
    }

    /// Single bit `[index, index + 1)`.
    pub fn bit(index: u32) -> Self {
        BitRange::new(index, index.saturating_add(1))
    }

    pub fn is_open(&self) -> bool {
        self.stop.is_none()
    }

    /// Width in bits, if bounded.
    pub fn len(&self) -> Option<u32> {
        self.stop.map(|stop| stop.saturating_sub(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Mask of the bounded bits; an open range claims only its start bit.
    pub fn mask(&self) -> u128 {
        match self.stop {
            Some(stop) => mask_for(self.start, stop),
            None => mask_for(self.start, self.start.saturating_add(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_mask() {
        assert_eq!(BitRange::new(1, 3).mask(), 0b110);
        assert_eq!(BitRange::new(1, 3).len(), Some(2));
    }

    #[test]
    fn test_single_bit() {
        assert_eq!(BitRange::bit(4), BitRange::new(4, 5));
        assert_eq!(BitRange::bit(4).mask(), 0b10000);
    }

    #[test]
    fn test_open_claims_start_bit() {
        let range = BitRange::open(3);
        assert!(range.is_open());
        assert_eq!(range.len(), None);
        assert_eq!(range.mask(), 0b1000);
    }
}
