//! # Quantization codec
//!
//! Bin boundaries are expressed in permille (0..=1000) while the hardware table has
//! [SLOT_COUNT] slots. 1024 is not a multiple of 1000, so the forward mapping skips a few slots
//! and the inverse is kept as an explicit table rather than a division.
//!
//! ```
//! use steertab_core::quant::{to_permille, to_slot};
//!
//! assert_eq!(to_slot(500), 512);
//! assert_eq!(to_permille(512), 500);
//! assert_eq!(to_slot(999), 1023);
//! ```
use once_cell::sync::Lazy;

/// Number of slots in one bank of the slot table.
pub const SLOT_COUNT: usize = 1024;

/// Upper bound of the permille scale, also the "past the end" value of the inverse table.
pub const PERMILLE_MAX: u32 = 1000;

/// Maps a permille value to the first slot it covers.
///
/// `999` maps to the last slot so the top of the table stays reachable. Anything at or above
/// [PERMILLE_MAX] saturates to [SLOT_COUNT], which is what a `max` boundary of 1000 needs.
#[inline]
pub fn to_slot(permille: u32) -> usize {
    match permille {
        999 => SLOT_COUNT - 1,
        p if p >= PERMILLE_MAX => SLOT_COUNT,
        p => p as usize * SLOT_COUNT / PERMILLE_MAX as usize,
    }
}

// slot -> smallest permille landing on it; slots never hit hold PERMILLE_MAX
static INVERSE: Lazy<[u16; SLOT_COUNT + 1]> = Lazy::new(|| {
    let mut inverse = [PERMILLE_MAX as u16; SLOT_COUNT + 1];
    for p in (0..PERMILLE_MAX).rev() {
        inverse[to_slot(p)] = p as u16;
    }
    inverse
});

/// Maps a slot index back to a permille boundary. Indices above [SLOT_COUNT] saturate.
#[inline]
pub fn to_permille(slot: usize) -> u32 {
    INVERSE[slot.min(SLOT_COUNT)] as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(to_slot(0), 0);
        assert_eq!(to_slot(999), 1023);
        assert_eq!(to_slot(998), 1021);
        assert_eq!(to_slot(1000), SLOT_COUNT);
        assert_eq!(to_slot(5000), SLOT_COUNT);
    }

    #[test]
    fn test_forward_is_strictly_increasing() {
        for p in 1..=PERMILLE_MAX {
            assert!(to_slot(p) > to_slot(p - 1), "{}", p);
        }
    }

    #[test]
    fn test_inverse_never_overruns() {
        for p in 0..PERMILLE_MAX {
            let s = to_slot(p);
            assert!(to_permille(s) <= p);
            assert_eq!(to_slot(to_permille(s)), s);
        }
    }

    #[test]
    fn test_uncovered_slots_are_past_the_end() {
        // 1022 sits between 998 (1021) and 999 (1023)
        assert_eq!(to_permille(1022), PERMILLE_MAX);
        assert_eq!(to_permille(SLOT_COUNT), PERMILLE_MAX);
        assert_eq!(to_permille(usize::MAX), PERMILLE_MAX);
        assert_eq!(to_permille(1023), 999);
    }
}
