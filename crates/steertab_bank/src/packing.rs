//! Bit layouts of the words written to the table registers.
//!
//! ```text
//! entry address:  | bank (bit 14) | index (bits 0..14) |
//! slot pair word: | pair address (bits 17..) | hi (bits 9..18) | lo (bits 0..9) |
//! ```
//!
//! The pair address is the even slot index plus `bank * 1024`, written at bit 17. As the slot
//! index is even, this is the pair number at bit 18, clear of the two value fields.
use bitvec::prelude::*;

use steertab_core::{
    quant::SLOT_COUNT,
    table::{SLOT_VALUE_BITS, SLOT_VALUE_MAX},
    Result, SteerError,
};

use crate::bank::Bank;

pub const ENTRY_BANK_BIT: u32 = 14;

pub const SLOT_PAIR_SHIFT: u32 = 17;

const LO: std::ops::Range<usize> = 0..SLOT_VALUE_BITS as usize;
const HI: std::ops::Range<usize> = SLOT_VALUE_BITS as usize..2 * SLOT_VALUE_BITS as usize;

/// Entry address in `bank`'s half of the address space.
#[inline]
pub fn entry_address(bank: Bank, address: u32) -> u32 {
    address | bank.index() << ENTRY_BANK_BIT
}

/// Address part of a slot pair word. `slot_index` is the even slot of the pair.
#[inline]
pub fn slot_pair_address(bank: Bank, slot_index: usize) -> u32 {
    debug_assert!(slot_index % 2 == 0 && slot_index < SLOT_COUNT);
    ((slot_index + bank.index() as usize * SLOT_COUNT) as u32) << SLOT_PAIR_SHIFT
}

/// Packs slots `slot_index` (`lo`) and `slot_index + 1` (`hi`) of `bank` into one word.
pub fn pack_slot_pair(bank: Bank, slot_index: usize, lo: u32, hi: u32) -> Result<u32> {
    for value in [lo, hi] {
        if value > SLOT_VALUE_MAX {
            return Err(SteerError::InvalidDestination {
                value,
                bits: SLOT_VALUE_BITS,
            });
        }
    }
    let mut word = slot_pair_address(bank, slot_index);
    let bits = word.view_bits_mut::<Lsb0>();
    bits[LO].store_le(lo);
    bits[HI].store_le(hi);
    Ok(word)
}

/// Value fields of a slot pair word: `(lo, hi)`.
pub fn unpack_slot_pair(word: u32) -> (u32, u32) {
    let bits = word.view_bits::<Lsb0>();
    (bits[LO].load_le(), bits[HI].load_le())
}

/// Address fields of a slot pair word: the bank and the even slot index.
pub fn slot_pair_target(word: u32) -> (Bank, usize) {
    let address = (word >> SLOT_PAIR_SHIFT) as usize & !1;
    let bank = Bank::from(address >= SLOT_COUNT);
    (bank, address % SLOT_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_address() {
        assert_eq!(entry_address(Bank::Zero, 0x20A3), 0x20A3);
        assert_eq!(entry_address(Bank::One, 0x20A3), 0x60A3);
    }

    #[test]
    fn test_pack_slot_pair() {
        let w = pack_slot_pair(Bank::Zero, 2, 0x1FF, 0x001).unwrap();
        assert_eq!(w, 2 << 17 | 0x001 << 9 | 0x1FF);
        assert_eq!(unpack_slot_pair(w), (0x1FF, 0x001));
        assert_eq!(slot_pair_target(w), (Bank::Zero, 2));

        let w = pack_slot_pair(Bank::One, 1022, 5, 6).unwrap();
        assert_eq!(slot_pair_target(w), (Bank::One, 1022));
        assert_eq!(unpack_slot_pair(w), (5, 6));
    }

    #[test]
    fn test_address_clear_of_values() {
        let w = pack_slot_pair(Bank::One, 1022, 0, 0).unwrap();
        assert_eq!(unpack_slot_pair(w), (0, 0));
        let w = pack_slot_pair(Bank::Zero, 0, SLOT_VALUE_MAX, SLOT_VALUE_MAX).unwrap();
        assert_eq!(w, (1 << 18) - 1);
    }

    #[test]
    fn test_pack_rejects_wide_values() {
        assert!(matches!(
            pack_slot_pair(Bank::Zero, 0, 0x200, 0),
            Err(SteerError::InvalidDestination { value: 0x200, .. })
        ));
    }
}
