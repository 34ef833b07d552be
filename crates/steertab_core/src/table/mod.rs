//! # Slot table
//!
//! ## Relations of important structs
//! ```text
//!   [BinRange] --validate_ranges--> --build_table--> SlotTable
//!                                                       |
//!                                                  reconstruct
//!                                                       v
//!                                                 Reconstruction
//! ```
//!
//! ## Example
//! ```
//! use steertab_core::table::{build_table, reconstruct_ranges, BinRange, EncodingMode};
//!
//! let bins = [BinRange::new(0, 500), BinRange::new(500, 1000)];
//! let table = build_table(&bins, EncodingMode::Exclusive, 1).unwrap();
//! assert_eq!(table[511], 0);
//! assert_eq!(table[512], 1);
//!
//! let ranges = reconstruct_ranges(&table, 2, EncodingMode::Exclusive);
//! assert_eq!(ranges, bins);
//! ```
mod construct;
mod reconstruct;
mod validate;

use std::{
    fmt::{Debug, Display, Formatter},
    ops::{Index, IndexMut},
};

use bitvec::prelude::*;

use crate::quant::SLOT_COUNT;

pub use construct::{bin_capacity, build_table};
pub use reconstruct::{reconstruct, reconstruct_ranges, Reconstruction};
pub use validate::validate_ranges;

/// Width of one slot value in the hardware table.
pub const SLOT_VALUE_BITS: u32 = 9;

/// Largest value a slot can hold.
pub const SLOT_VALUE_MAX: u32 = (1 << SLOT_VALUE_BITS) - 1;

/// How slot values name their owners.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// Each slot holds the index of the one bin owning it.
    #[default]
    Exclusive,
    /// Each slot holds a bitmask, one bit per bin.
    Bitmask,
}

impl EncodingMode {
    /// Whether `bin` owns a slot holding `value`.
    #[inline]
    pub fn is_member(self, value: u32, bin: usize) -> bool {
        match self {
            EncodingMode::Exclusive => value as usize == bin,
            EncodingMode::Bitmask => bin < u32::BITS as usize && value.view_bits::<Lsb0>()[bin],
        }
    }

    /// Keyword used in layout files.
    pub fn name(self) -> &'static str {
        match self {
            EncodingMode::Exclusive => "exclusive",
            EncodingMode::Bitmask => "bitmask",
        }
    }
}

impl Display for EncodingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Half-open permille interval `[min, max)` assigned to one bin. `min >= max` means the bin
/// receives nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct BinRange {
    pub min: u32,
    pub max: u32,
}

impl BinRange {
    /// The `[0, 0)` sentinel.
    pub const UNUSED: BinRange = BinRange { min: 0, max: 0 };

    pub const fn new(min: u32, max: u32) -> Self {
        BinRange { min, max }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }
}

impl Display for BinRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// Dense image of one bank of the hardware slot table.
#[derive(Clone, PartialEq, Eq)]
pub struct SlotTable([u32; SLOT_COUNT]);

impl SlotTable {
    pub const fn new() -> Self {
        SlotTable([0; SLOT_COUNT])
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Slot pairs in the order the hardware takes them: `(even slot index, low, high)`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, u32, u32)> + '_ {
        self.0
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| (i * 2, pair[0], pair[1]))
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u32; SLOT_COUNT]> for SlotTable {
    fn from(value: [u32; SLOT_COUNT]) -> Self {
        SlotTable(value)
    }
}

impl Index<usize> for SlotTable {
    type Output = u32;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for SlotTable {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

// runs of equal values: "0..=511: 0, 512..=1023: 1"
impl Debug for SlotTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut start = 0;
        for i in 1..=SLOT_COUNT {
            if i == SLOT_COUNT || self.0[i] != self.0[start] {
                if start > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}..={}: {:#x}", start, i - 1, self.0[start])?;
                start = i;
            }
        }
        Ok(())
    }
}
