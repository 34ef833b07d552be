//! # Classification address encoder
//!
//! A classification entry is addressed by packing the ingress interface, the color tag and the
//! hash value into the table's input bits:
//!
//! ```text
//!  input_bits-1    input_bits-2
//! +--------------+ ... +-------------------+------------------+
//! |   iface (2)  | 0.. |  color (cw bits)  |  hash (hw bits)  |
//! +--------------+ ... +-------------------+------------------+
//!                                           ^ bit 0
//! ```
//!
//! The interface bits only take part when interface overwrite is enabled. How `cw` and `hw`
//! are derived depends on the [ClassificationMode].
//!
//! ## Example
//! ```
//! use steertab_core::classify::{encode_address, ClassificationKey, ClassificationMode, TableGeometry};
//!
//! let geometry = TableGeometry { input_bits: 14, output_bits: 6, hash_bits: 4, color_bits: 8, interface_bits: 2 };
//! let key = ClassificationKey { iface: 2, color: 10, hash: 3 };
//! let address = encode_address(ClassificationMode::ColorHash, key, true, &geometry).unwrap();
//! assert_eq!(address, 0x20A3);
//! ```
use std::fmt::{Display, Formatter};

use bitvec::prelude::*;

use crate::error::{Result, SteerError};

/// Largest table index width; bit 14 of a table address is the bank bit.
pub const MAX_INDEX_BITS: u32 = 14;

/// The interface field is always the top two input bits.
pub const IFACE_FIELD_BITS: u32 = 2;

/// Hash width of [ClassificationMode::ColorHigh].
pub const COLOR_HIGH_HASH_BITS: u32 = 2;

/// Table geometry as reported by the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct TableGeometry {
    /// Width of the table index.
    pub input_bits: u32,
    /// Width of an entry's destination.
    pub output_bits: u32,
    pub hash_bits: u32,
    pub color_bits: u32,
    pub interface_bits: u32,
}

/// Address layouts the classification table supports.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ClassificationMode {
    /// Interface only.
    #[default]
    Basic,
    /// Two hash bits; the color fills every input bit between hash and interface.
    ColorHigh,
    /// Color and hash at their reported widths.
    ColorHash,
    /// As [ClassificationMode::ColorHash], color shifted right by two first.
    ColorShifted,
}

impl ClassificationMode {
    pub const ALL: [ClassificationMode; 4] = [
        ClassificationMode::Basic,
        ClassificationMode::ColorHigh,
        ClassificationMode::ColorHash,
        ClassificationMode::ColorShifted,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ClassificationMode::Basic => "basic",
            ClassificationMode::ColorHigh => "color_high",
            ClassificationMode::ColorHash => "color_hash",
            ClassificationMode::ColorShifted => "color_shifted",
        }
    }

    /// Works out the field layout of this mode on `geometry`.
    pub fn layout(self, geometry: &TableGeometry) -> Result<AddressLayout> {
        let input_bits = geometry.input_bits;
        if !(IFACE_FIELD_BITS..=MAX_INDEX_BITS).contains(&input_bits) {
            return Err(SteerError::UnsupportedMode(format!(
                "{}-bit table index",
                input_bits
            )));
        }
        if geometry.interface_bits > IFACE_FIELD_BITS {
            return Err(SteerError::UnsupportedMode(format!(
                "{}-bit interface field",
                geometry.interface_bits
            )));
        }
        let room = input_bits - IFACE_FIELD_BITS;
        let (color_bits, hash_bits, color_shift) = match self {
            ClassificationMode::Basic => (0, 0, 0),
            ClassificationMode::ColorHigh => {
                if room < COLOR_HIGH_HASH_BITS {
                    return Err(SteerError::UnsupportedMode(format!(
                        "{} has no room for its hash on a {}-bit index",
                        self, input_bits
                    )));
                }
                (room - COLOR_HIGH_HASH_BITS, COLOR_HIGH_HASH_BITS, 0)
            }
            ClassificationMode::ColorHash => (geometry.color_bits, geometry.hash_bits, 0),
            ClassificationMode::ColorShifted => (geometry.color_bits, geometry.hash_bits, 2),
        };
        if color_bits + hash_bits > room {
            return Err(SteerError::UnsupportedMode(format!(
                "{} needs {} color and {} hash bits, {}-bit index leaves {}",
                self, color_bits, hash_bits, input_bits, room
            )));
        }
        Ok(AddressLayout {
            input_bits,
            iface_bits: geometry.interface_bits,
            color_bits,
            hash_bits,
            color_shift,
        })
    }
}

impl Display for ClassificationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Field positions of one mode on one table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AddressLayout {
    pub input_bits: u32,
    pub iface_bits: u32,
    pub color_bits: u32,
    pub hash_bits: u32,
    /// Right shift applied to the color before packing.
    pub color_shift: u32,
}

impl AddressLayout {
    #[inline]
    fn iface_at(&self) -> usize {
        (self.input_bits - IFACE_FIELD_BITS) as usize
    }
}

/// Fields a classification entry is keyed on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ClassificationKey {
    pub iface: u32,
    pub color: u32,
    pub hash: u32,
}

/// `(1 << width) - 1`; a zero width is an absent field and masks everything.
#[inline]
pub fn width_mask(width: u32) -> u32 {
    if width >= u32::BITS {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

fn check_field(field: &'static str, value: u32, bits: u32) -> Result<u32> {
    if bits > 0 && value > width_mask(bits) {
        return Err(SteerError::InvalidFieldWidth { field, value, bits });
    }
    Ok(value & width_mask(bits))
}

#[inline]
fn put(bits: &mut BitSlice<u32, Lsb0>, at: usize, width: u32, value: u32) {
    if width > 0 {
        bits[at..at + width as usize].store_le(value);
    }
}

#[inline]
fn take(bits: &BitSlice<u32, Lsb0>, at: usize, width: u32) -> u32 {
    if width > 0 {
        bits[at..at + width as usize].load_le()
    } else {
        0
    }
}

/// Packs `key` into a table address.
///
/// Fails with [SteerError::InvalidFieldWidth] when a present field does not fit its bits, and
/// with [SteerError::UnsupportedMode] when the mode cannot be laid out on `geometry`.
pub fn encode_address(
    mode: ClassificationMode,
    key: ClassificationKey,
    interface_overwrite: bool,
    geometry: &TableGeometry,
) -> Result<u32> {
    let layout = mode.layout(geometry)?;
    let hash = check_field("hash", key.hash, layout.hash_bits)?;
    let color = check_field("color", key.color >> layout.color_shift, layout.color_bits)?;

    let mut address = 0u32;
    let bits = address.view_bits_mut::<Lsb0>();
    if interface_overwrite {
        let iface = check_field("interface", key.iface, layout.iface_bits)?;
        put(bits, layout.iface_at(), layout.iface_bits, iface);
    }
    put(bits, layout.hash_bits as usize, layout.color_bits, color);
    put(bits, 0, layout.hash_bits, hash);
    Ok(address)
}

/// Splits a table address back into its fields. The bits a right-shifted color lost come back
/// as zero.
pub fn decode_address(
    mode: ClassificationMode,
    address: u32,
    interface_overwrite: bool,
    geometry: &TableGeometry,
) -> Result<ClassificationKey> {
    let layout = mode.layout(geometry)?;
    if address > width_mask(layout.input_bits) {
        return Err(SteerError::InvalidAddress {
            address,
            bits: layout.input_bits,
        });
    }
    let bits = address.view_bits::<Lsb0>();
    let iface = if interface_overwrite {
        take(bits, layout.iface_at(), layout.iface_bits)
    } else {
        0
    };
    Ok(ClassificationKey {
        iface,
        color: take(bits, layout.hash_bits as usize, layout.color_bits) << layout.color_shift,
        hash: take(bits, 0, layout.hash_bits),
    })
}
