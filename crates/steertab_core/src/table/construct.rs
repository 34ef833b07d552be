use tracing::{debug, warn};

use crate::{
    error::{Result, SteerError},
    quant::{to_slot, SLOT_COUNT},
};

use super::{validate_ranges, BinRange, EncodingMode, SlotTable, SLOT_VALUE_BITS};

/// Number of bins a table with `output_bits` wide slots can address in `mode`.
pub fn bin_capacity(mode: EncodingMode, output_bits: u32) -> usize {
    match mode {
        EncodingMode::Exclusive => 1 << output_bits,
        EncodingMode::Bitmask => output_bits as usize,
    }
}

/// Builds the slot table for `bins`, where `bins[i]` is the range of bin `i`.
///
/// The layout is validated first, so a rejected layout never reaches the hardware. Bins past
/// [bin_capacity] are dropped.
///
/// In bitmask mode a slot no bin covers holds 0. In exclusive mode it holds `bins.len()`, the
/// first index no bin owns, so reading the table back leaves every requested range intact. When
/// the bins fill the whole capacity there is no such index and uncovered slots steer to bin 0.
pub fn build_table(bins: &[BinRange], mode: EncodingMode, output_bits: u32) -> Result<SlotTable> {
    if output_bits > SLOT_VALUE_BITS {
        return Err(SteerError::UnsupportedMode(format!(
            "{}-bit output does not fit a {}-bit slot",
            output_bits, SLOT_VALUE_BITS
        )));
    }
    validate_ranges(bins)?;

    let capacity = bin_capacity(mode, output_bits);
    if bins.len() > capacity {
        warn!(
            requested = bins.len(),
            capacity, "bin count clamped to table output width"
        );
    }

    let unowned = match mode {
        EncodingMode::Exclusive if bins.len() < capacity => bins.len() as u32,
        _ => 0,
    };
    let mut table = SlotTable::from([unowned; SLOT_COUNT]);
    for (bin, range) in bins.iter().take(capacity).enumerate() {
        let start = to_slot(range.min);
        let end = to_slot(range.max);
        if start >= end {
            continue;
        }
        debug!(bin, start, last = end - 1, "assigning slots");
        for slot in start..end {
            match mode {
                EncodingMode::Exclusive => table[slot] = bin as u32,
                EncodingMode::Bitmask => table[slot] |= 1 << bin,
            }
        }
    }
    Ok(table)
}
