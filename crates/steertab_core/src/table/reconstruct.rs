use tracing::warn;

use crate::quant::{to_permille, SLOT_COUNT};

use super::{BinRange, EncodingMode, SlotTable};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Run {
    NotFound,
    FoundMin { start: usize },
    FoundMax { start: usize, end: usize },
}

/// Ranges read back from a slot table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconstruction {
    /// `ranges[i]` is the range of bin `i`; bins owning no slot get [BinRange::UNUSED].
    pub ranges: Vec<BinRange>,
    /// Bins owning more than one run of slots. Only their first run is in `ranges`.
    pub fragmented: Vec<usize>,
}

impl Reconstruction {
    pub fn is_contiguous(&self) -> bool {
        self.fragmented.is_empty()
    }
}

/// Recovers the per-bin permille ranges of `bin_count` bins from `table`.
pub fn reconstruct(table: &SlotTable, bin_count: usize, mode: EncodingMode) -> Reconstruction {
    let mut runs = vec![Run::NotFound; bin_count];
    let mut fragmented = Vec::new();

    for index in 0..SLOT_COUNT {
        let value = table[index];
        for (bin, run) in runs.iter_mut().enumerate() {
            let member = mode.is_member(value, bin);
            *run = match (*run, member) {
                (Run::NotFound, true) => Run::FoundMin { start: index },
                (Run::FoundMin { start }, false) => Run::FoundMax {
                    start,
                    end: index - 1,
                },
                (Run::FoundMax { .. }, true) => {
                    if !fragmented.contains(&bin) {
                        fragmented.push(bin);
                    }
                    *run
                }
                (run, _) => run,
            };
        }
    }

    let ranges = runs
        .into_iter()
        .map(|run| match run {
            Run::NotFound => BinRange::UNUSED,
            Run::FoundMin { start } => span(start, SLOT_COUNT - 1),
            Run::FoundMax { start, end } => span(start, end),
        })
        .collect();

    fragmented.sort_unstable();
    if !fragmented.is_empty() {
        warn!(?fragmented, "bins own discontiguous slots, kept first run");
    }
    Reconstruction { ranges, fragmented }
}

/// Same as [reconstruct], keeping only the ranges.
pub fn reconstruct_ranges(table: &SlotTable, bin_count: usize, mode: EncodingMode) -> Vec<BinRange> {
    reconstruct(table, bin_count, mode).ranges
}

#[inline]
fn span(start: usize, end: usize) -> BinRange {
    BinRange::new(to_permille(start), to_permille(end + 1))
}
