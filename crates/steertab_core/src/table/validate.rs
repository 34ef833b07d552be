use crate::{
    error::{Result, SteerError},
    quant::PERMILLE_MAX,
};

use super::BinRange;

/// Checks a proposed layout before anything is built from it.
///
/// Every boundary must lie in `0..=1000`. For every ordered pair of distinct bins `(i, j)`,
/// `i.min <= j.min < i.max` is an overlap.
///
/// The exemption for empty ranges is wider than one for the `[0, 0)` sentinel alone: any bin
/// with `min >= max` means "no assignment", receives no slots, and never overlaps anything, even
/// when its bounds fall inside another bin's range.
pub fn validate_ranges(bins: &[BinRange]) -> Result<()> {
    for (bin, r) in bins.iter().enumerate() {
        for value in [r.min, r.max] {
            if value > PERMILLE_MAX {
                return Err(SteerError::RangeOutOfBounds { bin, value });
            }
        }
    }
    for (i, a) in bins.iter().enumerate() {
        if a.is_empty() {
            continue;
        }
        for (j, b) in bins.iter().enumerate() {
            if i == j || b.is_empty() {
                continue;
            }
            if a.min <= b.min && b.min < a.max {
                return Err(SteerError::OverlappingRanges {
                    first: i,
                    first_min: a.min,
                    first_max: a.max,
                    second: j,
                    second_min: b.min,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_rejected() {
        let bins = [BinRange::new(0, 500), BinRange::new(499, 600)];
        assert!(matches!(
            validate_ranges(&bins),
            Err(SteerError::OverlappingRanges {
                first: 0,
                second: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_overlap_rejected_in_either_order() {
        let bins = [BinRange::new(499, 600), BinRange::new(0, 500)];
        assert!(matches!(
            validate_ranges(&bins),
            Err(SteerError::OverlappingRanges {
                first: 1,
                second: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_touching_accepted() {
        let bins = [BinRange::new(0, 500), BinRange::new(500, 600)];
        assert!(validate_ranges(&bins).is_ok());
    }

    #[test]
    fn test_identical_start_rejected() {
        let bins = [BinRange::new(100, 200), BinRange::new(100, 300)];
        assert!(validate_ranges(&bins).is_err());
    }

    #[test]
    fn test_unused_bins_ignored() {
        let bins = [
            BinRange::UNUSED,
            BinRange::new(0, 1000),
            BinRange::UNUSED,
            BinRange::new(700, 700),
        ];
        assert!(validate_ranges(&bins).is_ok());
    }

    #[test]
    fn test_empty_ranges_never_overlap() {
        // empty inside a live range
        let bins = [BinRange::new(100, 200), BinRange::new(150, 150)];
        assert!(validate_ranges(&bins).is_ok());
        // the sentinel at the start of a live range
        let bins = [BinRange::new(0, 500), BinRange::UNUSED];
        assert!(validate_ranges(&bins).is_ok());
        let bins = [BinRange::UNUSED, BinRange::new(0, 500)];
        assert!(validate_ranges(&bins).is_ok());
        // inverted
        let bins = [BinRange::new(0, 500), BinRange::new(300, 100)];
        assert!(validate_ranges(&bins).is_ok());
    }

    #[test]
    fn test_out_of_bounds() {
        let bins = [BinRange::new(0, 500), BinRange::new(500, 1001)];
        assert!(matches!(
            validate_ranges(&bins),
            Err(SteerError::RangeOutOfBounds { bin: 1, value: 1001 })
        ));
        // bounds win over overlaps
        let bins = [BinRange::new(0, 500), BinRange::new(400, 2000)];
        assert!(matches!(
            validate_ranges(&bins),
            Err(SteerError::RangeOutOfBounds { .. })
        ));
    }
}
