//! Register block of one table.
//!
//! Offsets are generated at build time into [REGISTER_MAP] and are relative to the table base
//! reported by the device directory.
include!(concat!(env!("OUT_DIR"), "/regmap.rs"));

use crate::error::{Result, SteerError};

/// `config`: slot table stores per-bin bitmasks instead of a single bin index.
pub const CONFIG_BITMASK_MODE: u32 = 1 << 0;

/// `bank_select`: bank read by live traffic.
pub const BANK_SELECT_ACTIVE: u32 = 1 << 0;

/// `entry_ctrl`: commit `entry_data` at `entry_addr`.
pub const ENTRY_CTRL_WRITE: u32 = 1 << 0;
/// `entry_ctrl`: latch the entry at `entry_addr` into `entry_data`.
pub const ENTRY_CTRL_READ: u32 = 1 << 1;

/// Looks up a logical register name.
pub fn register_offset(name: &str) -> Option<u32> {
    REGISTER_MAP.get(name).copied()
}

/// Like [register_offset], but a miss is an error.
pub fn require_register(name: &str) -> Result<u32> {
    register_offset(name).ok_or_else(|| SteerError::UnknownRegister(name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_map() {
        assert_eq!(register_offset("config"), Some(0));
        assert_eq!(register_offset("bank_select"), Some(4));
        assert_eq!(register_offset("status"), Some(REGISTER_BLOCK_SIZE - 4));
        assert!(register_offset("lb_ctrl").is_none());
        assert!(matches!(
            require_register("lb_ctrl"),
            Err(SteerError::UnknownRegister(_))
        ));
    }

    #[test]
    fn test_register_map_is_ordered() {
        let offsets: Vec<u32> = REGISTER_MAP.values().copied().collect();
        assert!(offsets.windows(2).all(|w| w[0] + 4 == w[1]));
    }
}
