//! In-memory model of the table registers.
//!
//! [SimDevice] answers the same register protocol as the card: entry writes and reads through
//! `entry_addr`/`entry_data`/`entry_ctrl`, slot pair writes and reads, and the bank select bit.
//! It also injects faults: failing writes after a countdown, and bits stuck high on entry reads.
use fxhash::FxHashMap;
use parking_lot::Mutex;
use thiserror::Error;

use steertab_core::{
    classify::TableGeometry,
    regs::{
        REGISTER_MAP, BANK_SELECT_ACTIVE, CONFIG_BITMASK_MODE, ENTRY_CTRL_READ,
        ENTRY_CTRL_WRITE, REGISTER_BLOCK_SIZE,
    },
    table::{EncodingMode, SlotTable},
};

use crate::{
    bank::Bank,
    packing::{pack_slot_pair, slot_pair_target, unpack_slot_pair, ENTRY_BANK_BIT},
    IoError, RegisterIo, TableDirectory, TableId,
};

/// Errors of the simulated bus.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimFault {
    #[error("injected write fault at {offset:#x}")]
    Injected { offset: u32 },
    #[error("no table {0} on this device")]
    UnknownTable(TableId),
    #[error("offset {offset:#x} is not a register of table {table}")]
    Unmapped { table: TableId, offset: u32 },
}

#[derive(Debug)]
struct SimTable {
    base: u32,
    geometry: TableGeometry,
    config: u32,
    bank_select: u32,
    entry_addr: u32,
    entry_data: u32,
    stuck_bits: u32,
    slot_read_data: u32,
    entries: [FxHashMap<u32, u32>; 2],
    slots: [SlotTable; 2],
}

impl SimTable {
    fn register(&self, table: TableId, offset: u32) -> Result<&'static str, SimFault> {
        let unmapped = || SimFault::Unmapped { table, offset };
        let rel = offset.checked_sub(self.base).ok_or_else(unmapped)?;
        REGISTER_MAP
            .entries()
            .find(|(_, off)| **off == rel)
            .map(|(name, _)| *name)
            .ok_or_else(unmapped)
    }

    fn entry_slot(&self) -> (usize, u32) {
        let bank = (self.entry_addr >> ENTRY_BANK_BIT & 1) as usize;
        (bank, self.entry_addr & ((1 << ENTRY_BANK_BIT) - 1))
    }
}

#[derive(Debug, Default)]
struct SimState {
    tables: FxHashMap<TableId, SimTable>,
    reads: usize,
    writes: usize,
    last_write: Option<(u32, u32)>,
    // only while recording
    log: Option<Vec<(u32, u32)>>,
    fail_after: Option<usize>,
}

/// Simulated card. Cheap to share: all state sits behind one lock.
#[derive(Debug, Default)]
pub struct SimDevice {
    state: Mutex<SimState>,
}

impl SimDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table whose register block starts at `base`. Both banks start zeroed, bank 0
    /// active.
    pub fn add_table(&self, table: TableId, base: u32, geometry: TableGeometry, mode: EncodingMode) {
        let config = match mode {
            EncodingMode::Exclusive => 0,
            EncodingMode::Bitmask => CONFIG_BITMASK_MODE,
        };
        self.state.lock().tables.insert(
            table,
            SimTable {
                base,
                geometry,
                config,
                bank_select: 0,
                entry_addr: 0,
                entry_data: 0,
                stuck_bits: 0,
                slot_read_data: 0,
                entries: Default::default(),
                slots: [SlotTable::new(), SlotTable::new()],
            },
        );
    }

    /// Successful writes left before every further write fails. `None` disarms.
    pub fn fail_writes_after(&self, writes: Option<usize>) {
        self.state.lock().fail_after = writes;
    }

    /// Forces `bits` high in every entry read back from `table`.
    pub fn stick_entry_bit(&self, table: TableId, bits: u32) {
        if let Some(t) = self.state.lock().tables.get_mut(&table) {
            t.stuck_bits = bits;
        }
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().reads
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Last accepted write as `(offset, value)`.
    pub fn last_write(&self) -> Option<(u32, u32)> {
        self.state.lock().last_write
    }

    /// Starts keeping every accepted write, dropping anything recorded before. `false` stops and
    /// frees the log. Counting never stops.
    pub fn record_writes(&self, on: bool) {
        self.state.lock().log = on.then(Vec::new);
    }

    /// Writes accepted since recording started, oldest first. Empty when not recording.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.state.lock().log.clone().unwrap_or_default()
    }

    /// Active bank of `table`, bypassing the register protocol.
    pub fn active_bank(&self, table: TableId) -> Option<Bank> {
        self.state
            .lock()
            .tables
            .get(&table)
            .map(|t| Bank::from(t.bank_select & BANK_SELECT_ACTIVE != 0))
    }

    /// Slot table held in `bank` of `table`, bypassing the register protocol.
    pub fn bank_slots(&self, table: TableId, bank: Bank) -> Option<SlotTable> {
        self.state
            .lock()
            .tables
            .get(&table)
            .map(|t| t.slots[bank.index() as usize].clone())
    }

    /// Slot table live traffic of `table` would hit.
    pub fn live_slots(&self, table: TableId) -> Option<SlotTable> {
        let bank = self.active_bank(table)?;
        self.bank_slots(table, bank)
    }
}

impl RegisterIo for SimDevice {
    fn read_register(&self, table: TableId, offset: u32) -> Result<u32, IoError> {
        let mut state = self.state.lock();
        state.reads += 1;
        let t = state
            .tables
            .get(&table)
            .ok_or(SimFault::UnknownTable(table))?;
        let value = match t.register(table, offset)? {
            "config" => t.config,
            "bank_select" => t.bank_select,
            "entry_addr" => t.entry_addr,
            "entry_data" => t.entry_data,
            "slot_read_data" => t.slot_read_data,
            // idle
            "status" => 0,
            // write-only
            _ => 0,
        };
        Ok(value)
    }

    fn write_register(&self, table: TableId, offset: u32, value: u32) -> Result<(), IoError> {
        let mut state = self.state.lock();
        if let Some(left) = state.fail_after.as_mut() {
            if *left == 0 {
                return Err(SimFault::Injected { offset }.into());
            }
            *left -= 1;
        }
        let t = state
            .tables
            .get_mut(&table)
            .ok_or(SimFault::UnknownTable(table))?;
        match t.register(table, offset)? {
            "config" => t.config = value,
            "bank_select" => t.bank_select = value,
            "entry_addr" => t.entry_addr = value,
            "entry_data" => t.entry_data = value,
            "entry_ctrl" => {
                let (bank, index) = t.entry_slot();
                if value & ENTRY_CTRL_WRITE != 0 {
                    let data = t.entry_data;
                    t.entries[bank].insert(index, data);
                }
                if value & ENTRY_CTRL_READ != 0 {
                    let data = t.entries[bank].get(&index).copied().unwrap_or(0);
                    t.entry_data = data | t.stuck_bits;
                }
            }
            "slot_write" => {
                let (bank, slot) = slot_pair_target(value);
                let (lo, hi) = unpack_slot_pair(value);
                let slots = &mut t.slots[bank.index() as usize];
                slots[slot] = lo;
                slots[slot + 1] = hi;
            }
            "slot_read_addr" => {
                let (bank, slot) = slot_pair_target(value);
                let slots = &t.slots[bank.index() as usize];
                t.slot_read_data = pack_slot_pair(bank, slot, slots[slot], slots[slot + 1])?;
            }
            _ => return Err(SimFault::Unmapped { table, offset }.into()),
        }
        state.writes += 1;
        state.last_write = Some((offset, value));
        if let Some(log) = state.log.as_mut() {
            log.push((offset, value));
        }
        Ok(())
    }
}

impl TableDirectory for SimDevice {
    fn resolve_table_base(&self, table: TableId) -> Result<u32, IoError> {
        let state = self.state.lock();
        let t = state
            .tables
            .get(&table)
            .ok_or(SimFault::UnknownTable(table))?;
        Ok(t.base)
    }

    fn get_field_widths(&self, table: TableId) -> Result<TableGeometry, IoError> {
        let state = self.state.lock();
        let t = state
            .tables
            .get(&table)
            .ok_or(SimFault::UnknownTable(table))?;
        Ok(t.geometry)
    }
}

/// Span of a register block, for laying out several tables on one device.
pub const TABLE_STRIDE: u32 = REGISTER_BLOCK_SIZE;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::slot_pair_address;

    const GEO: TableGeometry = TableGeometry {
        input_bits: 10,
        output_bits: 4,
        hash_bits: 2,
        color_bits: 4,
        interface_bits: 2,
    };

    #[test]
    fn test_slot_pair_protocol() {
        let dev = SimDevice::new();
        dev.add_table(1, 0x100, GEO, EncodingMode::Exclusive);
        let slot_write = 0x100 + REGISTER_MAP["slot_write"];
        let read_addr = 0x100 + REGISTER_MAP["slot_read_addr"];
        let read_data = 0x100 + REGISTER_MAP["slot_read_data"];

        let w = pack_slot_pair(Bank::One, 6, 3, 4).unwrap();
        dev.write_register(1, slot_write, w).unwrap();
        assert_eq!(dev.bank_slots(1, Bank::One).unwrap()[7], 4);
        assert_eq!(dev.bank_slots(1, Bank::Zero).unwrap()[7], 0);

        dev.write_register(1, read_addr, slot_pair_address(Bank::One, 6))
            .unwrap();
        let word = dev.read_register(1, read_data).unwrap();
        assert_eq!(unpack_slot_pair(word), (3, 4));
    }

    #[test]
    fn test_fault_injection() {
        let dev = SimDevice::new();
        dev.add_table(0, 0, GEO, EncodingMode::Exclusive);
        let bank_select = REGISTER_MAP["bank_select"];
        dev.fail_writes_after(Some(1));
        assert!(dev.write_register(0, bank_select, 1).is_ok());
        let err = dev.write_register(0, bank_select, 0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimFault>(),
            Some(&SimFault::Injected {
                offset: bank_select
            })
        );
        assert_eq!(dev.active_bank(0), Some(Bank::One));
        dev.fail_writes_after(None);
        assert!(dev.write_register(0, bank_select, 0).is_ok());
        assert_eq!(dev.active_bank(0), Some(Bank::Zero));
    }

    #[test]
    fn test_write_log_is_opt_in() {
        let dev = SimDevice::new();
        dev.add_table(0, 0, GEO, EncodingMode::Exclusive);
        let bank_select = REGISTER_MAP["bank_select"];
        dev.write_register(0, bank_select, 1).unwrap();
        assert!(dev.writes().is_empty());
        assert_eq!(dev.write_count(), 1);
        assert_eq!(dev.last_write(), Some((bank_select, 1)));

        dev.record_writes(true);
        dev.write_register(0, bank_select, 0).unwrap();
        dev.write_register(0, bank_select, 1).unwrap();
        assert_eq!(dev.writes(), vec![(bank_select, 0), (bank_select, 1)]);

        dev.record_writes(false);
        dev.write_register(0, bank_select, 0).unwrap();
        assert!(dev.writes().is_empty());
        assert_eq!(dev.write_count(), 4);
        assert_eq!(dev.last_write(), Some((bank_select, 0)));
    }

    #[test]
    fn test_unmapped_access() {
        let dev = SimDevice::new();
        dev.add_table(0, 0x40, GEO, EncodingMode::Exclusive);
        assert!(dev.read_register(0, 0x3c).is_err());
        assert!(dev.read_register(0, 0x40 + TABLE_STRIDE).is_err());
        assert!(dev.read_register(5, 0x40).is_err());
        assert!(dev.resolve_table_base(5).is_err());
        assert_eq!(dev.get_field_widths(0).unwrap(), GEO);
    }
}
