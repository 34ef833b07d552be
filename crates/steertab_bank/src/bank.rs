use std::fmt::{Display, Formatter};

use tracing::{debug, info};

use steertab_core::{
    classify::{encode_address, width_mask, ClassificationKey, ClassificationMode, TableGeometry},
    quant::SLOT_COUNT,
    regs::{
        require_register, BANK_SELECT_ACTIVE, CONFIG_BITMASK_MODE, ENTRY_CTRL_READ,
        ENTRY_CTRL_WRITE,
    },
    table::{build_table, BinRange, EncodingMode, SlotTable, SLOT_VALUE_BITS},
    Result, SteerError,
};

use crate::{
    packing::{entry_address, pack_slot_pair, slot_pair_address, unpack_slot_pair},
    Device, Settle, SpinReads, TableId,
};

/// One of the two physical copies of a table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Bank {
    #[default]
    Zero,
    One,
}

impl Bank {
    #[inline]
    pub fn other(self) -> Bank {
        match self {
            Bank::Zero => Bank::One,
            Bank::One => Bank::Zero,
        }
    }

    #[inline]
    pub fn index(self) -> u32 {
        match self {
            Bank::Zero => 0,
            Bank::One => 1,
        }
    }
}

impl From<bool> for Bank {
    #[inline]
    fn from(one: bool) -> Self {
        if one {
            Bank::One
        } else {
            Bank::Zero
        }
    }
}

impl Display for Bank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Absolute offsets of one table's registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    pub base: u32,
    pub config: u32,
    pub bank_select: u32,
    pub entry_addr: u32,
    pub entry_data: u32,
    pub entry_ctrl: u32,
    pub slot_write: u32,
    pub slot_read_addr: u32,
    pub slot_read_data: u32,
    pub status: u32,
}

impl RegisterBlock {
    pub fn resolve(base: u32) -> Result<Self> {
        let at = |name: &str| require_register(name).map(|offset| base + offset);
        Ok(RegisterBlock {
            base,
            config: at("config")?,
            bank_select: at("bank_select")?,
            entry_addr: at("entry_addr")?,
            entry_data: at("entry_data")?,
            entry_ctrl: at("entry_ctrl")?,
            slot_write: at("slot_write")?,
            slot_read_addr: at("slot_read_addr")?,
            slot_read_data: at("slot_read_data")?,
            status: at("status")?,
        })
    }
}

/// How classification keys are turned into entry addresses on one table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct EntryConfig {
    pub mode: ClassificationMode,
    pub interface_overwrite: bool,
}

/// Result of a verified write.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReadBack {
    /// Address written, bank bit included.
    pub address: u32,
    pub written: u32,
    pub read: u32,
}

impl ReadBack {
    #[inline]
    pub fn is_match(&self) -> bool {
        self.written == self.read
    }
}

/// Handle on one hardware table.
///
/// Every mutating operation takes `&mut self`: a table is never driven by two writers at once.
/// Handles on different tables are independent.
pub struct BankedTable<'d, D: Device + ?Sized, S: Settle = SpinReads> {
    device: &'d D,
    table: TableId,
    regs: RegisterBlock,
    geometry: TableGeometry,
    encoding: EncodingMode,
    entry: EntryConfig,
    settle: S,
}

impl<'d, D: Device + ?Sized> BankedTable<'d, D> {
    /// Opens `table` with the default settle primitive.
    pub fn open(device: &'d D, table: TableId, entry: EntryConfig) -> Result<Self> {
        Self::with_settle(device, table, entry, SpinReads::default())
    }
}

impl<'d, D: Device + ?Sized, S: Settle> BankedTable<'d, D, S> {
    /// Opens `table`: resolves its registers, reads its geometry and encoding mode, and checks
    /// that `entry` can be laid out on it.
    pub fn with_settle(device: &'d D, table: TableId, entry: EntryConfig, settle: S) -> Result<Self> {
        let base = device.resolve_table_base(table).map_err(SteerError::io)?;
        let geometry = device.get_field_widths(table).map_err(SteerError::io)?;
        entry.mode.layout(&geometry)?;
        let regs = RegisterBlock::resolve(base)?;
        let config = device
            .read_register(table, regs.config)
            .map_err(SteerError::io)?;
        let encoding = if config & CONFIG_BITMASK_MODE != 0 {
            EncodingMode::Bitmask
        } else {
            EncodingMode::Exclusive
        };
        debug!(table, base, ?geometry, %encoding, mode = %entry.mode, "table opened");
        Ok(BankedTable {
            device,
            table,
            regs,
            geometry,
            encoding,
            entry,
            settle,
        })
    }

    /// Table this handle drives.
    pub fn id(&self) -> TableId {
        self.table
    }

    /// Field widths the table reported when opened.
    pub fn geometry(&self) -> &TableGeometry {
        &self.geometry
    }

    /// Slot encoding read from the table's config register.
    pub fn encoding(&self) -> EncodingMode {
        self.encoding
    }

    /// How keys are packed into entry addresses.
    pub fn entry_config(&self) -> EntryConfig {
        self.entry
    }

    /// Absolute register offsets of this table.
    pub fn registers(&self) -> &RegisterBlock {
        &self.regs
    }

    #[inline]
    fn read(&self, offset: u32) -> Result<u32> {
        self.device
            .read_register(self.table, offset)
            .map_err(SteerError::io)
    }

    #[inline]
    fn write(&self, offset: u32, value: u32) -> Result<()> {
        self.device
            .write_register(self.table, offset, value)
            .map_err(SteerError::io)
    }

    #[inline]
    fn wait(&self) -> Result<()> {
        self.settle
            .settle(self.device, self.table, self.regs.status)
            .map_err(SteerError::io)
    }

    /// Bank currently read by live traffic.
    pub fn current_bank(&self) -> Result<Bank> {
        Ok(Bank::from(self.read(self.regs.bank_select)? & BANK_SELECT_ACTIVE != 0))
    }

    /// Flips the active bank. No table data moves. Returns the bank now active.
    pub fn swap_banks(&mut self) -> Result<Bank> {
        let select = self.read(self.regs.bank_select)?;
        self.flip(select)
    }

    // the only write that changes what live traffic sees
    fn flip(&self, select: u32) -> Result<Bank> {
        let select = select ^ BANK_SELECT_ACTIVE;
        self.write(self.regs.bank_select, select)?;
        let active = Bank::from(select & BANK_SELECT_ACTIVE != 0);
        info!(table = self.table, bank = %active, "bank flipped");
        Ok(active)
    }

    fn check_address(&self, address: u32) -> Result<()> {
        let bits = self.geometry.input_bits;
        if address > width_mask(bits) {
            return Err(SteerError::InvalidAddress { address, bits });
        }
        Ok(())
    }

    fn check_destination(&self, value: u32) -> Result<()> {
        let bits = self.geometry.output_bits;
        if value > width_mask(bits) {
            return Err(SteerError::InvalidDestination { value, bits });
        }
        Ok(())
    }

    /// Entry address of `key` under this table's [EntryConfig].
    pub fn address_of(&self, key: ClassificationKey) -> Result<u32> {
        encode_address(
            self.entry.mode,
            key,
            self.entry.interface_overwrite,
            &self.geometry,
        )
    }

    /// Writes `destination` at raw `address` of the inactive bank. Returns the full address
    /// written.
    ///
    /// The entry is not visible to traffic until [BankedTable::swap_banks].
    pub fn set_raw_entry(&mut self, address: u32, destination: u32) -> Result<u32> {
        self.check_address(address)?;
        self.check_destination(destination)?;
        let shadow = self.current_bank()?.other();
        let target = entry_address(shadow, address);
        debug!(table = self.table, bank = %shadow, address = target, destination, "entry write");
        self.write(self.regs.entry_addr, target)?;
        self.write(self.regs.entry_data, destination)?;
        self.write(self.regs.entry_ctrl, ENTRY_CTRL_WRITE)?;
        Ok(target)
    }

    /// [BankedTable::set_raw_entry], then reads the entry back after the hardware settled.
    /// A mismatch is reported in the [ReadBack], not as an error.
    pub fn set_raw_entry_verify(&mut self, address: u32, destination: u32) -> Result<ReadBack> {
        let target = self.set_raw_entry(address, destination)?;
        self.wait()?;
        let read = self.read_entry_at(target)?;
        Ok(ReadBack {
            address: target,
            written: destination,
            read,
        })
    }

    pub fn set_entry(&mut self, key: ClassificationKey, destination: u32) -> Result<u32> {
        let address = self.address_of(key)?;
        self.set_raw_entry(address, destination)
    }

    pub fn set_entry_verify(
        &mut self,
        key: ClassificationKey,
        destination: u32,
    ) -> Result<ReadBack> {
        let address = self.address_of(key)?;
        self.set_raw_entry_verify(address, destination)
    }

    /// Reads the entry at raw `address` of `bank`.
    pub fn get_raw_entry(&self, bank: Bank, address: u32) -> Result<u32> {
        self.check_address(address)?;
        self.read_entry_at(entry_address(bank, address))
    }

    /// Reads the entry of `key` from `bank`.
    pub fn get_entry(&self, bank: Bank, key: ClassificationKey) -> Result<u32> {
        let address = self.address_of(key)?;
        self.get_raw_entry(bank, address)
    }

    fn read_entry_at(&self, target: u32) -> Result<u32> {
        self.write(self.regs.entry_addr, target)?;
        self.write(self.regs.entry_ctrl, ENTRY_CTRL_READ)?;
        self.wait()?;
        self.read(self.regs.entry_data)
    }

    /// Writes `table` to the inactive bank, then flips to it. Returns the bank now active.
    ///
    /// Every slot write is acknowledged before the flip is issued. If any of them fails the flip
    /// is never issued and the active bank is untouched. Values wider than the output field, or
    /// than a slot, are rejected before the first write.
    pub fn write_table(&mut self, table: &SlotTable) -> Result<Bank> {
        let bits = self.geometry.output_bits.min(SLOT_VALUE_BITS);
        if let Some(&value) = table.as_slice().iter().find(|v| **v > width_mask(bits)) {
            return Err(SteerError::InvalidDestination { value, bits });
        }
        let select = self.read(self.regs.bank_select)?;
        let shadow = Bank::from(select & BANK_SELECT_ACTIVE != 0).other();
        debug!(table = self.table, bank = %shadow, "writing slot table");
        for (slot_index, lo, hi) in table.pairs() {
            self.write(self.regs.slot_write, pack_slot_pair(shadow, slot_index, lo, hi)?)?;
            self.wait()?;
        }
        self.flip(select)
    }

    /// Builds the slot table for `bins` in this table's encoding mode and writes it.
    pub fn apply_layout(&mut self, bins: &[BinRange]) -> Result<SlotTable> {
        let table = build_table(bins, self.encoding, self.geometry.output_bits)?;
        self.write_table(&table)?;
        Ok(table)
    }

    /// Reads the whole slot table of `bank`.
    pub fn read_table_bank(&self, bank: Bank) -> Result<SlotTable> {
        let mut table = SlotTable::new();
        for slot_index in (0..SLOT_COUNT).step_by(2) {
            self.write(self.regs.slot_read_addr, slot_pair_address(bank, slot_index))?;
            self.wait()?;
            let (lo, hi) = unpack_slot_pair(self.read(self.regs.slot_read_data)?);
            table[slot_index] = lo;
            table[slot_index + 1] = hi;
        }
        Ok(table)
    }

    /// Reads the slot table live traffic currently sees.
    pub fn read_table(&self) -> Result<SlotTable> {
        self.read_table_bank(self.current_bank()?)
    }
}
