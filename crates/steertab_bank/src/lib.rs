//! This crate owns the hardware side of a steering table: the two physical banks, shadow writes
//! to the inactive one and the atomic flip that exposes them to traffic.
//!
//! The device itself is reached through the [RegisterIo] and [TableDirectory] traits, so the same
//! protocol drives real hardware and the [sim::SimDevice] used by tooling and tests.
mod bank;
mod packing;
pub mod sim;

use std::time::Duration;

use steertab_core::classify::TableGeometry;

pub use crate::{
    bank::{Bank, BankedTable, EntryConfig, ReadBack, RegisterBlock},
    packing::{
        entry_address, pack_slot_pair, slot_pair_address, slot_pair_target, unpack_slot_pair,
        ENTRY_BANK_BIT, SLOT_PAIR_SHIFT,
    },
};

/// Opaque error of the register access layer.
pub type IoError = Box<dyn std::error::Error + Send + Sync>;

/// Identifies one physical table on the card.
pub type TableId = u32;

/// Raw word access to the memory-mapped registers of a table.
///
/// ***The trait is manufacture-specific.***
pub trait RegisterIo {
    fn read_register(&self, table: TableId, offset: u32) -> Result<u32, IoError>;
    fn write_register(&self, table: TableId, offset: u32, value: u32) -> Result<(), IoError>;
}

/// Where a table's registers live and what shape the table has.
///
/// ***The trait is manufacture-specific.***
pub trait TableDirectory {
    fn resolve_table_base(&self, table: TableId) -> Result<u32, IoError>;
    fn get_field_widths(&self, table: TableId) -> Result<TableGeometry, IoError>;
}

/// A device is anything that offers both collaborators.
pub trait Device: RegisterIo + TableDirectory {}

impl<T: RegisterIo + TableDirectory> Device for T {}

/// Waits for the last register operation on a table to complete.
///
/// Hardware needs at least [MIN_SETTLE] between table operations.
pub trait Settle {
    fn settle<D: RegisterIo + ?Sized>(
        &self,
        device: &D,
        table: TableId,
        status: u32,
    ) -> Result<(), IoError>;
}

/// Minimum time the hardware needs between two table operations.
pub const MIN_SETTLE: Duration = Duration::from_micros(25);

/// Settles by reading the status register a fixed number of times. Each read is a full bus round
/// trip, [SpinReads::default] covers [MIN_SETTLE] on the slowest supported bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpinReads(pub u32);

impl Default for SpinReads {
    fn default() -> Self {
        SpinReads(32)
    }
}

impl Settle for SpinReads {
    fn settle<D: RegisterIo + ?Sized>(
        &self,
        device: &D,
        table: TableId,
        status: u32,
    ) -> Result<(), IoError> {
        for _ in 0..self.0 {
            device.read_register(table, status)?;
        }
        Ok(())
    }
}

/// Settles by sleeping, for transports where reads are not a usable clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sleep(pub Duration);

impl Default for Sleep {
    fn default() -> Self {
        Sleep(MIN_SETTLE)
    }
}

impl Settle for Sleep {
    fn settle<D: RegisterIo + ?Sized>(&self, _: &D, _: TableId, _: u32) -> Result<(), IoError> {
        std::thread::sleep(self.0);
        Ok(())
    }
}

/// Does not wait at all. Only for devices that complete every access synchronously.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NoSettle;

impl Settle for NoSettle {
    #[inline]
    fn settle<D: RegisterIo + ?Sized>(&self, _: &D, _: TableId, _: u32) -> Result<(), IoError> {
        Ok(())
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        sim::SimDevice, Bank, BankedTable, Device, EntryConfig, NoSettle, ReadBack, RegisterIo,
        Settle, SpinReads, TableDirectory, TableId,
    };
}
