//! This crate turns steering intent into the bit layouts of the classification hardware:
//! percentile bins into slot tables and back, and classification keys into table addresses.
//! It never touches the hardware itself, see `steertab_bank` for that.
pub mod classify;
pub mod error;
pub mod quant;
pub mod regs;
pub mod table;

pub use crate::error::{Result, SteerError};

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        classify::{
            decode_address, encode_address, ClassificationKey, ClassificationMode, TableGeometry,
        },
        error::{Result, SteerError},
        quant::{to_permille, to_slot, PERMILLE_MAX, SLOT_COUNT},
        table::{
            build_table, reconstruct, reconstruct_ranges, validate_ranges, BinRange,
            EncodingMode, Reconstruction, SlotTable,
        },
    };
}
