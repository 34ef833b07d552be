//! Traffic steering tables for a packet classification card.
//!
//! - [engine]: percentile bins to slot tables and back, classification addresses, errors.
//! - [bank]: the dual-bank update protocol over a register interface, and a simulated device.
//! - [io]: text loaders for bin layouts and steering rules.
pub use steertab_bank as bank;
pub use steertab_core as engine;
pub use steertab_io as io;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use steertab_bank::prelude::*;
    #[doc(hidden)]
    pub use steertab_core::prelude::*;
    #[doc(hidden)]
    pub use steertab_io::prelude::*;
}
