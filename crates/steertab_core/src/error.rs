//! Error kinds shared by every layer of the engine.

use thiserror::Error;

/// Errors raised by validation, encoding and register access.
///
/// Everything except [SteerError::RegisterIo] is raised before the first hardware write, so the
/// caller can fix its input and retry with no side effects.
#[derive(Debug, Error)]
pub enum SteerError {
    /// Table address does not fit the configured input width.
    #[error("address {address:#x} exceeds the {bits}-bit table index")]
    InvalidAddress { address: u32, bits: u32 },

    /// Destination (stream index or slot value) does not fit the configured output width.
    #[error("destination {value} exceeds the {bits}-bit output field")]
    InvalidDestination { value: u32, bits: u32 },

    /// A classification field value does not fit the bits allotted to it.
    #[error("{field} value {value} exceeds its {bits}-bit field")]
    InvalidFieldWidth {
        field: &'static str,
        value: u32,
        bits: u32,
    },

    /// Two bins claim the same part of the permille range.
    #[error("bin {first} [{first_min}, {first_max}) overlaps bin {second} starting at {second_min}")]
    OverlappingRanges {
        first: usize,
        first_min: u32,
        first_max: u32,
        second: usize,
        second_min: u32,
    },

    /// A range boundary is outside 0..=1000.
    #[error("bin {bin} boundary {value} is outside 0..=1000")]
    RangeOutOfBounds { bin: usize, value: u32 },

    /// Mode and table geometry do not describe a layout the hardware supports.
    #[error("unsupported classification layout: {0}")]
    UnsupportedMode(String),

    /// Logical register name missing from the register map.
    #[error("unknown register {0:?}")]
    UnknownRegister(String),

    /// Failure reported by the register access layer, passed through untouched.
    #[error("register access failed")]
    RegisterIo(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SteerError {
    /// Distinct operator-facing code per error kind.
    pub fn code(&self) -> i32 {
        match self {
            SteerError::InvalidAddress { .. } => 10,
            SteerError::InvalidDestination { .. } => 11,
            SteerError::InvalidFieldWidth { .. } => 12,
            SteerError::OverlappingRanges { .. } => 20,
            SteerError::RangeOutOfBounds { .. } => 21,
            SteerError::UnsupportedMode(_) => 30,
            SteerError::UnknownRegister(_) => 31,
            SteerError::RegisterIo(_) => 40,
        }
    }

    /// Wraps a collaborator error.
    pub fn io<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SteerError::RegisterIo(err.into())
    }
}

pub type Result<T> = std::result::Result<T, SteerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errs = [
            SteerError::InvalidAddress { address: 0, bits: 0 },
            SteerError::InvalidDestination { value: 0, bits: 0 },
            SteerError::InvalidFieldWidth {
                field: "hash",
                value: 0,
                bits: 0,
            },
            SteerError::OverlappingRanges {
                first: 0,
                first_min: 0,
                first_max: 0,
                second: 1,
                second_min: 0,
            },
            SteerError::RangeOutOfBounds { bin: 0, value: 0 },
            SteerError::UnsupportedMode(String::new()),
            SteerError::UnknownRegister(String::new()),
            SteerError::io("boom"),
        ];
        let mut codes: Vec<_> = errs.iter().map(SteerError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;
        let err = SteerError::io("bus timeout");
        assert_eq!(err.source().unwrap().to_string(), "bus timeout");
    }
}
