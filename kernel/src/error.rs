//! Status codes and error handling
//!
//! Directives report a flat `StatusCode` to their callers. Inside the core
//! every fallible operation returns `Result<T>` and validates all of its
//! preconditions before it mutates anything, so an `Err` always means
//! "nothing changed".
//!
//! Broken internal linkage is not an error: it means an invariant was
//! violated somewhere else and the only safe reaction is to halt. Those
//! paths go through `fatal_error` / `score_assert!`.

use core::fmt;

/// Status code returned by every directive
///
/// The numeric values are stable and may be handed to foreign callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    Successful = 0,
    InvalidName = 3,
    InvalidId = 4,
    TooMany = 5,
    InvalidAddress = 9,
    InvalidNumber = 10,
    ResourceInUse = 12,
    IncorrectState = 14,
    InvalidPriority = 19,
    NotConfigured = 22,
    NotImplemented = 24,
    NoMemory = 26,
    IoError = 27,
}

impl StatusCode {
    /// Convert from the raw value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Successful),
            3 => Some(Self::InvalidName),
            4 => Some(Self::InvalidId),
            5 => Some(Self::TooMany),
            9 => Some(Self::InvalidAddress),
            10 => Some(Self::InvalidNumber),
            12 => Some(Self::ResourceInUse),
            14 => Some(Self::IncorrectState),
            19 => Some(Self::InvalidPriority),
            22 => Some(Self::NotConfigured),
            24 => Some(Self::NotImplemented),
            26 => Some(Self::NoMemory),
            27 => Some(Self::IoError),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn is_successful(self) -> bool {
        self == Self::Successful
    }
}

impl From<ScoreError> for StatusCode {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::InvalidName => Self::InvalidName,
            ScoreError::InvalidId => Self::InvalidId,
            ScoreError::TooMany => Self::TooMany,
            ScoreError::InvalidAddress => Self::InvalidAddress,
            ScoreError::InvalidNumber => Self::InvalidNumber,
            ScoreError::ResourceInUse => Self::ResourceInUse,
            ScoreError::IncorrectState => Self::IncorrectState,
            ScoreError::InvalidPriority => Self::InvalidPriority,
            ScoreError::NotConfigured => Self::NotConfigured,
            ScoreError::NotImplemented => Self::NotImplemented,
            ScoreError::NoMemory => Self::NoMemory,
            ScoreError::IoError => Self::IoError,
        }
    }
}

impl<T> From<Result<T>> for StatusCode {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::Successful,
            Err(err) => err.into(),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ScoreError::try_from(*self) {
            Ok(err) => err.fmt(f),
            Err(()) => write!(f, "successful"),
        }
    }
}

/// Error half of `StatusCode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreError {
    /// No object carries the requested name
    InvalidName,
    /// Identifier does not designate a configured object
    InvalidId,
    /// Object table is full
    TooMany,
    InvalidAddress,
    /// Index or mask out of range for this object
    InvalidNumber,
    /// Object is still used by something else
    ResourceInUse,
    /// Object is not in a state that permits the operation
    IncorrectState,
    InvalidPriority,
    /// Processor or object has no configuration entry
    NotConfigured,
    NotImplemented,
    NoMemory,
    IoError,
}

impl TryFrom<StatusCode> for ScoreError {
    type Error = ();

    fn try_from(code: StatusCode) -> core::result::Result<Self, ()> {
        match code {
            StatusCode::Successful => Err(()),
            StatusCode::InvalidName => Ok(Self::InvalidName),
            StatusCode::InvalidId => Ok(Self::InvalidId),
            StatusCode::TooMany => Ok(Self::TooMany),
            StatusCode::InvalidAddress => Ok(Self::InvalidAddress),
            StatusCode::InvalidNumber => Ok(Self::InvalidNumber),
            StatusCode::ResourceInUse => Ok(Self::ResourceInUse),
            StatusCode::IncorrectState => Ok(Self::IncorrectState),
            StatusCode::InvalidPriority => Ok(Self::InvalidPriority),
            StatusCode::NotConfigured => Ok(Self::NotConfigured),
            StatusCode::NotImplemented => Ok(Self::NotImplemented),
            StatusCode::NoMemory => Ok(Self::NoMemory),
            StatusCode::IoError => Ok(Self::IoError),
        }
    }
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidName => "invalid object name",
            Self::InvalidId => "invalid object id",
            Self::TooMany => "too many objects",
            Self::InvalidAddress => "invalid address",
            Self::InvalidNumber => "invalid number",
            Self::ResourceInUse => "resource in use",
            Self::IncorrectState => "incorrect state",
            Self::InvalidPriority => "invalid priority",
            Self::NotConfigured => "not configured",
            Self::NotImplemented => "not implemented",
            Self::NoMemory => "no memory",
            Self::IoError => "I/O error",
        };
        f.write_str(text)
    }
}

impl ScoreError {
    /// Can the caller fix the request and try again?
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NotImplemented | Self::NotConfigured)
    }

    /// Get error severity (0-2)
    pub fn severity(&self) -> u8 {
        match self {
            Self::NoMemory | Self::IoError => 2,
            Self::ResourceInUse | Self::IncorrectState | Self::TooMany => 1,
            _ => 0,
        }
    }
}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, ScoreError>;

/// Origin of a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalSource {
    /// Generic internal invariant violation
    InternalError,
    /// Chain linkage does not match the expected shape
    ChainCorrupted,
    /// A processor with a mandatory scheduler assignment did not come up
    MandatoryProcessorNotPresent,
    /// Thread dispatch enabled more often than disabled
    BadThreadDispatchDisableLevel,
}

impl fmt::Display for FatalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InternalError => write!(f, "internal error"),
            Self::ChainCorrupted => write!(f, "chain corrupted"),
            Self::MandatoryProcessorNotPresent => write!(f, "mandatory processor not present"),
            Self::BadThreadDispatchDisableLevel => write!(f, "bad thread dispatch disable level"),
        }
    }
}

/// Halt on a corrupted invariant
///
/// Never returns: the panic handler of the embedding kernel stops the
/// system.
#[cold]
pub fn fatal_error(source: FatalSource, reason: &str) -> ! {
    log::error!("[SCORE FATAL] {}: {}", source, reason);
    panic!("[SCORE FATAL] {}: {}", source, reason);
}

/// Critical invariant check, halts the system when violated
#[macro_export]
macro_rules! score_assert {
    ($cond:expr, $reason:expr) => {
        if !$cond {
            $crate::error::fatal_error($crate::error::FatalSource::InternalError, $reason);
        }
    };
    ($cond:expr, $source:expr, $reason:expr) => {
        if !$cond {
            $crate::error::fatal_error($source, $reason);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_raw_value() {
        for code in [
            StatusCode::Successful,
            StatusCode::InvalidId,
            StatusCode::ResourceInUse,
            StatusCode::IoError,
        ] {
            assert_eq!(StatusCode::from_u32(code.as_u32()), Some(code));
        }
        assert_eq!(StatusCode::from_u32(1), None);
    }

    #[test]
    fn test_result_maps_to_status() {
        let ok: Result<u32> = Ok(7);
        let err: Result<u32> = Err(ScoreError::ResourceInUse);
        assert_eq!(StatusCode::from(ok), StatusCode::Successful);
        assert_eq!(StatusCode::from(err), StatusCode::ResourceInUse);
        assert_eq!(StatusCode::ResourceInUse.as_u32(), 12);
    }

    #[test]
    #[should_panic(expected = "chain corrupted")]
    fn test_score_assert_halts() {
        score_assert!(1 + 1 == 3, FatalSource::ChainCorrupted, "arithmetic");
    }
}
