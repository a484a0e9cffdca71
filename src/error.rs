//! Error types for SCOM register access.

use std::io;
use thiserror::Error;

use crate::{chip::ChipId, config::ConfigError};

/// Result type for SCOM operations.
pub type Result<T> = std::result::Result<T, ScomError>;

/// Errors that can occur while accessing SCOM registers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScomError {
    /// I/O error from the debugfs access file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No access file exists for the requested chip
    #[error("chip {0} not found")]
    ChipNotFound(ChipId),

    /// The vendor library returned a nonzero status
    #[error("vendor library {op} failed with rc {rc:#x}")]
    Vendor {
        /// Name of the failing entry point
        op: &'static str,
        /// Status code returned by the library
        rc: u32,
    },

    /// The vendor library could not be loaded
    #[error("vendor library load failed: {0}")]
    VendorLoad(String),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ScomError {
    /// Convert to an appropriate errno value
    #[inline]
    #[must_use]
    #[allow(clippy::wildcard_enum_match_arm)]
    pub fn to_errno(&self) -> i32 {
        match *self {
            ScomError::Io(ref e) => e.raw_os_error().unwrap_or(libc::EIO),
            ScomError::ChipNotFound(_) => libc::ENODEV,
            ScomError::InvalidInput(_) => libc::EINVAL,
            ScomError::VendorLoad(_) => libc::ELIBACC,
            _ => libc::EIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_follows_os_error() {
        let err = ScomError::from(io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(err.to_errno(), libc::EACCES);
    }

    #[test]
    fn errno_for_missing_chip() {
        let err = ScomError::ChipNotFound(ChipId(3));
        assert_eq!(err.to_errno(), libc::ENODEV);
        assert_eq!(err.to_string(), "chip 00000003 not found");
    }

    #[test]
    fn config_errors_convert() {
        let parse = toml::from_str::<crate::config::Config>("debugfs_root = 1").unwrap_err();
        let err = ScomError::from(ConfigError::from(parse));
        assert!(matches!(err, ScomError::Config(ConfigError::ParseError(_))));
        assert_eq!(err.to_errno(), libc::EIO);
    }

    #[test]
    fn vendor_error_message() {
        let err = ScomError::Vendor {
            op: "getScom",
            rc: 0x0100_0001,
        };
        assert_eq!(err.to_errno(), libc::EIO);
        assert_eq!(err.to_string(), "vendor library getScom failed with rc 0x1000001");
    }
}
