//! SCOM register access backends.
//!
//! Two transports implement [`ScomAdaptor`]: the kernel debugfs access file
//! and the eCMD vendor library. Which one a process uses is decided once by
//! [`Backend::probe`].

/// Kernel debugfs backend
pub mod debugfs;

/// eCMD vendor library backend
pub mod ecmd;

/// In-memory register file for tests
#[cfg(any(test, feature = "mock"))]
pub mod dummy;

use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::{
    chip::ChipId,
    config::Config,
    error::{Result, ScomError},
};

use self::{debugfs::DebugfsScom, ecmd::EcmdLibrary, ecmd::EcmdScom};

/// Bit 63 selects the indirect/multicast address range.
const INDIRECT_BIT: u64 = 1 << 63;
/// Extra bit the hardware requires for indirect addresses.
const INDIRECT_SELECT_BIT: u64 = 1 << 59;
/// Each register occupies 8 bytes of the access file.
const REG_SHIFT: u32 = 3;

/// Converts a SCOM address into a byte offset of the debugfs access file.
#[inline]
#[must_use]
pub const fn mangle(addr: u64) -> u64 {
    let addr = if addr & INDIRECT_BIT != 0 {
        addr | INDIRECT_SELECT_BIT
    } else {
        addr
    };
    addr << REG_SHIFT
}

/// A trait for reading and writing 64-bit SCOM registers of one chip.
pub trait ScomAdaptor {
    /// Reads the register at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn read_scom(&mut self, addr: u64) -> Result<u64>;

    /// Writes `value` to the register at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()>;
}

impl<A: ScomAdaptor + ?Sized> ScomAdaptor for Box<A> {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        (**self).read_scom(addr)
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        (**self).write_scom(addr, value)
    }
}

impl<A: ScomAdaptor + ?Sized> ScomAdaptor for &mut A {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        (**self).read_scom(addr)
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        (**self).write_scom(addr, value)
    }
}

/// What to do when a register access fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Propagate the error and stop.
    Abort,
    /// Log the error; reads yield the reset value 0.
    LogAndContinue,
}

impl FailurePolicy {
    fn recover(self, op: &str, addr: u64, err: ScomError) -> Result<()> {
        match self {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::LogAndContinue => {
                error!("{op}(0x{addr:016x}) failed: {err}");
                Ok(())
            }
        }
    }
}

/// Applies a [`FailurePolicy`] to every access of the wrapped adaptor.
#[derive(Debug)]
pub struct PolicyScom<A> {
    inner: A,
    policy: FailurePolicy,
}

impl<A> PolicyScom<A> {
    pub fn new(inner: A, policy: FailurePolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: ScomAdaptor> ScomAdaptor for PolicyScom<A> {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        match self.inner.read_scom(addr) {
            Ok(value) => Ok(value),
            Err(err) => self.policy.recover("getscom", addr, err).map(|()| 0),
        }
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        match self.inner.write_scom(addr, value) {
            Ok(()) => Ok(()),
            Err(err) => self.policy.recover("putscom", addr, err),
        }
    }
}

/// The register transport chosen for this process.
#[derive(Clone)]
pub enum Backend {
    /// Kernel debugfs access files
    Direct,
    /// eCMD vendor library
    Vendor(Arc<EcmdLibrary>),
}

impl Backend {
    /// Picks the vendor library when it can be loaded, otherwise debugfs.
    pub fn probe(config: &Config) -> Self {
        match EcmdLibrary::from_env(config) {
            Ok(lib) => {
                info!("using eCMD vendor library for scom access");
                Self::Vendor(Arc::new(lib))
            }
            Err(err) => {
                info!("eCMD unavailable ({err}), using debugfs scom access");
                Self::Direct
            }
        }
    }

    pub fn is_vendor(&self) -> bool {
        matches!(*self, Self::Vendor(_))
    }

    /// Direct access is fatal on error, the vendor library only logs.
    pub fn default_policy(&self) -> FailurePolicy {
        match *self {
            Self::Direct => FailurePolicy::Abort,
            Self::Vendor(_) => FailurePolicy::LogAndContinue,
        }
    }

    /// Opens a register handle for `chip`.
    ///
    /// # Errors
    ///
    /// Returns [`ScomError::ChipNotFound`] if debugfs has no access file for
    /// the chip, or an I/O error if it cannot be opened.
    pub fn open(
        &self,
        config: &Config,
        chip: ChipId,
        debug: bool,
    ) -> Result<Box<dyn ScomAdaptor>> {
        let policy = config
            .on_access_failure
            .unwrap_or_else(|| self.default_policy());
        let adaptor: Box<dyn ScomAdaptor> = match *self {
            Self::Direct => {
                let scom = DebugfsScom::open(&config.debugfs_root, chip, debug)?;
                Box::new(PolicyScom::new(scom, policy))
            }
            Self::Vendor(ref lib) => {
                let scom = EcmdScom::new(Arc::clone(lib), chip, debug);
                Box::new(PolicyScom::new(scom, policy))
            }
        };
        Ok(adaptor)
    }
}
