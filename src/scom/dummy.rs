use std::{
    collections::{HashMap, HashSet},
    io,
    sync::Arc,
};

use parking_lot::Mutex;

use crate::error::Result;

use super::ScomAdaptor;

#[derive(Default, Debug)]
struct Inner {
    regs: HashMap<u64, u64>,
    writes: Vec<(u64, u64)>,
    failing: HashSet<u64>,
}

/// Register file kept in memory. Clones share the same registers.
#[derive(Default, Clone, Debug)]
pub struct DummyScom(Arc<Mutex<Inner>>);

impl DummyScom {
    pub fn set(&self, addr: u64, value: u64) {
        let _ignore = self.0.lock().regs.insert(addr, value);
    }

    pub fn get(&self, addr: u64) -> u64 {
        self.0.lock().regs.get(&addr).copied().unwrap_or(0)
    }

    /// Every successful write in order.
    pub fn writes(&self) -> Vec<(u64, u64)> {
        self.0.lock().writes.clone()
    }

    /// Makes every access to `addr` fail with an I/O error.
    pub fn fail_on(&self, addr: u64) {
        let _ignore = self.0.lock().failing.insert(addr);
    }

    fn check(inner: &Inner, addr: u64) -> io::Result<()> {
        if inner.failing.contains(&addr) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access to 0x{addr:x} denied"),
            ));
        }
        Ok(())
    }
}

impl ScomAdaptor for DummyScom {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        let inner = self.0.lock();
        Self::check(&inner, addr)?;
        Ok(inner.regs.get(&addr).copied().unwrap_or(0))
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        let mut inner = self.0.lock();
        Self::check(&inner, addr)?;
        let _ignore = inner.regs.insert(addr, value);
        inner.writes.push((addr, value));
        Ok(())
    }
}
