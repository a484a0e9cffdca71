use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{
    chip::{access_path, ChipId},
    error::{Result, ScomError},
};

use super::{mangle, ScomAdaptor};

/// Register access through `/sys/kernel/debug/powerpc/scom/<chip>/access`.
///
/// Every access seeks to the mangled offset and transfers exactly 8 bytes in
/// big-endian order.
#[derive(Debug)]
pub struct DebugfsScom<F = File> {
    handle: F,
    debug: bool,
}

impl DebugfsScom<File> {
    /// Opens the access file of `chip` below `root`.
    pub fn open(root: impl AsRef<Path>, chip: ChipId, debug: bool) -> Result<Self> {
        let path = access_path(root, chip);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ScomError::ChipNotFound(chip),
                _ => ScomError::Io(err),
            })?;
        Ok(Self::new(file, debug))
    }
}

impl<F> DebugfsScom<F> {
    pub fn new(handle: F, debug: bool) -> Self {
        Self { handle, debug }
    }

    pub fn into_inner(self) -> F {
        self.handle
    }
}

impl<F: Read + Write + Seek> ScomAdaptor for DebugfsScom<F> {
    fn read_scom(&mut self, addr: u64) -> Result<u64> {
        let offset = mangle(addr);
        let _pos = self.handle.seek(SeekFrom::Start(offset))?;
        let mut buf = [0u8; 8];
        self.handle.read_exact(&mut buf)?;
        let value = u64::from_be_bytes(buf);
        if self.debug {
            println!("getscom(0x{offset:016x}) = {value:016x}");
        }
        Ok(value)
    }

    fn write_scom(&mut self, addr: u64, value: u64) -> Result<()> {
        let offset = mangle(addr);
        if self.debug {
            println!("putscom(0x{offset:016x}, 0x{value:016x})");
        }
        let _pos = self.handle.seek(SeekFrom::Start(offset))?;
        self.handle.write_all(&value.to_be_bytes())?;
        self.handle.flush()?;
        Ok(())
    }
}
