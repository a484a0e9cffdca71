use std::io::Write;

use crate::{
    error::Result,
    scom::ScomAdaptor,
    targets::{Register, TargetEntry},
};

const LABEL_WIDTH: usize = 46;
const BANNER: &str = "############################################";

/// How much of each register the triage pass prints.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Verbosity {
    /// Masked values are printed even when zero.
    pub fn shows_zero(self) -> bool {
        self.0 >= 1
    }

    /// Raw value and mask are printed too.
    pub fn shows_raw(self) -> bool {
        self.0 >= 2
    }
}

/// `0x` followed by 16 zero-padded hex digits.
pub fn format_hex(value: u64) -> String {
    format!("{value:#018x}")
}

pub fn format_line(label: &str, value: u64) -> String {
    format!("{label:<LABEL_WIDTH$}{}", format_hex(value))
}

/// Clears every bit of `value` that is set in `mask`.
#[inline]
pub const fn apply_mask(value: u64, mask: u64) -> u64 {
    value & !mask
}

fn dump_register<S, W>(scom: &mut S, reg: &Register, verbosity: Verbosity, out: &mut W) -> Result<()>
where
    S: ScomAdaptor + ?Sized,
    W: Write,
{
    let value = scom.read_scom(reg.addr)?;
    let mask = match reg.mask {
        Some(addr) => scom.read_scom(addr)?,
        None => 0,
    };
    let masked = apply_mask(value, mask);

    if verbosity.shows_raw() {
        writeln!(out, "{}", format_line(&format!("{}:", reg.label), value))?;
        writeln!(out, "{}", format_line(&format!("{} Mask:", reg.label), mask))?;
    }
    if verbosity.shows_zero() || masked != 0 {
        writeln!(
            out,
            "{}",
            format_line(&format!("{} (Masked):", reg.label), masked)
        )?;
    }
    Ok(())
}

/// Reads and prints every entry in order.
///
/// # Errors
///
/// Stops at the first register access or output error.
pub fn run_triage<S, W>(
    scom: &mut S,
    entries: &[TargetEntry],
    verbosity: Verbosity,
    out: &mut W,
) -> Result<()>
where
    S: ScomAdaptor + ?Sized,
    W: Write,
{
    for entry in entries {
        match *entry {
            TargetEntry::Section(label) => {
                writeln!(out, "{BANNER}")?;
                writeln!(out, "{label}")?;
                writeln!(out, "{BANNER}")?;
            }
            TargetEntry::Register(ref reg) => dump_register(scom, reg, verbosity, out)?,
        }
    }
    Ok(())
}
