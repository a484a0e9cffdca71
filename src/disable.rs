//! Disables NPU cache inject on every SM configured for OpenCAPI.

use std::io::Write;

use log::info;

use crate::{chip::ChipId, error::Result, scom::ScomAdaptor};

/// Misc config registers of SM0..SM3 on stacks 0, 1 and 2.
pub const CI_CONTROL_REGS: [u64; 12] = [
    0x0501_1000,
    0x0501_1030,
    0x0501_1060,
    0x0501_1090,
    0x0501_1200,
    0x0501_1230,
    0x0501_1260,
    0x0501_1290,
    0x0501_1400,
    0x0501_1430,
    0x0501_1460,
    0x0501_1490,
];

/// Bit 57 (MSB0): the SM is configured in OpenCAPI mode.
pub const OCAPI_MODE_BIT: u64 = 0x0000_0000_0000_0040;
/// Bit 46 (MSB0): disables cache inject.
pub const CACHE_INJECT_DISABLE_BIT: u64 = 0x0000_0000_0002_0000;

/// The value to write back, or `None` when the SM is not in OpenCAPI mode.
#[inline]
pub const fn disable_cache_inject(value: u64) -> Option<u64> {
    if value & OCAPI_MODE_BIT != 0 {
        Some(value | CACHE_INJECT_DISABLE_BIT)
    } else {
        None
    }
}

/// Keeps only the chip named on the command line, or all of them.
pub fn select_chips(discovered: Vec<ChipId>, filter: Option<ChipId>) -> Vec<ChipId> {
    match filter {
        Some(chip) => discovered.into_iter().filter(|c| *c == chip).collect(),
        None => discovered,
    }
}

/// Runs the disable pass over one chip and returns how many registers were
/// rewritten.
///
/// # Errors
///
/// Stops at the first register access or output error.
pub fn run_disable<S, W>(scom: &mut S, verbose: u8, out: &mut W) -> Result<usize>
where
    S: ScomAdaptor + ?Sized,
    W: Write,
{
    let mut rewritten = 0;
    for addr in CI_CONTROL_REGS {
        let data = scom.read_scom(addr)?;
        if verbose > 0 {
            writeln!(out, "getscom(0x{addr:016x}) = {data:016x}")?;
        }
        let Some(data) = disable_cache_inject(data) else {
            continue;
        };
        if verbose > 0 {
            writeln!(out, "putscom(0x{addr:016x}, 0x{data:016x})")?;
        }
        scom.write_scom(addr, data)?;
        info!("cache inject disabled at 0x{addr:x}");
        rewritten += 1;
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use crate::scom::dummy::DummyScom;

    use super::*;

    #[test]
    fn ocapi_mode_sets_disable_bit() {
        assert_eq!(disable_cache_inject(0x40), Some(0x2_0040));
        assert_eq!(disable_cache_inject(0x2_0040), Some(0x2_0040));
        assert_eq!(disable_cache_inject(0xffff_0000_0000_0041), Some(0xffff_0000_0002_0041));
    }

    #[test]
    fn non_ocapi_mode_is_untouched() {
        assert_eq!(disable_cache_inject(0), None);
        assert_eq!(disable_cache_inject(0xffff_ffff_ffff_ffbf), None);
    }

    #[test]
    fn only_ocapi_sms_are_written() {
        let mut scom = DummyScom::default();
        scom.set(0x0501_1200, 0x40);
        scom.set(0x0501_1430, 0x8000_0000_0000_0041);
        scom.set(0x0501_1000, 0x1);
        let mut out = Vec::new();
        let rewritten = run_disable(&mut scom, 0, &mut out).unwrap();
        assert_eq!(rewritten, 2);
        assert_eq!(
            scom.writes(),
            vec![
                (0x0501_1200, 0x2_0040),
                (0x0501_1430, 0x8000_0000_0002_0041)
            ]
        );
        assert_eq!(scom.get(0x0501_1000), 0x1);
        assert!(out.is_empty());
    }

    #[test]
    fn verbose_traces_accesses() {
        let mut scom = DummyScom::default();
        scom.set(0x0501_1000, 0x40);
        let mut out = Vec::new();
        let _rewritten = run_disable(&mut scom, 1, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), CI_CONTROL_REGS.len() + 1);
        assert_eq!(lines[0], "getscom(0x0000000005011000) = 0000000000000040");
        assert_eq!(lines[1], "putscom(0x0000000005011000, 0x0000000000020040)");
        assert_eq!(lines[2], "getscom(0x0000000005011030) = 0000000000000000");
    }

    #[test]
    fn failure_aborts_remaining_registers() {
        let mut scom = DummyScom::default();
        scom.set(0x0501_1400, 0x40);
        scom.fail_on(0x0501_1290);
        let mut out = Vec::new();
        assert!(run_disable(&mut scom, 0, &mut out).is_err());
        assert!(scom.writes().is_empty());
    }

    #[test]
    fn chip_filter() {
        let chips = vec![ChipId(0), ChipId(8)];
        assert_eq!(select_chips(chips.clone(), None), chips);
        assert_eq!(select_chips(chips.clone(), Some(ChipId(8))), vec![ChipId(8)]);
        assert!(select_chips(chips, Some(ChipId(1))).is_empty());
    }
}
