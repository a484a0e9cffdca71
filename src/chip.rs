use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::debug;

/// Index of a processor chip as exposed by the scom debugfs directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChipId(pub u32);

impl ChipId {
    pub fn into_inner(self) -> u32 {
        self.0
    }
}

impl From<u32> for ChipId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Parse error
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("invalid chip id: {0}")]
pub struct ParseChipIdError(String);

impl FromStr for ChipId {
    type Err = ParseChipIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_err| ParseChipIdError(s.to_owned()))
    }
}

/// Path of the per-chip register access file below `root`.
pub fn access_path(root: impl AsRef<Path>, chip: ChipId) -> PathBuf {
    root.as_ref().join(chip.to_string()).join("access")
}

/// Lists the chips present under `root`, in ascending order.
///
/// Entries whose names are not hexadecimal are skipped.
pub fn discover(root: impl AsRef<Path>) -> io::Result<Vec<ChipId>> {
    let mut chips = Vec::new();
    for entry in fs::read_dir(root.as_ref())? {
        let entry = entry?;
        let name = entry.file_name();
        match name.to_str().map(str::parse::<ChipId>) {
            Some(Ok(chip)) => chips.push(chip),
            _ => debug!("skipping scom entry {name:?}"),
        }
    }
    chips.sort_unstable();
    Ok(chips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_id_display_is_eight_hex_digits() {
        assert_eq!(ChipId(0).to_string(), "00000000");
        assert_eq!(ChipId(0x8).to_string(), "00000008");
        assert_eq!(ChipId(0x10).to_string(), "00000010");
    }

    #[test]
    fn chip_id_parses_hex() {
        assert_eq!("00000010".parse::<ChipId>(), Ok(ChipId(16)));
        assert_eq!("0x8".parse::<ChipId>(), Ok(ChipId(8)));
        assert!("chip0".parse::<ChipId>().is_err());
        assert!("".parse::<ChipId>().is_err());
    }

    #[test]
    fn access_path_layout() {
        let path = access_path("/sys/kernel/debug/powerpc/scom", ChipId(8));
        assert_eq!(
            path,
            PathBuf::from("/sys/kernel/debug/powerpc/scom/00000008/access")
        );
    }
}
