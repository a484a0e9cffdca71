//! Register groups printed by the triage tool.
//!
//! Stack 1 and stack 2 of the NPU carry the OpenCAPI bricks. Within a stack
//! the SM blocks sit at 0x00/0x30/0x60/0x90, CS.CTL.MISC at 0xC0, DAT.MISC at
//! 0xF0 and the two OTL blocks at 0x120/0x150.

use clap::ValueEnum;

/// A register to read, with the register holding its mask if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub addr: u64,
    pub mask: Option<u64>,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEntry {
    /// Prints a banner instead of reading a register
    Section(&'static str),
    Register(Register),
}

const fn reg(addr: u64, label: &'static str) -> TargetEntry {
    TargetEntry::Register(Register {
        addr,
        mask: None,
        label,
    })
}

const fn masked(addr: u64, mask: u64, label: &'static str) -> TargetEntry {
    TargetEntry::Register(Register {
        addr,
        mask: Some(mask),
        label,
    })
}

/// Named register group selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TargetGroup {
    /// Global FIR scoms
    Fir,
    /// ODL FIR and status scoms
    Odl,
    /// Stack 1 OTL scoms
    Otl1,
    /// Stack 2 OTL scoms
    Otl2,
    /// Stack 1 CS.CTL.MISC scoms
    Ctl1,
    /// Stack 2 CS.CTL.MISC scoms
    Ctl2,
    /// Stack 1 DAT.MISC scoms
    Dat1,
    /// Stack 2 DAT.MISC scoms
    Dat2,
    /// Stack 1 CS.SMx scoms
    Smx1,
    /// Stack 2 CS.SMx scoms
    Smx2,
    /// Every group above
    All,
}

impl TargetGroup {
    /// Every concrete group in print order.
    pub const ALL: [TargetGroup; 10] = [
        TargetGroup::Fir,
        TargetGroup::Odl,
        TargetGroup::Otl1,
        TargetGroup::Otl2,
        TargetGroup::Ctl1,
        TargetGroup::Ctl2,
        TargetGroup::Dat1,
        TargetGroup::Dat2,
        TargetGroup::Smx1,
        TargetGroup::Smx2,
    ];

    /// Table entries of this group; empty for [`TargetGroup::All`].
    pub fn entries(self) -> &'static [TargetEntry] {
        match self {
            TargetGroup::Fir => FIR,
            TargetGroup::Odl => ODL,
            TargetGroup::Otl1 => OTL1,
            TargetGroup::Otl2 => OTL2,
            TargetGroup::Ctl1 => CTL1,
            TargetGroup::Ctl2 => CTL2,
            TargetGroup::Dat1 => DAT1,
            TargetGroup::Dat2 => DAT2,
            TargetGroup::Smx1 => SMX1,
            TargetGroup::Smx2 => SMX2,
            TargetGroup::All => &[],
        }
    }
}

/// Expands the requested groups into the entries to print.
///
/// Groups keep the order they were given in; no groups means all of them.
pub fn assign_targets(groups: &[TargetGroup]) -> Vec<TargetEntry> {
    let expand = |group: TargetGroup| -> Vec<TargetGroup> {
        match group {
            TargetGroup::All => TargetGroup::ALL.to_vec(),
            other => vec![other],
        }
    };
    let groups = if groups.is_empty() {
        TargetGroup::ALL.to_vec()
    } else {
        groups.iter().copied().flat_map(expand).collect()
    };
    groups
        .into_iter()
        .flat_map(|group| group.entries().iter().copied())
        .collect()
}

static FIR: &[TargetEntry] = &[
    TargetEntry::Section("Global FIRs"),
    reg(0x500F_001C, "Global Checkstop FIR"),
    reg(0x500F_001B, "Global Recoverable FIR"),
    reg(0x500F_0040, "Global Special Attention FIR"),
    masked(0x0501_3C00, 0x0501_3C03, "NPU FIR0"),
    masked(0x0501_3C40, 0x0501_3C43, "NPU FIR1"),
    masked(0x0501_3C80, 0x0501_3C83, "NPU FIR2"),
];

static ODL: &[TargetEntry] = &[
    TargetEntry::Section("ODL FIR and Status"),
    masked(0x0901_0800, 0x0901_0803, "OB0 DL FIR"),
    reg(0x0901_080C, "OB0 ODL0 Config"),
    reg(0x0901_080D, "OB0 ODL1 Config"),
    reg(0x0901_0816, "OB0 ODL0 Error Capture"),
    reg(0x0901_0817, "OB0 ODL1 Error Capture"),
    reg(0x0901_0828, "OB0 ODL0 Status"),
    reg(0x0901_0829, "OB0 ODL1 Status"),
    reg(0x0901_082A, "OB0 ODL0 Training Status"),
    reg(0x0901_082B, "OB0 ODL1 Training Status"),
    masked(0x0C01_0800, 0x0C01_0803, "OB3 DL FIR"),
    reg(0x0C01_080C, "OB3 ODL0 Config"),
    reg(0x0C01_080D, "OB3 ODL1 Config"),
    reg(0x0C01_0816, "OB3 ODL0 Error Capture"),
    reg(0x0C01_0817, "OB3 ODL1 Error Capture"),
    reg(0x0C01_0828, "OB3 ODL0 Status"),
    reg(0x0C01_0829, "OB3 ODL1 Status"),
    reg(0x0C01_082A, "OB3 ODL0 Training Status"),
    reg(0x0C01_082B, "OB3 ODL1 Training Status"),
];

static OTL1: &[TargetEntry] = &[
    TargetEntry::Section("Stack 1 OTL"),
    reg(0x0501_1320, "Stack 1 OTL0 Config0"),
    reg(0x0501_1321, "Stack 1 OTL0 Config1"),
    reg(0x0501_1322, "Stack 1 OTL0 TLX Credits"),
    masked(0x0501_1323, 0x0501_1324, "Stack 1 OTL0 Error Report"),
    reg(0x0501_1325, "Stack 1 OTL0 Error Report Hold"),
    reg(0x0501_1350, "Stack 1 OTL1 Config0"),
    reg(0x0501_1351, "Stack 1 OTL1 Config1"),
    reg(0x0501_1352, "Stack 1 OTL1 TLX Credits"),
    masked(0x0501_1353, 0x0501_1354, "Stack 1 OTL1 Error Report"),
    reg(0x0501_1355, "Stack 1 OTL1 Error Report Hold"),
];

static OTL2: &[TargetEntry] = &[
    TargetEntry::Section("Stack 2 OTL"),
    reg(0x0501_1520, "Stack 2 OTL0 Config0"),
    reg(0x0501_1521, "Stack 2 OTL0 Config1"),
    reg(0x0501_1522, "Stack 2 OTL0 TLX Credits"),
    masked(0x0501_1523, 0x0501_1524, "Stack 2 OTL0 Error Report"),
    reg(0x0501_1525, "Stack 2 OTL0 Error Report Hold"),
    reg(0x0501_1550, "Stack 2 OTL1 Config0"),
    reg(0x0501_1551, "Stack 2 OTL1 Config1"),
    reg(0x0501_1552, "Stack 2 OTL1 TLX Credits"),
    masked(0x0501_1553, 0x0501_1554, "Stack 2 OTL1 Error Report"),
    reg(0x0501_1555, "Stack 2 OTL1 Error Report Hold"),
];

static CTL1: &[TargetEntry] = &[
    TargetEntry::Section("Stack 1 CS.CTL.MISC"),
    reg(0x0501_12C0, "Stack 1 CTL Config"),
    reg(0x0501_12C1, "Stack 1 CTL Status"),
    masked(0x0501_12C2, 0x0501_12C3, "Stack 1 CTL Error Report"),
    reg(0x0501_12C4, "Stack 1 CTL BAR"),
];

static CTL2: &[TargetEntry] = &[
    TargetEntry::Section("Stack 2 CS.CTL.MISC"),
    reg(0x0501_14C0, "Stack 2 CTL Config"),
    reg(0x0501_14C1, "Stack 2 CTL Status"),
    masked(0x0501_14C2, 0x0501_14C3, "Stack 2 CTL Error Report"),
    reg(0x0501_14C4, "Stack 2 CTL BAR"),
];

static DAT1: &[TargetEntry] = &[
    TargetEntry::Section("Stack 1 DAT.MISC"),
    reg(0x0501_12F0, "Stack 1 DAT Config"),
    reg(0x0501_12F1, "Stack 1 DAT Status"),
    masked(0x0501_12F2, 0x0501_12F3, "Stack 1 DAT Error Report"),
];

static DAT2: &[TargetEntry] = &[
    TargetEntry::Section("Stack 2 DAT.MISC"),
    reg(0x0501_14F0, "Stack 2 DAT Config"),
    reg(0x0501_14F1, "Stack 2 DAT Status"),
    masked(0x0501_14F2, 0x0501_14F3, "Stack 2 DAT Error Report"),
];

static SMX1: &[TargetEntry] = &[
    TargetEntry::Section("Stack 1 CS.SMx"),
    reg(0x0501_1200, "Stack 1 SM0 Misc Config0"),
    reg(0x0501_1201, "Stack 1 SM0 Misc Config1"),
    reg(0x0501_1230, "Stack 1 SM1 Misc Config0"),
    reg(0x0501_1231, "Stack 1 SM1 Misc Config1"),
    reg(0x0501_1260, "Stack 1 SM2 Misc Config0"),
    reg(0x0501_1261, "Stack 1 SM2 Misc Config1"),
    reg(0x0501_1290, "Stack 1 SM3 Misc Config0"),
    reg(0x0501_1291, "Stack 1 SM3 Misc Config1"),
];

static SMX2: &[TargetEntry] = &[
    TargetEntry::Section("Stack 2 CS.SMx"),
    reg(0x0501_1400, "Stack 2 SM0 Misc Config0"),
    reg(0x0501_1401, "Stack 2 SM0 Misc Config1"),
    reg(0x0501_1430, "Stack 2 SM1 Misc Config0"),
    reg(0x0501_1431, "Stack 2 SM1 Misc Config1"),
    reg(0x0501_1460, "Stack 2 SM2 Misc Config0"),
    reg(0x0501_1461, "Stack 2 SM2 Misc Config1"),
    reg(0x0501_1490, "Stack 2 SM3 Misc Config0"),
    reg(0x0501_1491, "Stack 2 SM3 Misc Config1"),
];
