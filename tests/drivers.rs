use std::{
    fs,
    path::{Path, PathBuf},
};

use ocapi_triage::{
    chip::{self, access_path},
    disable::{run_disable, select_chips, CI_CONTROL_REGS},
    scom::debugfs::DebugfsScom,
    triage::{format_line, run_triage, Verbosity},
    targets::{Register, TargetEntry},
    Backend, ChipId, Config, FailurePolicy, ScomAdaptor, ScomError,
};

struct ScomTree(PathBuf);

impl ScomTree {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("ocapi-triage-{}-{name}", std::process::id()));
        let _ignore = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        Self(root)
    }

    fn add_chip(&self, chip: ChipId) -> PathBuf {
        let path = access_path(&self.0, chip);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let _file = fs::File::create(&path).unwrap();
        path
    }

    fn config(&self) -> Config {
        Config {
            debugfs_root: self.0.clone(),
            ..Config::default()
        }
    }

    fn root(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScomTree {
    fn drop(&mut self) {
        let _ignore = fs::remove_dir_all(&self.0);
    }
}

#[test]
fn discovery_lists_hex_chip_dirs_in_order() {
    let tree = ScomTree::new("discover");
    let _c10 = tree.add_chip(ChipId(0x10));
    let _c0 = tree.add_chip(ChipId(0));
    let _c8 = tree.add_chip(ChipId(8));
    fs::create_dir_all(tree.root().join("not-a-chip")).unwrap();

    let chips = chip::discover(tree.root()).unwrap();
    assert_eq!(chips, vec![ChipId(0), ChipId(8), ChipId(0x10)]);
    assert_eq!(select_chips(chips, Some(ChipId(8))), vec![ChipId(8)]);
}

#[test]
fn disable_pass_over_debugfs_file() {
    let tree = ScomTree::new("disable");
    let _path = tree.add_chip(ChipId(0));
    let config = tree.config();

    {
        let mut seed = DebugfsScom::open(tree.root(), ChipId(0), false).unwrap();
        for addr in CI_CONTROL_REGS {
            seed.write_scom(addr, 0).unwrap();
        }
        seed.write_scom(0x0501_1200, 0x40).unwrap();
        seed.write_scom(0x0501_1460, 0x0000_0000_0001_0041).unwrap();
    }

    let mut scom = Backend::Direct.open(&config, ChipId(0), false).unwrap();
    let mut out = Vec::new();
    let rewritten = run_disable(&mut scom, 0, &mut out).unwrap();
    assert_eq!(rewritten, 2);

    assert_eq!(scom.read_scom(0x0501_1200).unwrap(), 0x0000_0000_0002_0040);
    assert_eq!(scom.read_scom(0x0501_1460).unwrap(), 0x0000_0000_0003_0041);
    assert_eq!(scom.read_scom(0x0501_1000).unwrap(), 0);
}

#[test]
fn triage_pass_over_debugfs_file() {
    let tree = ScomTree::new("triage");
    let _path = tree.add_chip(ChipId(1));
    let config = tree.config();
    let entries = [
        TargetEntry::Section("Small Block"),
        TargetEntry::Register(Register {
            addr: 0x10,
            mask: Some(0x11),
            label: "Small FIR",
        }),
    ];

    let mut scom = Backend::Direct.open(&config, ChipId(1), false).unwrap();
    scom.write_scom(0x10, 0xf0f0).unwrap();
    scom.write_scom(0x11, 0x00f0).unwrap();

    let mut out = Vec::new();
    run_triage(&mut scom, &entries, Verbosity(0), &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert_eq!(
        out.lines().last().unwrap(),
        format_line("Small FIR (Masked):", 0xf000)
    );
}

#[test]
fn direct_backend_aborts_on_short_file() {
    let tree = ScomTree::new("short");
    let _path = tree.add_chip(ChipId(0));
    let mut scom = Backend::Direct.open(&tree.config(), ChipId(0), false).unwrap();
    assert!(matches!(scom.read_scom(0x10), Err(ScomError::Io(_))));
}

#[test]
fn configured_policy_overrides_backend_default() {
    let tree = ScomTree::new("policy");
    let _path = tree.add_chip(ChipId(0));
    let config = Config {
        on_access_failure: Some(FailurePolicy::LogAndContinue),
        ..tree.config()
    };
    let mut scom = Backend::Direct.open(&config, ChipId(0), false).unwrap();
    assert_eq!(scom.read_scom(0x10).unwrap(), 0);
}

#[test]
fn missing_chip_is_reported() {
    let tree = ScomTree::new("missing");
    let result = Backend::Direct.open(&tree.config(), ChipId(4), false);
    assert!(matches!(result, Err(ScomError::ChipNotFound(ChipId(4)))));
}
