use std::{io, path::Path, process};

use clap::{ArgAction, Parser};
use log::{info, warn};
use nix::unistd::Uid;

use ocapi_triage::{
    chip,
    disable::{run_disable, select_chips},
    init_logger, Backend, ChipId, ConfigLoader, Result,
};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Disable NPU cache inject on SMs configured for OpenCAPI", long_about = None)]
struct Args {
    /// Verbose output (-vv also traces every debugfs access)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Only process this chip ID (default = all)
    #[arg(short, long)]
    chip: Option<u32>,
}

fn no_chips_message(root: &Path, filter: Option<ChipId>) -> String {
    match filter {
        Some(chip) => format!("chip {chip} not present under {}", root.display()),
        None => format!("no scom chips found under {}", root.display()),
    }
}

fn disable(args: &Args) -> Result<()> {
    let config = ConfigLoader::load_default()?;
    let filter = args.chip.map(ChipId);
    let discovered = chip::discover(&config.debugfs_root)?;
    let chips = select_chips(discovered, filter);
    if chips.is_empty() {
        warn!("{}", no_chips_message(&config.debugfs_root, filter));
    }

    let stdout = io::stdout();
    for chip in chips {
        let mut scom = Backend::Direct.open(&config, chip, args.verbose > 1)?;
        let rewritten = run_disable(&mut scom, args.verbose, &mut stdout.lock())?;
        info!("chip {chip}: cache inject disabled on {rewritten} SMs");
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    if !Uid::effective().is_root() {
        warn!("debugfs scom access usually requires root permissions");
    }

    if let Err(err) = disable(&args) {
        eprintln!("Error: {err}");
        process::exit(err.to_errno());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_chips_by_default() {
        let args = Args::try_parse_from(["ocapi_disable_ci"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert_eq!(args.chip, None);
        let chips = vec![ChipId(0), ChipId(8)];
        assert_eq!(select_chips(chips.clone(), args.chip.map(ChipId)), chips);
    }

    #[test]
    fn chip_filters_discovered_set() {
        let args = Args::try_parse_from(["ocapi_disable_ci", "-vv", "--chip", "8"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.chip, Some(8));
        assert_eq!(
            select_chips(vec![ChipId(0), ChipId(8)], args.chip.map(ChipId)),
            vec![ChipId(8)]
        );
    }

    #[test]
    fn positional_targets_are_rejected() {
        assert!(Args::try_parse_from(["ocapi_disable_ci", "fir"]).is_err());
    }

    #[test]
    fn empty_selection_wording() {
        let root = Path::new("/sys/kernel/debug/powerpc/scom");
        assert_eq!(
            no_chips_message(root, None),
            "no scom chips found under /sys/kernel/debug/powerpc/scom"
        );
        assert_eq!(
            no_chips_message(root, Some(ChipId(9))),
            "chip 00000009 not present under /sys/kernel/debug/powerpc/scom"
        );
    }
}
