use std::{io, process};

use clap::{ArgAction, Parser};
use log::warn;
use nix::unistd::Uid;

use ocapi_triage::{
    init_logger, logs,
    targets::{assign_targets, TargetGroup},
    triage::{run_triage, Verbosity},
    Backend, ChipId, ConfigLoader, Result,
};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Print OpenCAPI link registers of a POWER chip", long_about = None)]
struct Args {
    /// Verbose output (prints scoms with fully masked output, -vv to also
    /// print raw data and mask)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Target chip ID
    #[arg(short, long, default_value_t = 0)]
    chip: u32,
    /// Targets to print (by default, prints all)
    #[arg(value_enum)]
    targets: Vec<TargetGroup>,
}

fn triage(args: &Args) -> Result<()> {
    let config = ConfigLoader::load_default()?;
    let backend = Backend::probe(&config);

    let entries = assign_targets(&args.targets);
    let mut scom = backend.open(&config, ChipId(args.chip), false)?;
    let stdout = io::stdout();
    run_triage(
        &mut scom,
        &entries,
        Verbosity(args.verbose),
        &mut stdout.lock(),
    )?;

    let _collected = logs::collect_after_triage(&backend, &config.log_script);
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    if !Uid::effective().is_root() {
        warn!("debugfs scom access usually requires root permissions");
    }

    if let Err(err) = triage(&args) {
        eprintln!("Error: {err}");
        process::exit(err.to_errno());
    }
}
