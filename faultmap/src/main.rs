//! # faultmap - Main Entry Point
//!
//! Two subcommands, run in order for one package:
//! - **collect**: cold-start the app under a page-fault trace, then snapshot
//!   its file layout (memory map or inode table)
//! - **process**: query the trace and write `mapped_faults.csv` and
//!   `file_sizes.csv` into the same output directory

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use faultmap::cli::{Args, Command};
use faultmap::device::AdbDevice;
use faultmap::domain::{CollaboratorError, UsageError};
use faultmap::pipeline::{run_collect, run_process};
use faultmap::resolver::display_statistics;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_UNAVAILABLE: i32 = 69;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("faultmap=info")).init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.chain().any(|cause| cause.is::<UsageError>()) {
        return EXIT_USAGE;
    }
    let unavailable = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<CollaboratorError>())
        .any(CollaboratorError::is_unavailable);
    if unavailable {
        EXIT_UNAVAILABLE
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let device = AdbDevice::new(args.serial.clone()).with_program(&args.adb);

    match &args.command {
        Command::Collect(collect) => {
            let opts = collect.to_options(args.serial.clone());
            let mode = run_collect(&device, &opts).await?;
            if !args.quiet {
                info!("Collected {mode} mode capture in {}", opts.output_dir.display());
            }
        }
        Command::Process(process) => {
            let opts = process.to_options().map_err(UsageError)?;
            let stats = run_process(&device, &opts)?;
            if !args.quiet {
                display_statistics(&stats);
                info!("Results written to {}", opts.output_dir.display());
            }
        }
    }

    Ok(())
}
