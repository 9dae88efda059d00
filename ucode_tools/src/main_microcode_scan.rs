//! Dumps the CPU microcode updates found in a BIOS file.
//!
//! The update blocks are listed on stdout, the summary goes to stderr.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use ucode_scan::scan_microcode;
use ucode_tools::{load_image, output_failed, parse_args, report_microcode};

/// Lists the CPU microcode updates found in a BIOS file
#[derive(Parser, Debug)]
#[command(name = "microcode-scan", version, about, long_about = None)]
struct Args {
    /// BIOS file, either a dump of the SPI flash or a .FL1 file
    bios_file: PathBuf,
    /// Print the updates as a JSON document instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args::<Args>() {
        Ok(args) => args,
        Err(code) => return ExitCode::from(code),
    };

    let image = match load_image(&args.bios_file) {
        Ok(image) => image,
        Err(code) => return ExitCode::from(code),
    };

    let report = scan_microcode(&image);

    let result = report_microcode(
        &report,
        args.json,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(output_failed(err)),
    }
}
