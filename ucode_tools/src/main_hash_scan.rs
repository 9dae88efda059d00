//! Locates the hashes of the CPU microcode updates in a Thinkpad BIOS file
//! (e.g. T420, T430).
//!
//! The table follows the marker `TCPACPUH <13 bytes> IBMSECUR`. Both the
//! entries and the summary are printed to stderr.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use ucode_scan::scan_hash_table;
use ucode_tools::{load_image, output_failed, parse_args, report_hash_table};

/// Lists the CPU microcode hashes stored in a Thinkpad BIOS file
#[derive(Parser, Debug)]
#[command(name = "hash-scan", version, about, long_about = None)]
struct Args {
    /// BIOS file, either a dump of the SPI flash or a .FL1 file
    bios_file: PathBuf,
    /// Print the hash table as a JSON document on stdout
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

    let report = scan_hash_table(&image);

    let result = report_hash_table(
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
