//! # Ucode tools
//!
//! Shared plumbing of the `microcode-scan` and `hash-scan` binaries:
//! argument handling with fixed exit codes, loading the image and rendering
//! the scan reports.
//!
//! Record listings and summaries are written to caller supplied writers, so
//! the binaries decide which goes to stdout and which to stderr.

use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use data_types::MicrocodeRecord;
use log::error;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::Path;
use ucode_scan::hash_table::{ANCHOR_PREFIX, ANCHOR_SUFFIX};
use ucode_scan::source::FirmwareImage;
use ucode_scan::{HashTableReport, MicrocodeLayout, MicrocodeReport};

/// Missing or malformed command line arguments.
pub const EXIT_USAGE: u8 = 1;
/// The image could not be loaded.
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 3;
/// The report could not be written, e.g. because stdout was closed.
pub const EXIT_OUTPUT_FAILED: u8 = 4;

/// Exit code for a failed argument parse.
pub fn parse_exit_code(kind: ClapErrorKind) -> u8 {
    match kind {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
        _ => EXIT_USAGE,
    }
}

/// Parses the process arguments. On failure the message is printed and the
/// exit code to terminate with is returned.
pub fn parse_args<T: Parser>() -> Result<T, u8> {
    T::try_parse().map_err(|err| {
        if let Err(print_err) = err.print() {
            error!("Failed to print the usage message: {}", print_err);
        }
        parse_exit_code(err.kind())
    })
}

/// Loads the image, reporting a failure on stderr.
pub fn load_image(path: &Path) -> Result<FirmwareImage, u8> {
    FirmwareImage::open(path).map_err(|err| {
        eprintln!("#ERR {}", err);
        EXIT_SOURCE_UNAVAILABLE
    })
}

pub fn write_microcode_record<W: Write>(out: &mut W, record: &MicrocodeRecord) -> io::Result<()> {
    let h = &record.header;
    writeln!(out, "microcode at 0x{:08x}:", record.offset)?;
    writeln!(out, "  update revision:       {}", h.update_rev)?;
    writeln!(out, "  date:                  {}", h.date)?;
    writeln!(out, "  processor signature:   0x{:x}", h.proc_sig)?;
    writeln!(out, "  loader revision:       {}", h.loader_rev)?;
    writeln!(out, "  processor flags:       0x{:x}", h.proc_flags)?;
    writeln!(out, "  data size:             0x{:x} ({})", h.data_size, h.data_size)?;
    writeln!(out, "  total size:            0x{:x} ({})", h.total_size, h.total_size)
}

pub fn write_microcode_summary<W: Write>(diag: &mut W, report: &MicrocodeReport) -> io::Result<()> {
    match report.layout() {
        MicrocodeLayout::NotFound => writeln!(diag, "no CPU microcode found"),
        MicrocodeLayout::Contiguous { offset, length } => writeln!(
            diag,
            "\n{} CPU microcodes found at file offset 0x{:08x}, overall length 0x{:x}",
            report.count(),
            offset,
            length
        ),
        MicrocodeLayout::Scattered => writeln!(
            diag,
            "\n{} CPU microcodes found at various locations",
            report.count()
        ),
    }
}

pub fn microcode_json(report: &MicrocodeReport) -> Value {
    let layout = match report.layout() {
        MicrocodeLayout::NotFound => json!("not_found"),
        MicrocodeLayout::Contiguous { offset, length } => {
            json!({ "contiguous": { "offset": offset, "length": length } })
        }
        MicrocodeLayout::Scattered => json!("scattered"),
    };

    json!({
        "count": report.count(),
        "size_sum": report.size_sum(),
        "layout": layout,
        "records": report.records(),
    })
}

/// Writes the microcode report: records to `out`, summary to `diag`.
pub fn report_microcode<O: Write, E: Write>(
    report: &MicrocodeReport,
    json: bool,
    out: &mut O,
    diag: &mut E,
) -> io::Result<()> {
    if json {
        write_json(out, &microcode_json(report))?;
    } else {
        for record in report.records() {
            write_microcode_record(out, record)?;
        }
    }
    write_microcode_summary(diag, report)
}

pub fn write_hash_summary<W: Write>(diag: &mut W, report: &HashTableReport) -> io::Result<()> {
    match report {
        HashTableReport::AnchorNotFound => writeln!(
            diag,
            "couldn't find marker {}.*{}",
            String::from_utf8_lossy(ANCHOR_PREFIX),
            String::from_utf8_lossy(ANCHOR_SUFFIX)
        ),
        HashTableReport::Table { records, .. } if records.is_empty() => {
            writeln!(diag, "no CPU microcode hashes found")
        }
        HashTableReport::Table { anchor, records } => writeln!(
            diag,
            "{} CPU microcode hashes found at file offset 0x{:08x} length 0x{:x}",
            records.len(),
            anchor,
            report.scanned_len()
        ),
    }
}

pub fn hash_table_json(report: &HashTableReport) -> Value {
    json!({
        "anchor": report.anchor(),
        "scanned_len": report.scanned_len(),
        "records": report.records(),
    })
}

/// Writes the hash table report. Record lines go to `diag` like the
/// summary, only the JSON document goes to `out`.
pub fn report_hash_table<O: Write, E: Write>(
    report: &HashTableReport,
    json: bool,
    out: &mut O,
    diag: &mut E,
) -> io::Result<()> {
    if json {
        write_json(out, &hash_table_json(report))?;
    } else {
        for record in report.records() {
            writeln!(
                diag,
                "{}. CPU microcode hash at offset {:08x}, cpuid {:x}",
                record.index, record.offset, record.cpuid
            )?;
        }
    }
    write_hash_summary(diag, report)
}

fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(io::Error::from)?;
    writeln!(out)
}

/// Logs a failure to emit the report and returns the exit code for it.
pub fn output_failed(err: io::Error) -> u8 {
    error!("Failed to write the report: {}", err);
    EXIT_OUTPUT_FAILED
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_types::{HashRecord, MicrocodeDate, MicrocodeHeader};
    use ucode_scan::checksum::dword_checksum;
    use ucode_scan::{scan_hash_table, scan_microcode};

    fn update(total_size: u32, data_size: u32) -> Vec<u8> {
        let mut header = MicrocodeHeader {
            header_ver: 1,
            update_rev: 0x29,
            date: MicrocodeDate(0x0612_2013),
            proc_sig: 0x206a7,
            checksum: 0,
            loader_rev: 1,
            proc_flags: 0x12,
            data_size,
            total_size,
        };
        let mut block = vec![0u8; total_size as usize];
        block[..MicrocodeHeader::SIZE].copy_from_slice(&header.to_bytes());
        header.checksum = 0u32.wrapping_sub(dword_checksum(&block));
        block[..MicrocodeHeader::SIZE].copy_from_slice(&header.to_bytes());
        block
    }

    fn render_microcode(image: &[u8], json: bool) -> (String, String) {
        let report = scan_microcode(image);
        let (mut out, mut diag) = (Vec::new(), Vec::new());
        report_microcode(&report, json, &mut out, &mut diag).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    fn render_hashes(image: &[u8], json: bool) -> (String, String) {
        let report = scan_hash_table(image);
        let (mut out, mut diag) = (Vec::new(), Vec::new());
        report_hash_table(&report, json, &mut out, &mut diag).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(diag).unwrap(),
        )
    }

    fn hash_image(count: u8) -> Vec<u8> {
        let mut image = vec![0xffu8; 0x40];
        image.extend_from_slice(b"TCPACPUH");
        image.extend_from_slice(&[0x20; 13]);
        image.extend_from_slice(b"IBMSECUR");
        for i in 0..count {
            let mut slot = [0u8; HashRecord::SIZE];
            slot[0] = i;
            slot[HashRecord::CPUID_OFFSET..HashRecord::CPUID_OFFSET + 4]
                .copy_from_slice(&(0x306a0 + i as u32).to_le_bytes());
            image.extend_from_slice(&slot);
        }
        image.extend_from_slice(&[0x00, 0x00, 0x27]);
        image.resize(image.len() + 36, 0);
        image
    }

    #[test]
    fn exit_codes() {
        assert_eq!(parse_exit_code(ClapErrorKind::MissingRequiredArgument), EXIT_USAGE);
        assert_eq!(parse_exit_code(ClapErrorKind::UnknownArgument), EXIT_USAGE);
        assert_eq!(parse_exit_code(ClapErrorKind::DisplayHelp), 0);
        assert_eq!(parse_exit_code(ClapErrorKind::DisplayVersion), 0);
    }

    #[test]
    fn missing_image_exits_with_source_unavailable() {
        let path = Path::new("/nonexistent/firmware/image.bin");
        assert_eq!(load_image(path).unwrap_err(), EXIT_SOURCE_UNAVAILABLE);
    }

    #[test]
    fn empty_image_exits_with_source_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(load_image(file.path()).unwrap_err(), EXIT_SOURCE_UNAVAILABLE);
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [EXIT_USAGE, EXIT_SOURCE_UNAVAILABLE, EXIT_OUTPUT_FAILED];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn closed_output_maps_to_output_failed() {
        let err = io::Error::from(io::ErrorKind::BrokenPipe);
        assert_eq!(output_failed(err), EXIT_OUTPUT_FAILED);
    }

    #[test]
    fn microcode_record_block() {
        let mut image = vec![0u8; 4096];
        image[256..320].copy_from_slice(&update(64, 16));

        let (out, diag) = render_microcode(&image, false);
        assert_eq!(
            out,
            "microcode at 0x00000100:\n\
             \x20 update revision:       41\n\
             \x20 date:                  06/12/2013\n\
             \x20 processor signature:   0x206a7\n\
             \x20 loader revision:       1\n\
             \x20 processor flags:       0x12\n\
             \x20 data size:             0x10 (16)\n\
             \x20 total size:            0x40 (64)\n"
        );
        assert_eq!(
            diag,
            "\n1 CPU microcodes found at file offset 0x00000100, overall length 0x40\n"
        );
    }

    #[test]
    fn microcode_not_found() {
        let (out, diag) = render_microcode(&[0u8; 4096], false);
        assert!(out.is_empty());
        assert_eq!(diag, "no CPU microcode found\n");
    }

    #[test]
    fn microcode_scattered() {
        let mut image = vec![0u8; 4096];
        image[0x100..0x140].copy_from_slice(&update(64, 16));
        image[0x200..0x240].copy_from_slice(&update(64, 16));

        let (out, diag) = render_microcode(&image, false);
        assert_eq!(out.matches("microcode at").count(), 2);
        assert_eq!(diag, "\n2 CPU microcodes found at various locations\n");
    }

    #[test]
    fn microcode_json_document() {
        let mut image = vec![0u8; 4096];
        image[0x100..0x140].copy_from_slice(&update(64, 16));

        let (out, _) = render_microcode(&image, true);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["layout"]["contiguous"]["offset"], 0x100);
        assert_eq!(value["layout"]["contiguous"]["length"], 64);
        assert_eq!(value["records"][0]["offset"], 0x100);
        assert_eq!(value["records"][0]["header"]["proc_sig"], 0x206a7);
        assert_eq!(value["records"][0]["header"]["date"], 0x0612_2013);
    }

    #[test]
    fn hash_lines_and_summary() {
        let (out, diag) = render_hashes(&hash_image(3), false);
        assert!(out.is_empty());
        assert_eq!(
            diag,
            "0. CPU microcode hash at offset 0000005d, cpuid 306a0\n\
             1. CPU microcode hash at offset 00000100, cpuid 306a1\n\
             2. CPU microcode hash at offset 000001a3, cpuid 306a2\n\
             3 CPU microcode hashes found at file offset 0x0000005d length 0x1e9\n"
        );
    }

    #[test]
    fn hash_marker_without_records() {
        let (_, diag) = render_hashes(&hash_image(0), false);
        assert_eq!(diag, "no CPU microcode hashes found\n");
    }

    #[test]
    fn hash_marker_missing() {
        let (_, diag) = render_hashes(&[0u8; 1024], false);
        assert_eq!(diag, "couldn't find marker TCPACPUH.*IBMSECUR\n");
    }

    #[test]
    fn hash_json_document() {
        let (out, diag) = render_hashes(&hash_image(2), true);
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["anchor"], 0x5d);
        assert_eq!(value["scanned_len"], 2 * 163);
        assert_eq!(value["records"][1]["cpuid"], 0x306a1);
        assert!(diag.ends_with("2 CPU microcode hashes found at file offset 0x0000005d length 0x146\n"));
    }
}
