//! Writing input BAMs, reading outputs back and running the binary.

use std::path::Path;
use std::process::{Command, Output};

use matefix_lib::bam_io::{DEFAULT_COMPRESSION_LEVEL, create_raw_bam_reader, create_raw_bam_writer};
use matefix_lib::stream::RecordSink;
use matefix_raw_bam::RawRecord;
use noodles::sam::Header;

/// Length of `chr1` in [`name_grouped_header`].
pub const CHR1_LEN: usize = 10_000;

/// Length of `chr2` in [`name_grouped_header`].
pub const CHR2_LEN: usize = 500;

/// Two references, with the given `SO` on the `@HD` line.
pub fn header_with_sort_order(sort_order: &str) -> Header {
    format!(
        "@HD\tVN:1.6\tSO:{sort_order}\n@SQ\tSN:chr1\tLN:{CHR1_LEN}\n@SQ\tSN:chr2\tLN:{CHR2_LEN}\n"
    )
    .parse()
    .expect("valid header text")
}

/// Two references, `SO:queryname`.
pub fn name_grouped_header() -> Header {
    header_with_sort_order("queryname")
}

/// Write `records` to a BAM at `path`.
pub fn write_bam(path: &Path, header: &Header, records: &[RawRecord]) {
    let mut writer = create_raw_bam_writer(path, header, 1, DEFAULT_COMPRESSION_LEVEL).expect("Failed to create BAM");
    for record in records {
        writer.write_record(record).expect("Failed to write record");
    }
    writer.finish().expect("Failed to finish BAM");
}

/// Read a BAM back as its header and raw records.
pub fn read_bam(path: &Path) -> (Header, Vec<RawRecord>) {
    let (mut reader, header) = create_raw_bam_reader(path, 1).expect("Failed to open BAM");
    let mut records = Vec::new();
    let mut slot = RawRecord::new();
    while reader.read_record(&mut slot).expect("Failed to read record") {
        records.push(slot.clone());
    }
    (header, records)
}

/// Run the binary with `args`, returning its exit status and output.
pub fn run_matefix(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_matefix"))
        .args(args)
        .output()
        .expect("Failed to run matefix")
}

/// Run the binary and panic with its stderr unless it succeeds.
pub fn run_matefix_ok(args: &[&str]) {
    let output = run_matefix(args);
    assert!(
        output.status.success(),
        "matefix {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}
