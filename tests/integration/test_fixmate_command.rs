//! Integration tests for the fixmate command.

use std::fs::{self, File};
use std::process::{Command, Stdio};

use matefix_raw_bam::{RawRecord, RecordBuilder, flags};
use tempfile::TempDir;

use crate::helpers::{
    header_with_sort_order, name_grouped_header, read_bam, run_matefix, run_matefix_ok, write_bam,
};

const R1: u16 = flags::PAIRED | flags::FIRST_SEGMENT;
const R2: u16 = flags::PAIRED | flags::LAST_SEGMENT;

/// A pair on chr1 with stale mate fields: forward at 100, reverse at 300.
fn stale_fr_pair(name: &str) -> Vec<RawRecord> {
    vec![
        RecordBuilder::new(name)
            .mapped(0, 100, "50M")
            .mapq(60)
            .flags(R1 | flags::PROPER_PAIR)
            .quals(&[30; 50])
            .mate(1, 7)
            .tlen(9)
            .build(),
        RecordBuilder::new(name)
            .mapped(0, 300, "50M")
            .mapq(20)
            .flags(R2 | flags::PROPER_PAIR | flags::REVERSE)
            .quals(&[10; 50])
            .build(),
    ]
}

fn program_ids(header: &noodles::sam::Header) -> Vec<String> {
    header.programs().as_ref().keys().map(|id| id.to_string()).collect()
}

#[test]
fn test_fixmate_fills_in_mate_information() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &name_grouped_header(), &stale_fr_pair("q1"));

    run_matefix_ok(&["fixmate", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);

    let (header, records) = read_bam(&output);
    assert_eq!(records.len(), 2);
    let (r1, r2) = (&records[0], &records[1]);

    assert_eq!((r1.mate_ref_id(), r1.mate_pos(), r1.template_length()), (0, 300, 250));
    assert_eq!((r2.mate_ref_id(), r2.mate_pos(), r2.template_length()), (0, 100, -250));
    assert!(r1.has_any_flag(flags::MATE_REVERSE));
    assert!(!r2.has_any_flag(flags::MATE_REVERSE));
    assert!(r1.has_any_flag(flags::PROPER_PAIR) && r2.has_any_flag(flags::PROPER_PAIR));
    assert_eq!(r1.int_tag(b"MQ"), Some(20));
    assert_eq!(r2.int_tag(b"MQ"), Some(60));
    assert_eq!(r1.string_tag(b"MC"), Some(&b"50M"[..]));
    assert!(!r1.has_tag(b"ct") && !r1.has_tag(b"ms"));

    assert_eq!(program_ids(&header), vec!["matefix".to_string()]);
    assert_eq!(header.reference_sequences().len(), 2);
}

#[test]
fn test_fixmate_optional_tags() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &name_grouped_header(), &stale_fr_pair("q1"));

    run_matefix_ok(&[
        "fixmate",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "-c",
        "-m",
        "--no-pg",
    ]);

    let (header, records) = read_bam(&output);
    assert_eq!(records[0].string_tag(b"ct"), Some(&b"1F50M150T2R50M"[..]));
    assert!(!records[1].has_tag(b"ct"));
    assert_eq!(records[0].int_tag(b"ms"), Some(0));
    assert_eq!(records[1].int_tag(b"ms"), Some(1500));
    assert!(program_ids(&header).is_empty());
}

#[test]
fn test_fixmate_clears_proper_pair_unless_check_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let mut records = stale_fr_pair("ff");
    records[1].clear_flag_bits(flags::REVERSE);
    write_bam(&input, &name_grouped_header(), &records);

    let checked = temp_dir.path().join("checked.bam");
    run_matefix_ok(&["fixmate", "-i", input.to_str().unwrap(), "-o", checked.to_str().unwrap()]);
    let (_, out) = read_bam(&checked);
    assert!(out.iter().all(|r| !r.has_any_flag(flags::PROPER_PAIR)));

    let unchecked = temp_dir.path().join("unchecked.bam");
    run_matefix_ok(&[
        "fixmate",
        "-p",
        "-i",
        input.to_str().unwrap(),
        "-o",
        unchecked.to_str().unwrap(),
    ]);
    let (_, out) = read_bam(&unchecked);
    assert!(out.iter().all(|r| r.has_any_flag(flags::PROPER_PAIR)));
}

#[test]
fn test_fixmate_places_unmapped_mate_and_removes_it_with_r() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let records = vec![
        RecordBuilder::new("half").mapped(0, 100, "50M").mapq(60).flags(R1).build(),
        RecordBuilder::new("half").flags(R2 | flags::UNMAPPED).build(),
        RecordBuilder::new("half")
            .mapped(1, 40, "50M")
            .flags(R1 | flags::SECONDARY)
            .build(),
    ];
    write_bam(&input, &name_grouped_header(), &records);

    let kept = temp_dir.path().join("kept.bam");
    run_matefix_ok(&["fixmate", "-i", input.to_str().unwrap(), "-o", kept.to_str().unwrap()]);
    let (_, out) = read_bam(&kept);
    assert_eq!(out.len(), 3);
    assert_eq!((out[1].ref_id(), out[1].pos()), (0, 100));
    assert!(out[0].has_any_flag(flags::MATE_UNMAPPED));
    assert!(out[0].has_any_flag(flags::PAIRED));
    assert_eq!(out[0].template_length(), 0);
    assert_eq!(out[1].bin(), out[0].bin());

    let removed = temp_dir.path().join("removed.bam");
    run_matefix_ok(&[
        "fixmate",
        "-r",
        "-i",
        input.to_str().unwrap(),
        "-o",
        removed.to_str().unwrap(),
    ]);
    let (_, out) = read_bam(&removed);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name(), b"half");
    assert!(!out[0].has_any_flag(flags::PAIRED | flags::PROPER_PAIR | flags::MATE_REVERSE));
}

#[test]
fn test_fixmate_writes_uncompressed_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let compressed = temp_dir.path().join("compressed.bam");
    let uncompressed = temp_dir.path().join("uncompressed.bam");
    let records: Vec<RawRecord> = (0..50).flat_map(|i| stale_fr_pair(&format!("q{i}"))).collect();
    write_bam(&input, &name_grouped_header(), &records);

    run_matefix_ok(&["fixmate", "-i", input.to_str().unwrap(), "-o", compressed.to_str().unwrap()]);
    run_matefix_ok(&["fixmate", "-u", "-i", input.to_str().unwrap(), "-o", uncompressed.to_str().unwrap()]);

    let (_, expected) = read_bam(&compressed);
    let (_, actual) = read_bam(&uncompressed);
    assert_eq!(actual.len(), 100);
    assert_eq!(actual, expected);

    let stored = fs::read(&uncompressed).unwrap();
    assert!(stored.len() > fs::metadata(&compressed).unwrap().len() as usize);
    assert!(stored.windows(actual[0].len()).any(|w| w == actual[0].as_bytes()));
}

#[test]
fn test_fixmate_rejects_out_of_range_compression_level() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &name_grouped_header(), &stale_fr_pair("q1"));

    let result = run_matefix(&[
        "fixmate",
        "--compression-level",
        "42",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("Invalid compression level 42"));
}

#[test]
fn test_fixmate_refuses_coordinate_sorted_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &header_with_sort_order("coordinate"), &stale_fr_pair("q1"));

    let result = run_matefix(&["fixmate", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("Coordinate-sorted"), "unexpected stderr: {stderr}");
}

#[test]
fn test_fixmate_rejects_unknown_sanitize_keyword() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &name_grouped_header(), &stale_fr_pair("q1"));

    let result = run_matefix(&[
        "fixmate",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "-z",
        "cigar,bogus",
    ]);

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("bogus"));
    assert!(!output.exists());
}

#[test]
fn test_fixmate_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output.bam");

    let result = run_matefix(&["fixmate", "-i", "does/not/exist.bam", "-o", output.to_str().unwrap()]);

    assert!(!result.status.success());
}

#[test]
fn test_fixmate_streams_stdin_to_stdout() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let mut records = stale_fr_pair("a");
    records.extend(stale_fr_pair("b"));
    write_bam(&input, &name_grouped_header(), &records);

    let status = Command::new(env!("CARGO_BIN_EXE_matefix"))
        .args(["fixmate", "-i", "-", "-o", "-", "-t", "2"])
        .stdin(Stdio::from(File::open(&input).unwrap()))
        .stdout(Stdio::from(File::create(&output).unwrap()))
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success());

    let (_, out) = read_bam(&output);
    let names: Vec<&[u8]> = out.iter().map(RawRecord::name).collect();
    assert_eq!(names, vec![&b"a"[..], &b"a"[..], &b"b"[..], &b"b"[..]]);
    assert!(out.iter().all(|r| r.template_length().abs() == 250));
}
