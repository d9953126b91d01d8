//! Integration tests for the sanitize command.

use matefix_raw_bam::{RawRecord, RecordBuilder, flags, format_cigar, reg2bin};
use tempfile::TempDir;

use crate::helpers::{CHR2_LEN, header_with_sort_order, read_bam, run_matefix_ok, write_bam};

fn overhanging_and_unmapped() -> Vec<RawRecord> {
    let chr2_len = i32::try_from(CHR2_LEN).unwrap();
    vec![
        RecordBuilder::new("overhang").mapped(1, chr2_len - 20, "50M").mapq(40).build(),
        RecordBuilder::new("unmapped")
            .mapped(0, 100, "50M")
            .mapq(30)
            .flags(flags::UNMAPPED)
            .int_tag(b"NM", 2)
            .build(),
    ]
}

#[test]
fn test_sanitize_accepts_coordinate_sorted_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &header_with_sort_order("coordinate"), &overhanging_and_unmapped());

    run_matefix_ok(&["sanitize", "-i", input.to_str().unwrap(), "-o", output.to_str().unwrap()]);

    let (header, out) = read_bam(&output);
    assert_eq!(out.len(), 2);
    assert_eq!(format_cigar(&out[0].cigar_ops()), "20M30S");
    assert_eq!(out[0].mapq(), 40);

    assert_eq!(out[1].mapq(), 0);
    assert_eq!(out[1].n_cigar_op(), 0);
    assert!(!out[1].has_tag(b"NM"));
    assert_eq!(out[1].bin(), reg2bin(100, 101));

    assert!(header.programs().as_ref().contains_key(b"matefix".as_slice()));
}

#[test]
fn test_sanitize_applies_only_requested_fixes() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    write_bam(&input, &header_with_sort_order("unsorted"), &overhanging_and_unmapped());

    run_matefix_ok(&[
        "sanitize",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--fix",
        "cigar",
    ]);

    let (_, out) = read_bam(&output);
    assert_eq!(format_cigar(&out[0].cigar_ops()), "20M30S");
    assert_eq!(out[1].mapq(), 30);
    assert_eq!(out[1].n_cigar_op(), 0);
    assert_eq!(out[1].int_tag(b"NM"), Some(2));
}

#[test]
fn test_sanitize_none_passes_records_through() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let output = temp_dir.path().join("output.bam");
    let records = overhanging_and_unmapped();
    write_bam(&input, &header_with_sort_order("unsorted"), &records);

    run_matefix_ok(&[
        "sanitize",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--fix",
        "none",
        "--no-pg",
    ]);

    let (header, out) = read_bam(&output);
    assert_eq!(format_cigar(&out[0].cigar_ops()), "50M");
    assert_eq!(out[1].mapq(), 30);
    assert_eq!(out[1].int_tag(b"NM"), Some(2));
    assert!(header.programs().as_ref().is_empty());
}
