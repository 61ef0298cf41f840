//! Tests for length-indicated text files
//!
//! These tests verify:
//! - One encoded record per line
//! - Byte offsets reported by the reader
//! - Comma-separated to length-indicated conversion

use std::fs;

use seqset::record::{
    convert_lines, LengthIndicatedReader, LengthIndicatedWriter, LocatedRecord, NumericPolicy,
};
use seqset::SeqSetError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn read_all(path: &std::path::Path) -> Vec<LocatedRecord> {
    LengthIndicatedReader::open(path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_writer_produces_encoded_lines() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.li");

    let mut writer = LengthIndicatedWriter::create(&path, NumericPolicy::Strict).unwrap();
    writer.write_record(&["71050", "San Juan", "PR"]).unwrap();
    writer.write_record(&["00601", "Adjuntas", "PR"]).unwrap();
    assert_eq!(writer.finish().unwrap(), 2);

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "0571050,08San Juan,02PR\n0500601,08Adjuntas,02PR\n");
}

#[test]
fn test_reader_reports_line_offsets() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("in.li");
    fs::write(&path, "02ab,01c\n\n03xyz\n").unwrap();

    let records = read_all(&path);

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].offset, 0);
    assert_eq!(records[0].fields, vec!["ab", "c"]);
    // 9 bytes for the first line plus one blank line
    assert_eq!(records[1].offset, 10);
    assert_eq!(records[1].fields, vec!["xyz"]);
}

#[test]
fn test_reader_handles_crlf() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("crlf.li");
    fs::write(&path, "02ab\r\n02cd\r\n").unwrap();

    let records = read_all(&path);
    assert_eq!(records[1].offset, 6);
    assert_eq!(records[1].fields, vec!["cd"]);
}

#[test]
fn test_reader_surfaces_format_errors() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.li");
    fs::write(&path, "02ab\nzz\n").unwrap();

    let mut reader = LengthIndicatedReader::open(&path).unwrap();
    assert!(reader.next().unwrap().is_ok());
    assert!(matches!(reader.next(), Some(Err(SeqSetError::Format(_)))));
    assert!(reader.next().is_none());
}

// =============================================================================
// Conversion Tests
// =============================================================================

#[test]
fn test_convert_skips_header_and_blank_lines() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("zips.csv");
    let output = temp_dir.path().join("zips.li");
    fs::write(
        &input,
        "zip,place,state,lat,long\n71050,San Juan,PR,18.138,-65.971\n\n00601,Adjuntas,PR,18.2,-66.7\n",
    )
    .unwrap();

    let count = convert_lines(&input, &output, true, NumericPolicy::Strict).unwrap();
    assert_eq!(count, 2);

    let records = read_all(&output);
    assert_eq!(
        records[0].fields,
        vec!["71050", "San Juan", "PR", "18.138000", "-65.971000"]
    );
    assert_eq!(records[1].fields[0], "00601");
}

#[test]
fn test_convert_without_header() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("plain.csv");
    let output = temp_dir.path().join("plain.li");
    fs::write(&input, "a,b\nc,d\n").unwrap();

    assert_eq!(convert_lines(&input, &output, false, NumericPolicy::Strict).unwrap(), 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "01a,01b\n01c,01d\n");
}

#[test]
fn test_convert_strict_fails_on_bad_number() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("bad.csv");
    let output = temp_dir.path().join("bad.li");
    fs::write(&input, "1.x,ok\n").unwrap();

    let result = convert_lines(&input, &output, false, NumericPolicy::Strict);
    assert!(matches!(result, Err(SeqSetError::Format(_))));
    assert!(!output.exists());
}

#[test]
fn test_convert_lenient_substitutes_zero() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("bad.csv");
    let output = temp_dir.path().join("bad.li");
    fs::write(&input, "1.x,ok\n").unwrap();

    convert_lines(&input, &output, false, NumericPolicy::ZeroWithWarning).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), "080.000000,02ok\n");
}
