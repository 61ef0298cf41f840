//! Length-indicated text files
//!
//! One encoded record per line. The reader reports the byte offset of every
//! line so an index can point straight at it.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::Result;
use crate::staged::StagedFile;

use super::field::{decode_record, encode_record_with, NumericPolicy};
use super::FIELD_SEPARATOR;

/// A decoded record together with where its line starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedRecord {
    /// Byte offset of the line start
    pub offset: u64,
    pub fields: Vec<String>,
}

/// Writes encoded records, one per line
pub struct LengthIndicatedWriter {
    file: StagedFile,
    policy: NumericPolicy,
    record_count: u64,
}

impl LengthIndicatedWriter {
    pub fn create(path: &Path, policy: NumericPolicy) -> Result<Self> {
        Ok(Self {
            file: StagedFile::create(path)?,
            policy,
            record_count: 0,
        })
    }

    pub fn write_record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let line = encode_record_with(fields, self.policy)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.record_count += 1;
        Ok(())
    }

    /// Commit the file; returns the number of records written
    pub fn finish(self) -> Result<u64> {
        self.file.commit()?;
        Ok(self.record_count)
    }
}

/// Reads encoded records line by line
pub struct LengthIndicatedReader {
    reader: BufReader<File>,
    offset: u64,
    line: String,
    done: bool,
}

impl LengthIndicatedReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            offset: 0,
            line: String::new(),
            done: false,
        })
    }

    /// Decode the next non-empty line
    pub fn next_record(&mut self) -> Result<Option<LocatedRecord>> {
        loop {
            self.line.clear();
            let start = self.offset;
            let read = self.reader.read_line(&mut self.line)?;
            if read == 0 {
                return Ok(None);
            }
            self.offset += read as u64;

            let content = self.line.trim_end_matches(['\n', '\r']);
            if content.is_empty() {
                continue;
            }

            return Ok(Some(LocatedRecord {
                offset: start,
                fields: decode_record(content)?,
            }));
        }
    }
}

impl Iterator for LengthIndicatedReader {
    type Item = Result<LocatedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Convert a comma-separated text file into a length-indicated file.
///
/// Fields are split naively on the separator (no quoting rules). Blank lines
/// are skipped with a warning. Returns the number of records written.
pub fn convert_lines(
    input: &Path,
    output: &Path,
    skip_header: bool,
    policy: NumericPolicy,
) -> Result<u64> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = LengthIndicatedWriter::create(output, policy)?;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if skip_header && line_no == 0 {
            continue;
        }
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            tracing::warn!(line = line_no + 1, "skipping blank input line");
            continue;
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        writer.write_record(&fields)?;
    }

    let count = writer.finish()?;
    tracing::info!(records = count, output = %output.display(), "converted to length-indicated format");
    Ok(count)
}
