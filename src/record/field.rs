//! Length-indicated field codec
//!
//! A field token is a two-digit decimal byte length followed by the value:
//! `"05San J"`-style tokens, comma-joined per record.

use std::fmt::Write as _;

use crate::error::{Result, SeqSetError};

use super::{DECIMAL_PRECISION, FIELD_SEPARATOR, MAX_FIELD_LEN};

/// How to treat decimal-looking text that does not parse as a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Fail the encode with a format error
    #[default]
    Strict,

    /// Substitute zero (rendered with fixed precision) and warn
    ZeroWithWarning,
}

/// A field value after quote stripping, numeric normalization and truncation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedField {
    pub value: String,
    /// The value was cut down to `MAX_FIELD_LEN` bytes
    pub truncated: bool,
    /// Malformed numeric text was replaced by zero
    pub substituted: bool,
}

/// Normalize a raw field value for encoding.
///
/// Order: strip enclosing quotes, re-render decimal-looking values with six
/// fractional digits, then truncate to `MAX_FIELD_LEN` bytes on a character
/// boundary. Truncating last keeps the length indicator valid even when the
/// numeric rendering grows the text.
pub fn normalize_field(raw: &str, policy: NumericPolicy) -> Result<NormalizedField> {
    let unquoted = strip_quotes(raw);
    let mut substituted = false;

    let mut value = if looks_decimal(unquoted) {
        match unquoted.parse::<f64>() {
            Ok(n) => format!("{:.*}", DECIMAL_PRECISION, n),
            Err(_) => match policy {
                NumericPolicy::Strict => {
                    return Err(SeqSetError::Format(format!(
                        "malformed numeric field: {:?}",
                        unquoted
                    )));
                }
                NumericPolicy::ZeroWithWarning => {
                    tracing::warn!(field = %unquoted, "malformed numeric field, substituting zero");
                    substituted = true;
                    format!("{:.*}", DECIMAL_PRECISION, 0.0)
                }
            },
        }
    } else {
        unquoted.to_string()
    };

    let truncated = value.len() > MAX_FIELD_LEN;
    if truncated {
        tracing::warn!(
            len = value.len(),
            max = MAX_FIELD_LEN,
            "field exceeds two-digit length limit, truncating"
        );
        let mut cut = MAX_FIELD_LEN;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
    }

    Ok(NormalizedField {
        value,
        truncated,
        substituted,
    })
}

/// Encode one field with the default (strict) numeric policy
pub fn encode_field(raw: &str) -> Result<String> {
    encode_field_with(raw, NumericPolicy::Strict)
}

/// Encode one field: `<2-digit length><normalized value>`
pub fn encode_field_with(raw: &str, policy: NumericPolicy) -> Result<String> {
    let normalized = normalize_field(raw, policy)?;
    let mut token = String::with_capacity(2 + normalized.value.len());
    push_token(&mut token, &normalized.value);
    Ok(token)
}

/// Encode a value verbatim (no quote stripping, no numeric rendering).
///
/// Used for metadata where silently changing the text is not acceptable,
/// so an over-long value is an error instead of being truncated.
pub fn encode_raw_field(value: &str) -> Result<String> {
    if value.len() > MAX_FIELD_LEN {
        return Err(SeqSetError::Format(format!(
            "value of {} bytes does not fit a two-digit length indicator: {:?}",
            value.len(),
            value
        )));
    }
    let mut token = String::with_capacity(2 + value.len());
    push_token(&mut token, value);
    Ok(token)
}

/// Encode a record with the default (strict) numeric policy
pub fn encode_record<S: AsRef<str>>(fields: &[S]) -> Result<String> {
    encode_record_with(fields, NumericPolicy::Strict)
}

/// Encode every field and join them with the field separator
pub fn encode_record_with<S: AsRef<str>>(fields: &[S], policy: NumericPolicy) -> Result<String> {
    let mut line = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            line.push(FIELD_SEPARATOR);
        }
        let normalized = normalize_field(field.as_ref(), policy)?;
        push_token(&mut line, &normalized.value);
    }
    Ok(line)
}

/// Decode the next field at the cursor
pub fn decode_field(cursor: &mut FieldCursor<'_>) -> Result<String> {
    cursor.next_field().map(str::to_string)
}

/// Decode every field of one encoded line
pub fn decode_record(line: &str) -> Result<Vec<String>> {
    let mut cursor = FieldCursor::new(line);
    let mut fields = Vec::new();
    while !cursor.is_exhausted() {
        fields.push(decode_field(&mut cursor)?);
    }
    Ok(fields)
}

/// Read position inside one encoded line
#[derive(Debug, Clone)]
pub struct FieldCursor<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, pos: 0 }
    }

    /// Byte position of the next length indicator
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.line.len()
    }

    /// Read `<2 digits><value>` and consume a trailing separator if present
    pub fn next_field(&mut self) -> Result<&'a str> {
        let bytes = self.line.as_bytes();
        let rest = &bytes[self.pos.min(bytes.len())..];

        if rest.len() < 2 {
            return Err(SeqSetError::Format(format!(
                "truncated length indicator at byte {}",
                self.pos
            )));
        }

        let (hi, lo) = (rest[0], rest[1]);
        if !hi.is_ascii_digit() || !lo.is_ascii_digit() {
            return Err(SeqSetError::Format(format!(
                "invalid length indicator {:?} at byte {}",
                String::from_utf8_lossy(&rest[..2]),
                self.pos
            )));
        }

        let len = usize::from(hi - b'0') * 10 + usize::from(lo - b'0');
        let start = self.pos + 2;
        let end = start + len;

        if end > bytes.len() {
            return Err(SeqSetError::Format(format!(
                "field at byte {} declares {} bytes but only {} remain",
                self.pos,
                len,
                bytes.len() - start
            )));
        }

        let value = self.line.get(start..end).ok_or_else(|| {
            SeqSetError::Format(format!(
                "field at byte {} ends inside a multi-byte character",
                self.pos
            ))
        })?;

        self.pos = end;
        if bytes.get(self.pos) == Some(&(FIELD_SEPARATOR as u8)) {
            self.pos += 1;
        }

        Ok(value)
    }
}

// =============================================================================
// Private Helpers
// =============================================================================

fn push_token(out: &mut String, value: &str) {
    // Writing to a String cannot fail
    let _ = write!(out, "{:02}{}", value.len(), value);
}

fn strip_quotes(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Contains a decimal point and starts with a digit or a minus sign
fn looks_decimal(value: &str) -> bool {
    value.contains('.')
        && value
            .as_bytes()
            .first()
            .is_some_and(|&b| b.is_ascii_digit() || b == b'-')
}
