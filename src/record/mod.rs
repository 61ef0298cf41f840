//! Record Codec Module
//!
//! Encodes records either as comma-joined length-indicated fields (text) or
//! as a single length-prefixed opaque payload (binary).
//!
//! ## Text Format
//! ```text
//! ┌────────┬───────────┬───┬────────┬───────────┬───┬ ...
//! │ Len(2) │ Value     │ , │ Len(2) │ Value     │ , │
//! └────────┴───────────┴───┴────────┴───────────┴───┴ ...
//! ```
//! `Len` is a two-digit decimal byte count (00-99). Decimal-looking values
//! are rendered with six fractional digits before encoding.
//!
//! ## Binary Format
//! ```text
//! ┌──────────────────────┬─────────────┐
//! │ Length: u64 (native) │   Payload   │
//! └──────────────────────┴─────────────┘
//! ```

mod field;
mod file;
mod opaque;

pub use field::{
    decode_field, decode_record, encode_field, encode_field_with, encode_raw_field,
    encode_record, encode_record_with, normalize_field, FieldCursor, NormalizedField,
    NumericPolicy,
};
pub use file::{convert_lines, LengthIndicatedReader, LengthIndicatedWriter, LocatedRecord};
pub use opaque::{
    decode_opaque_record, encode_opaque_record, OpaqueReader, OpaqueWriter,
    LENGTH_PREFIX_SIZE, MAX_OPAQUE_RECORD_SIZE,
};

/// Longest value a two-digit length indicator can describe
pub const MAX_FIELD_LEN: usize = 99;

/// Separator between fields (and between records inside a block line)
pub const FIELD_SEPARATOR: char = ',';

/// Fractional digits used when re-rendering decimal values
pub const DECIMAL_PRECISION: usize = 6;
