//! Common error types for the timeline crates

use thiserror::Error;

/// Common result type for timeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the timeline crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Memo or image payload could not be decoded or encoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the legacy array grammar and the memo/image schemas.
///
/// Decode-side variants describe stored data; encode-side variants
/// (`EmptyImagePayload`, `EmptyImageRecord`, `Unbatchable`) are caller bugs
/// rejected before any bytes are produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Truncated or structurally invalid grammar bytes
    #[error("malformed payload at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    /// Well-formed grammar whose structure does not fit the expected schema
    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),

    /// No schema is registered for this (category, subtype)
    #[error("unsupported discriminant (cat: {category}, type: {subtype})")]
    UnsupportedDiscriminant { category: u8, subtype: u16 },

    /// Grammar decode succeeded but the variant lacks fields its producer always wrote
    #[error("incomplete {variant} memo, missing: {}", .missing.join(", "))]
    IncompleteVariant {
        variant: &'static str,
        missing: Vec<&'static str>,
    },

    /// Image payload decoded neither as a single record nor as a sequence
    #[error("image payload is neither a record ({single}) nor a record sequence ({sequence})")]
    Ambiguous {
        single: Box<CodecError>,
        sequence: Box<CodecError>,
    },

    /// An image payload must carry at least one record
    #[error("image payload has no records")]
    EmptyImagePayload,

    /// An image record with no populated field would be written
    #[error("image record has no populated fields")]
    EmptyImageRecord,

    /// This memo kind cannot be folded into a keyed batch
    #[error("memo (cat: {category}, type: {subtype}) cannot be batched")]
    Unbatchable { category: u8, subtype: u16 },
}

impl CodecError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        CodecError::Malformed {
            offset,
            reason: reason.into(),
        }
    }
}
