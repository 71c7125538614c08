//! Error type shared by every module of this crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for tag operations.
pub type Result<T> = std::result::Result<T, TagError>;

/// Failure while decoding, encoding or rewriting FLAC metadata.
///
/// `TruncatedInput` and `InvalidText` abort processing of the file they came
/// from; nothing is written back. `UnsupportedImage` only disables the cover
/// step for that file.
#[derive(Error, Debug)]
pub enum TagError {
    /// A declared length runs past the end of the payload.
    #[error("truncated input: {what} needs {needed} bytes, {remaining} remain")]
    TruncatedInput {
        /// Field being read when the payload ran out.
        what: &'static str,
        /// Bytes the field declared.
        needed: usize,
        /// Bytes actually left in the payload.
        remaining: usize,
    },

    /// A string or binary field is longer than its 32-bit length prefix allows.
    #[error("{field} is {len} bytes, exceeds the u32 length prefix")]
    LengthOverflow {
        /// Field being encoded.
        field: &'static str,
        /// Actual length.
        len: usize,
    },

    /// A text field is not valid UTF-8.
    #[error("{field} is not valid UTF-8")]
    InvalidText {
        /// Field being decoded.
        field: &'static str,
    },

    /// The cover image could not be introspected for its dimensions.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// The stream does not start with the `fLaC` marker.
    #[error("not a FLAC stream")]
    NotFlac,

    /// A metadata block payload does not fit the 24-bit container length.
    #[error("metadata block of {len} bytes exceeds the 24-bit block length")]
    BlockTooLarge {
        /// Payload length.
        len: usize,
    },

    /// I/O failure reading or writing a file.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl TagError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that only affect the cover step.
    #[must_use]
    pub fn is_cover_only(&self) -> bool {
        matches!(self, Self::UnsupportedImage(_))
    }
}
