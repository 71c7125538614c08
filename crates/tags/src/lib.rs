//! FLAC metadata fixing — Vorbis comment/picture codecs, multi-value tag
//! merge and cover embedding.
//!
//! # Modules
//!
//! - [`comment`] — `VORBIS_COMMENT` payload codec
//! - [`picture`] — `PICTURE` payload codec
//! - [`block`] — tagged metadata block exchanged with the container
//! - [`container`] — FLAC stream framing (block list + audio frames)
//! - [`merge`] — multi-value tag merge
//! - [`cover`] — external cover resolution and JPEG header parsing
//! - [`fixer`] — per-file driver combining merge and cover
//! - [`diagnostics`] — structured events and the sink they go to

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod bytes;
pub mod block;
pub mod comment;
pub mod container;
pub mod cover;
pub mod diagnostics;
pub mod error;
pub mod fixer;
pub mod merge;
pub mod picture;

// Top-level re-exports for convenience
pub use block::MetadataBlock;
pub use comment::CommentBlock;
pub use container::FlacFile;
pub use cover::{embed_cover, jpeg_dimensions, CoverOutcome};
pub use diagnostics::{Diagnostic, DiagnosticSink, FnSink, Level};
pub use error::{Result, TagError};
pub use fixer::{fix_blocks, fix_file, FixOptions, FixReport};
pub use merge::{merge_tags, MergeOutcome, MergeTargets};
pub use picture::PictureBlock;
