//! Mirrored library sync — keeps a transcoded copy of a FLAC tree current.
//!
//! # Modules
//!
//! - [`layout`] — source → output path mapping and temp naming
//! - [`scanner`] — directory walk and extension filtering
//! - [`encoder`] — external encoder subprocess
//! - [`sync`] — staleness check, encode-to-temp, rename
//! - [`prune`] — orphan, temp and empty-directory removal
//! - [`events`] — progress events and the observer they go to

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod encoder;
pub mod error;
pub mod events;
pub mod layout;
pub mod prune;
pub mod scanner;
pub mod sync;

// Top-level re-exports for convenience
pub use encoder::{CommandEncoder, Encoder, OutputMode};
pub use error::{EncodeError, FsOp, Result, SyncError};
pub use events::{FnObserver, SyncEvent, SyncObserver};
pub use layout::{temp_path, MirrorLayout};
pub use prune::{apply_prune, plan_prune, PrunePlan, PruneReport};
pub use scanner::Scanner;
pub use sync::{FileOutcome, Mirror, SyncOptions, SyncReport};
