//! External encoder collaborator.
//!
//! The engine only needs "turn this source file into that output file";
//! [`CommandEncoder`] does it by running `program [args..] <source> <dest>`.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::EncodeError;

/// Something that converts one source file into one output file.
///
/// Implementations must write only to `dest`; the engine owns the rename
/// onto the final path.
pub trait Encoder {
    /// Convert `source` into `dest`.
    ///
    /// # Errors
    ///
    /// Any [`EncodeError`]; `dest` may then hold partial output, which the
    /// engine deletes.
    fn encode(&self, source: &Path, dest: &Path) -> Result<(), EncodeError>;
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode(&self, source: &Path, dest: &Path) -> Result<(), EncodeError> {
        (**self).encode(source, dest)
    }
}

/// What happens to the encoder's stdout/stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Discard both streams.
    Quiet,
    /// Inherit the parent's stdout/stderr.
    PassThrough,
    /// Discard stdout, capture stderr and attach it to failures.
    #[default]
    CaptureOnFailure,
}

/// Encoder run as a subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEncoder {
    /// Program name or path.
    pub program: OsString,
    /// Arguments placed before the source and destination paths.
    pub args: Vec<OsString>,
    /// Stream handling.
    pub output: OutputMode,
}

impl CommandEncoder {
    /// Default Opus encoder program.
    pub const OPUSENC: &'static str = "opusenc";

    /// `program <source> <dest>` with captured stderr.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: OutputMode::default(),
        }
    }

    /// `opusenc <source> <dest>`.
    #[must_use]
    pub fn opusenc() -> Self {
        Self::new(Self::OPUSENC)
    }

    /// Set extra leading arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set stream handling.
    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Resolve the program on `PATH` (or as given, if it contains a
    /// separator).
    ///
    /// # Errors
    ///
    /// [`EncodeError::NotFound`] if no executable file is found.
    pub fn locate(&self) -> Result<PathBuf, EncodeError> {
        let program = Path::new(&self.program);
        let not_found = || EncodeError::NotFound {
            program: self.display_name(),
        };

        if program.components().count() > 1 {
            return program
                .is_file()
                .then(|| program.to_path_buf())
                .ok_or_else(not_found);
        }

        let path = env::var_os("PATH").ok_or_else(not_found)?;
        env::split_paths(&path)
            .flat_map(|dir| {
                let plain = dir.join(program);
                let mut exe = plain.clone().into_os_string();
                exe.push(env::consts::EXE_SUFFIX);
                [plain, PathBuf::from(exe)]
            })
            .find(|candidate| candidate.is_file())
            .ok_or_else(not_found)
    }

    fn display_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Encoder for CommandEncoder {
    fn encode(&self, source: &Path, dest: &Path) -> Result<(), EncodeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(source).arg(dest).stdin(Stdio::null());

        match self.output {
            OutputMode::Quiet => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
            OutputMode::PassThrough => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::CaptureOnFailure => {
                cmd.stdout(Stdio::null()).stderr(Stdio::piped());
            }
        }

        tracing::debug!(program = %self.display_name(), source = %source.display(), dest = %dest.display(), "running encoder");
        let output = cmd.output().map_err(|source| EncodeError::Spawn {
            program: self.display_name(),
            source,
        })?;

        if output.status.success() {
            return Ok(());
        }
        Err(EncodeError::Failed {
            program: self.display_name(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
