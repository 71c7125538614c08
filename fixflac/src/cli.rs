//! Command line surface and its validation into a [`Mode`].

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use library::{CommandEncoder, OutputMode};
use tags::cover::DEFAULT_COVER_NAME;
use tags::{FixOptions, MergeTargets};

#[derive(Parser, Debug)]
#[command(name = "fixflac")]
#[command(about = "Fix FLAC tags for media servers and mirror a library to Opus", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Write changes to disk (default is a dry run)
    #[arg(short = 'w')]
    pub write: bool,

    /// Verbose output; repeat for trace level
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Merge repeated MusicBrainz ID tags into one entry
    #[arg(long = "mb-ids")]
    pub mb_ids: bool,

    /// Embed the folder cover if the file has no picture
    #[arg(long)]
    pub embed_cover: bool,

    /// File name of the external cover next to each track
    #[arg(long, value_name = "NAME", default_value = DEFAULT_COVER_NAME)]
    pub cover_name: String,

    /// Comma-separated tags to merge (replaces the MusicBrainz defaults)
    #[arg(long, value_name = "TAGS")]
    pub merge_tags: Option<String>,

    /// Mirror the library as Opus files into DIR
    #[arg(long, value_name = "DIR", conflicts_with_all = ["mb_ids", "embed_cover"])]
    pub convert_opus: Option<PathBuf>,

    /// Keep orphaned files in the Opus mirror
    #[arg(long)]
    pub no_prune: bool,

    /// Encoder program, run as `PROG <source> <dest>`
    #[arg(long, value_name = "PROG", env = "FIXFLAC_ENCODER", default_value = CommandEncoder::OPUSENC)]
    pub encoder: String,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// FLAC file or library directory
    pub path: PathBuf,
}

/// What a run does, after validation.
#[derive(Debug)]
pub enum Mode {
    /// Rewrite tags in place.
    Fix(FixOptions),
    /// Mirror into an output tree.
    Convert {
        /// Output root.
        output: PathBuf,
        /// Prune after converting a tree.
        prune: bool,
        /// Encoder invocation.
        encoder: CommandEncoder,
    },
}

impl Cli {
    /// Validate the flag combination.
    ///
    /// Mutual exclusions with `--convert-opus` are enforced by clap; this
    /// rejects `--no-prune` on its own, runs that would do nothing and empty
    /// tag lists.
    pub fn mode(&self) -> Result<Mode> {
        if self.no_prune && self.convert_opus.is_none() {
            bail!("--no-prune is only valid with --convert-opus");
        }

        if let Some(output) = &self.convert_opus {
            let output_mode = if self.verbose > 0 {
                OutputMode::PassThrough
            } else {
                OutputMode::CaptureOnFailure
            };
            return Ok(Mode::Convert {
                output: output.clone(),
                prune: !self.no_prune,
                encoder: CommandEncoder::new(&self.encoder).with_output(output_mode),
            });
        }

        if !self.mb_ids && !self.embed_cover {
            bail!("nothing to do: pass --mb-ids, --embed-cover or --convert-opus");
        }

        let merge = match &self.merge_tags {
            Some(list) => {
                let targets = MergeTargets::parse(list);
                if targets.is_empty() {
                    bail!("--merge-tags needs at least one tag name");
                }
                targets
            }
            None => MergeTargets::default(),
        };

        Ok(Mode::Fix(FixOptions {
            write: self.write,
            merge: self.mb_ids.then_some(merge),
            cover: self.embed_cover.then(|| self.cover_name.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fixflac").chain(args.iter().copied()))
    }

    #[test]
    fn fix_mode_defaults() {
        let cli = parse(&["--mb-ids", "music"]).unwrap();
        let Mode::Fix(opts) = cli.mode().unwrap() else {
            panic!("expected fix mode");
        };
        assert!(!opts.write);
        assert_eq!(opts.merge, Some(MergeTargets::default()));
        assert_eq!(opts.cover, None);
    }

    #[test]
    fn custom_merge_tags_and_cover_name() {
        let cli = parse(&[
            "-w",
            "--mb-ids",
            "--embed-cover",
            "--cover-name",
            "folder.jpg",
            "--merge-tags",
            "ARTISTS, GENRE",
            "x.flac",
        ])
        .unwrap();
        let Mode::Fix(opts) = cli.mode().unwrap() else {
            panic!("expected fix mode");
        };
        assert!(opts.write);
        assert_eq!(opts.merge.unwrap().keys(), ["ARTISTS", "GENRE"]);
        assert_eq!(opts.cover.as_deref(), Some("folder.jpg"));
    }

    #[test]
    fn convert_conflicts_with_fix_flags() {
        assert!(parse(&["--convert-opus", "out", "--mb-ids", "music"]).is_err());
        assert!(parse(&["--convert-opus", "out", "--embed-cover", "music"]).is_err());
    }

    #[test]
    fn no_prune_requires_convert() {
        let cli = parse(&["--no-prune", "--mb-ids", "music"]).unwrap();
        assert!(cli.mode().is_err());
        let cli = parse(&["--convert-opus", "out", "--no-prune", "music"]).unwrap();
        assert!(matches!(cli.mode().unwrap(), Mode::Convert { prune: false, .. }));
    }

    #[test]
    fn verbose_passes_encoder_output_through() {
        let cli = parse(&["-v", "--convert-opus", "out", "--encoder", "cp", "music"]).unwrap();
        let Mode::Convert { encoder, .. } = cli.mode().unwrap() else {
            panic!("expected convert mode");
        };
        assert_eq!(encoder.program, std::ffi::OsString::from("cp"));
        assert_eq!(encoder.output, OutputMode::PassThrough);
    }

    #[test]
    fn no_mode_is_rejected() {
        assert!(parse(&["music"]).unwrap().mode().is_err());
    }

    #[test]
    fn empty_merge_list_is_rejected() {
        let cli = parse(&["--mb-ids", "--merge-tags", " , ", "music"]).unwrap();
        assert!(cli.mode().is_err());
    }
}
