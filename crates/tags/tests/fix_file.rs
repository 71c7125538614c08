//! End-to-end: FLAC file on disk → fix_file → FLAC file on disk.
//!
//! No mocks. Uses tempfiles and a synthetic stream (stream info, comment,
//! padding, a few audio bytes).

use std::fs;
use std::path::{Path, PathBuf};

use tags::{
    fix_file, CommentBlock, Diagnostic, FixOptions, FlacFile, MergeTargets, MetadataBlock,
    PictureBlock,
};
use tempfile::TempDir;

const AUDIO: &[u8] = &[0xFF, 0xF8, 0x69, 0x08, 0x00, 0x4A];

fn write_flac(dir: &Path, name: &str, comments: &[&str], picture: bool) -> PathBuf {
    let comment = CommentBlock::new(
        "reference libFLAC 1.4.3 20230623",
        comments.iter().map(|c| (*c).to_owned()).collect(),
    );
    let mut blocks = vec![
        MetadataBlock::Other {
            kind: 0,
            data: vec![0x11; 34],
        },
        MetadataBlock::comment(&comment).expect("encode comment"),
    ];
    if picture {
        let pic = PictureBlock::front_cover_jpeg(1, 1, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        blocks.push(MetadataBlock::picture(&pic).expect("encode picture"));
    }
    blocks.push(MetadataBlock::Other {
        kind: 1,
        data: vec![0; 64],
    });
    let flac = FlacFile {
        blocks,
        audio: AUDIO.to_vec(),
    };
    let path = dir.join(name);
    flac.save(&path).expect("save");
    path
}

/// SOI, SOF0 with the given size, EOI.
fn jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut j = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08];
    j.extend_from_slice(&height.to_be_bytes());
    j.extend_from_slice(&width.to_be_bytes());
    j.extend_from_slice(&[1, 1, 0x11, 0, 0xFF, 0xD9]);
    j
}

fn comments_of(path: &Path) -> Vec<String> {
    let flac = FlacFile::read(path).expect("read back");
    let block = flac
        .blocks
        .iter()
        .find(|b| matches!(b, MetadataBlock::Comment(_)))
        .expect("comment block");
    CommentBlock::decode(block.payload())
        .expect("decode")
        .comments
}

fn both_steps(write: bool) -> FixOptions {
    FixOptions {
        write,
        merge: Some(MergeTargets::default()),
        cover: Some("cover.jpg".into()),
    }
}

#[test]
fn write_mode_merges_and_embeds() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("cover.jpg"), jpeg(600, 600)).expect("cover");
    let path = write_flac(
        tmp.path(),
        "01.flac",
        &[
            "TITLE=One",
            "MUSICBRAINZ_ARTISTID=a",
            "MUSICBRAINZ_ARTISTID=b",
        ],
        false,
    );

    let mut diags: Vec<Diagnostic> = Vec::new();
    let report = fix_file(&path, &both_steps(true), &mut diags).expect("fix");

    assert!(report.tags_merged && report.cover_embedded && report.saved);
    assert_eq!(comments_of(&path), ["TITLE=One", "MUSICBRAINZ_ARTISTID=a+b"]);

    let flac = FlacFile::read(&path).expect("read");
    assert_eq!(flac.audio, AUDIO);
    let pic = flac
        .blocks
        .iter()
        .find(|b| b.is_picture())
        .map(|b| PictureBlock::decode(b.payload()).expect("decode picture"))
        .expect("picture block");
    assert_eq!((pic.width, pic.height), (600, 600));
    assert!(diags.iter().any(|d| matches!(d, Diagnostic::Saving { .. })));
}

#[test]
fn dry_run_reports_but_does_not_touch_file() {
    let tmp = TempDir::new().expect("tmp");
    let path = write_flac(
        tmp.path(),
        "01.flac",
        &["MUSICBRAINZ_ARTISTID=a", "MUSICBRAINZ_ARTISTID=b"],
        true,
    );
    let before = fs::read(&path).expect("read");

    let mut diags: Vec<Diagnostic> = Vec::new();
    let report = fix_file(&path, &both_steps(false), &mut diags).expect("fix");

    assert!(report.tags_merged);
    assert!(!report.saved);
    assert_eq!(fs::read(&path).expect("read"), before);
    assert!(diags.iter().any(|d| matches!(d, Diagnostic::DryRun { .. })));
}

#[test]
fn clean_file_is_not_rewritten() {
    let tmp = TempDir::new().expect("tmp");
    let path = write_flac(tmp.path(), "01.flac", &["MUSICBRAINZ_ARTISTID=a"], true);
    let before = fs::read(&path).expect("read");

    let report = fix_file(&path, &both_steps(true), &mut Vec::<Diagnostic>::new()).expect("fix");

    assert!(!report.modified());
    assert_eq!(fs::read(&path).expect("read"), before);
}

#[test]
fn missing_cover_and_repeated_ids_warn() {
    let tmp = TempDir::new().expect("tmp");
    let path = write_flac(
        tmp.path(),
        "01.flac",
        &[
            "MUSICBRAINZ_RELEASEGROUPID=x",
            "MUSICBRAINZ_RELEASEGROUPID=y",
        ],
        false,
    );

    let mut diags: Vec<Diagnostic> = Vec::new();
    let report = fix_file(&path, &both_steps(true), &mut diags).expect("fix");

    assert!(!report.modified());
    assert!(diags.iter().any(|d| matches!(
        d,
        Diagnostic::MultipleValues { key, count: 2, .. } if key == "MUSICBRAINZ_RELEASEGROUPID"
    )));
    assert!(diags
        .iter()
        .any(|d| matches!(d, Diagnostic::MissingCover { .. })));
}

#[test]
fn non_flac_file_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("fake.flac");
    fs::write(&path, b"RIFF....WAVE").expect("write");
    assert!(fix_file(&path, &both_steps(true), &mut Vec::<Diagnostic>::new()).is_err());
    assert_eq!(fs::read(&path).expect("read"), b"RIFF....WAVE");
}
