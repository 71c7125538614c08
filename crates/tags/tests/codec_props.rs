//! Property tests for the comment and picture codecs.

use std::path::Path;

use proptest::prelude::*;
use tags::{merge_tags, CommentBlock, MergeTargets, PictureBlock, TagError};

fn comment_block() -> impl Strategy<Value = CommentBlock> {
    (
        ".{0,40}",
        prop::collection::vec("[A-Za-z_]{1,12}(=.{0,24})?", 0..16),
    )
        .prop_map(|(vendor, comments)| CommentBlock { vendor, comments })
}

/// Blocks whose keys collide with merge targets and the warning namespace.
fn tagged_block() -> impl Strategy<Value = CommentBlock> {
    let key = prop_oneof![
        Just("MUSICBRAINZ_ARTISTID"),
        Just("musicbrainz_albumartistid"),
        Just("MUSICBRAINZ_RELEASE_ARTISTID"),
        Just("MUSICBRAINZ_TRACKID"),
        Just("TITLE"),
    ];
    prop::collection::vec((key, "[a-z0-9+-]{0,8}"), 0..12).prop_map(|pairs| CommentBlock {
        vendor: "v".into(),
        comments: pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect(),
    })
}

proptest! {
    #[test]
    fn comment_decode_inverts_encode(block in comment_block()) {
        let bytes = block.encode().unwrap();
        prop_assert_eq!(CommentBlock::decode(&bytes).unwrap(), block);
    }

    #[test]
    fn comment_encode_inverts_decode(block in comment_block()) {
        let bytes = block.encode().unwrap();
        let again = CommentBlock::decode(&bytes).unwrap().encode().unwrap();
        prop_assert_eq!(again, bytes);
    }

    #[test]
    fn truncated_comment_payload_is_rejected(block in comment_block(), cut in 0usize..64) {
        let bytes = block.encode().unwrap();
        // Encoded payloads carry no trailing bytes, so every strictly
        // shorter prefix ends inside a declared field.
        let end = bytes.len().saturating_sub(cut.max(1));
        let result = CommentBlock::decode(bytes.get(..end).unwrap_or_default());
        prop_assert!(
            matches!(result, Err(TagError::TruncatedInput { .. })),
            "prefix of {} / {} bytes decoded as {:?}",
            end,
            bytes.len(),
            result
        );
    }

    #[test]
    fn picture_decode_inverts_encode(
        picture_type in 0u32..21,
        mime in "image/[a-z]{3,4}",
        description in ".{0,16}",
        width in any::<u32>(),
        height in any::<u32>(),
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let pic = PictureBlock {
            picture_type,
            mime_type: mime,
            description,
            width,
            height,
            depth: 24,
            colors: 0,
            data,
        };
        prop_assert_eq!(PictureBlock::decode(&pic.encode().unwrap()).unwrap(), pic);
    }

    #[test]
    fn merge_is_idempotent(block in tagged_block()) {
        let targets = MergeTargets::default();
        let first = merge_tags(Path::new("p.flac"), &block, &targets);
        let second = merge_tags(Path::new("p.flac"), &first.block, &targets);
        prop_assert!(!second.modified);
        prop_assert_eq!(second.block, first.block);
    }
}
