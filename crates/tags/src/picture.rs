//! Picture payload — the body of a FLAC `PICTURE` block.
//!
//! All integers are big-endian `u32`:
//! ```text
//! picture_type
//! mime_length        + mime bytes
//! description_length + description bytes
//! width, height, depth, colors
//! data_length        + data bytes
//! ```

use crate::bytes::{put_prefixed, put_u32, Cursor, Endian};
use crate::error::Result;

/// Picture type code for "Cover (front)".
pub const FRONT_COVER: u32 = 3;

/// Decoded picture block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureBlock {
    /// Picture type code ([`FRONT_COVER`] for embedded covers).
    pub picture_type: u32,
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Free-form description.
    pub description: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Colour depth in bits per pixel.
    pub depth: u32,
    /// Palette size for indexed images, 0 otherwise.
    pub colors: u32,
    /// Raw image file bytes.
    pub data: Vec<u8>,
}

impl PictureBlock {
    /// Front cover built from a JPEG file: 24-bit depth, no palette, empty description.
    #[must_use]
    pub fn front_cover_jpeg(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            picture_type: FRONT_COVER,
            mime_type: "image/jpeg".to_owned(),
            description: String::new(),
            width,
            height,
            depth: 24,
            colors: 0,
            data,
        }
    }

    /// Encode into the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::LengthOverflow`](crate::TagError::LengthOverflow) if a text or data field
    /// does not fit a `u32` length.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            self.data
                .len()
                .saturating_add(self.mime_type.len())
                .saturating_add(self.description.len())
                .saturating_add(32),
        );
        put_u32(&mut out, self.picture_type, Endian::Big);
        put_prefixed(&mut out, self.mime_type.as_bytes(), Endian::Big, "mime type")?;
        put_prefixed(
            &mut out,
            self.description.as_bytes(),
            Endian::Big,
            "description",
        )?;
        for v in [self.width, self.height, self.depth, self.colors] {
            put_u32(&mut out, v, Endian::Big);
        }
        put_prefixed(&mut out, &self.data, Endian::Big, "picture data")?;
        Ok(out)
    }

    /// Decode a picture payload.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::TruncatedInput`](crate::TagError::TruncatedInput) if the payload is short.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data, Endian::Big);
        Ok(Self {
            picture_type: cur.u32("picture type")?,
            mime_type: cur.text("mime type")?,
            description: cur.text("description")?,
            width: cur.u32("width")?,
            height: cur.u32("height")?,
            depth: cur.u32("depth")?,
            colors: cur.u32("colors")?,
            data: cur.prefixed("picture data")?.to_vec(),
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::error::TagError;

    fn cover() -> PictureBlock {
        PictureBlock {
            description: "Cover".into(),
            ..PictureBlock::front_cover_jpeg(500, 500, vec![0x01, 0x02, 0x03, 0x04])
        }
    }

    fn be(bytes: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn header_fields_are_big_endian() {
        let bytes = cover().encode().unwrap();
        assert_eq!(be(&bytes, 0), 3);
        assert_eq!(be(&bytes, 4), "image/jpeg".len() as u32);
        assert_eq!(&bytes[8..18], b"image/jpeg");
        assert_eq!(be(&bytes, 18), "Cover".len() as u32);
        assert_eq!(&bytes[22..27], b"Cover");
        assert_eq!(be(&bytes, 27), 500); // width
        assert_eq!(be(&bytes, 31), 500); // height
        assert_eq!(be(&bytes, 35), 24); // depth
        assert_eq!(be(&bytes, 39), 0); // colors
        assert_eq!(be(&bytes, 43), 4); // data length
        assert_eq!(&bytes[47..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn decode_is_symmetric() {
        let pic = cover();
        assert_eq!(PictureBlock::decode(&pic.encode().unwrap()).unwrap(), pic);
    }

    #[test]
    fn front_cover_defaults() {
        let pic = PictureBlock::front_cover_jpeg(1, 2, vec![]);
        assert_eq!(pic.picture_type, FRONT_COVER);
        assert_eq!(pic.mime_type, "image/jpeg");
        assert!(pic.description.is_empty());
        assert_eq!((pic.width, pic.height, pic.depth, pic.colors), (1, 2, 24, 0));
    }

    #[test]
    fn decode_rejects_short_data() {
        let mut bytes = cover().encode().unwrap();
        bytes.pop();
        assert!(matches!(
            PictureBlock::decode(&bytes),
            Err(TagError::TruncatedInput {
                what: "picture data",
                ..
            })
        ));
    }
}
