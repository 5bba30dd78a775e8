//! Helps identify files without knowing their file type beforehand.
//!
//! Only JPEG can be geotagged, but knowing what an input _actually_ is makes
//! for much better errors than "not a JPEG."
//!
//! # Usage
//!
//! ```
//! use raves_geotag::magic_number::MagicNumber;
//!
//! let png_signature: &[u8] = b"\x89PNG\r\n\x1a\n";
//! assert_eq!(raves_geotag::get(&png_signature), Some(MagicNumber::Png));
//! assert!(!MagicNumber::Png.supports_geotags());
//! ```

/// A file format, as identified by its leading bytes.
#[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum MagicNumber {
    /// Starts with `SOI`, `0xFF 0xD8`.
    Jpeg,

    /// Starts with `\x89PNG\r\n\x1a\n`.
    Png,

    /// Starts with `GIF87a` or `GIF89a`.
    Gif,

    /// A RIFF container with the `WEBP` form type.
    Webp,

    /// Starts with `II*\0` or `MM\0*`.
    Tiff,

    /// An ISO-BMFF `ftyp` box with a HEIF brand.
    Heif,

    /// An ISO-BMFF `ftyp` box with an AVIF brand.
    Avif,
}

impl MagicNumber {
    /// Finds the magic number of a file, if it has a known one.
    pub fn new(input: &impl AsRef<[u8]>) -> Option<Self> {
        let input: &[u8] = input.as_ref();

        if input.starts_with(&[0xFF, 0xD8]) {
            return Some(Self::Jpeg);
        }

        if input.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::Png);
        }

        if input.starts_with(b"GIF87a") || input.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        if input.starts_with(b"RIFF") && input.get(8..12) == Some(b"WEBP".as_slice()) {
            return Some(Self::Webp);
        }

        if input.starts_with(b"II*\0") || input.starts_with(b"MM\0*") {
            return Some(Self::Tiff);
        }

        // ISO-BMFF: `[size: u32][b"ftyp"][major brand: 4 bytes]`
        if input.get(4..8) == Some(b"ftyp".as_slice()) {
            return match input.get(8..12) {
                Some(b"avif" | b"avis") => Some(Self::Avif),
                Some(b"heic" | b"heix" | b"heim" | b"heis" | b"mif1" | b"msf1") => {
                    Some(Self::Heif)
                }
                _ => {
                    log::trace!("Found an ISO-BMFF file with an unrecognized brand.");
                    None
                }
            };
        }

        None
    }

    /// Whether this crate can write geotags into files of this format.
    pub const fn supports_geotags(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

#[cfg(test)]
mod tests {
    use super::MagicNumber;
    use crate::util::logger;

    #[test]
    fn recognizes_common_signatures() {
        logger();

        let cases: &[(&[u8], Option<MagicNumber>)] = &[
            (&[0xFF, 0xD8, 0xFF, 0xE0], Some(MagicNumber::Jpeg)),
            (b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR", Some(MagicNumber::Png)),
            (b"GIF89a\x01\x00", Some(MagicNumber::Gif)),
            (b"RIFF\x24\0\0\0WEBPVP8 ", Some(MagicNumber::Webp)),
            (b"II*\0\x08\0\0\0", Some(MagicNumber::Tiff)),
            (b"MM\0*\0\0\0\x08", Some(MagicNumber::Tiff)),
            (b"\0\0\0\x18ftypheic", Some(MagicNumber::Heif)),
            (b"\0\0\0\x1cftypavif", Some(MagicNumber::Avif)),
            (b"\0\0\0\x18ftypisom", None),
            (b"RIFF\x24\0\0\0WAVE", None),
            (b"", None),
            (&[0xFF], None),
        ];

        for (input, expected) in cases {
            log::debug!("checking input: `{input:x?}`");
            assert_eq!(MagicNumber::new(input), *expected);
        }
    }

    #[test]
    fn only_jpeg_supports_geotags() {
        assert!(MagicNumber::Jpeg.supports_geotags());
        for other in [
            MagicNumber::Png,
            MagicNumber::Gif,
            MagicNumber::Webp,
            MagicNumber::Tiff,
            MagicNumber::Heif,
            MagicNumber::Avif,
        ] {
            assert!(!other.supports_geotags(), "{other:?} shouldn't be supported");
        }
    }
}
