use crate::{exif::error::ExifFatalError, magic_number::MagicNumber};

/// An error that occurred while writing, reading, or clearing a geotag.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum GeotagError {
    /// The input isn't a format we can write geotags into.
    ///
    /// Only JPEG is supported. If the input was recognized as something
    /// else, that's reported here.
    UnsupportedFormat {
        /// What the input looked like, if we could tell.
        found: Option<MagicNumber>,
    },

    /// A JPEG marker segment couldn't be walked safely.
    MalformedSegment {
        /// The segment's marker code (the byte after `0xFF`).
        marker_code: u8,

        /// Byte offset of the segment's `0xFF` in the input.
        offset: usize,

        /// What was wrong with it.
        defect: SegmentDefect,
    },

    /// The encoded Exif wouldn't fit in one APP1 segment.
    ///
    /// A segment's length field is a `u16` that counts itself, so its payload
    /// can be at most `65533` bytes.
    EncodingOverflow {
        /// How large the payload would have been.
        payload_len: usize,
    },

    /// The existing Exif block couldn't be decoded.
    Exif(ExifFatalError),
}

/// Describes how a JPEG segment was malformed.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub enum SegmentDefect {
    /// The input ended before the segment's two length bytes.
    MissingLength,

    /// The length was less than `2`, but it always counts its own two bytes.
    LengthTooShort {
        /// The length field, as written.
        len: u16,
    },

    /// The segment claims to run past the end of the input.
    PastEndOfInput {
        /// The length field, as written.
        len: u16,

        /// How many bytes remained after the marker.
        available: usize,
    },
}

impl core::fmt::Display for GeotagError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnsupportedFormat { found: Some(found) } => write!(
                f,
                "Geotags can only be written to JPEG files, \
                but this file looks like: `{found:?}`"
            ),
            Self::UnsupportedFormat { found: None } => f.write_str(
                "Geotags can only be written to JPEG files, \
                and this file's format wasn't recognized.",
            ),

            Self::MalformedSegment {
                marker_code,
                offset,
                defect,
            } => write!(
                f,
                "JPEG segment with marker code `{marker_code:#04x}` at byte \
                `{offset}` is malformed: {defect}"
            ),

            Self::EncodingOverflow { payload_len } => write!(
                f,
                "Encoded Exif is too large for one APP1 segment. \
                payload len: `{payload_len}` bytes, maximum: `{}` bytes",
                crate::providers::jpeg::MAX_APP1_PAYLOAD_LEN
            ),

            Self::Exif(e) => write!(f, "Failed to decode the file's Exif. err: {e}"),
        }
    }
}

impl core::fmt::Display for SegmentDefect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingLength => f.write_str("ran out of data before its length"),
            Self::LengthTooShort { len } => write!(
                f,
                "its length, `{len}`, is too short to include its own two bytes"
            ),
            Self::PastEndOfInput { len, available } => write!(
                f,
                "its length, `{len}`, runs past the end of the input \
                (`{available}` bytes remained)"
            ),
        }
    }
}

impl core::error::Error for GeotagError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Exif(e) => Some(e),
            Self::UnsupportedFormat { .. }
            | Self::MalformedSegment { .. }
            | Self::EncodingOverflow { .. } => None,
        }
    }
}

impl From<ExifFatalError> for GeotagError {
    fn from(value: ExifFatalError) -> Self {
        GeotagError::Exif(value)
    }
}
