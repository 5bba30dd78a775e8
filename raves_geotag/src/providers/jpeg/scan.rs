//! Walks a JPEG's marker segments to decide where Exif goes.
//!
//! Each segment is `0xFF`, a marker code, then (for most codes) a big-endian
//! `u16` length that counts itself but not the marker. We only ever read
//! here; the assembler does the writing.

use winnow::{
    Parser,
    binary::{be_u16, u8},
    error::EmptyError,
    token::take,
};

use crate::{
    error::{GeotagError, SegmentDefect},
    exif::EXIF_SIG,
    magic_number::MagicNumber,
};

/// The first marker code, `SOI` (start of image).
pub const SOI_MARKER_CODE: u8 = 0xD8;

/// The last marker code, `EOI` (end of image).
pub const EOI_MARKER_CODE: u8 = 0xD9;

/// The start of scan code, `SOS`. Compressed image data follows its header.
pub const SOS_MARKER_CODE: u8 = 0xDA;

/// A marker code indicating that an APP1 marker is present.
pub const APP1_MARKER_CODE: u8 = 0xE1;

/// Where scanning starts: right after `SOI`.
pub const AFTER_SOI: usize = 2;

/// Markers with no length or payload: `TEM`, `RSTn`, `SOI`, and `EOI`.
const STANDALONE_MARKERS: &[u8] = &[
    0x01, 0xD0, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9,
];

/// One whole segment within the input, marker included.
#[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct SegmentSpan {
    /// Offset of the segment's `0xFF`.
    pub offset: usize,

    /// Length of the whole segment: two marker bytes, plus whatever the
    /// length field says.
    pub len: usize,
}

impl SegmentSpan {
    /// The offset right after this segment.
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The segment's payload, after its marker and length field.
    pub fn payload<'input>(&self, input: &'input [u8]) -> Option<&'input [u8]> {
        input.get(self.offset + 4..self.end())
    }
}

/// What the scanner learned about a JPEG.
#[derive(Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct SegmentLayout {
    /// The first Exif APP1 segment, if there is one.
    pub exif: Option<SegmentSpan>,

    /// Any Exif APP1 segments after the first, in file order.
    ///
    /// Readers only look at the first, so these are dropped whenever we
    /// write.
    pub duplicates: Vec<SegmentSpan>,
}

impl SegmentLayout {
    /// Where a new Exif APP1 segment should be written.
    ///
    /// This is the old segment's offset when replacing one, or right after
    /// `SOI` otherwise.
    pub fn insertion_offset(&self) -> usize {
        self.exif.map(|span| span.offset).unwrap_or(AFTER_SOI)
    }

    /// The offset where the original input resumes after a new segment is
    /// written.
    ///
    /// When replacing, that's the end of the old segment, so it's dropped.
    pub fn resume_offset(&self) -> usize {
        self.exif
            .map(|span| span.end())
            .unwrap_or(AFTER_SOI)
    }
}

/// The scanner's states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    /// Looking for a marker at `offset`.
    SeekingMarker { offset: usize },

    /// Found an Exif APP1 segment.
    FoundExif(SegmentSpan),

    /// Hit `SOS`. Nothing after it is metadata.
    FoundScanStart { offset: usize },

    /// Finished.
    Done,
}

/// Scans a JPEG for its Exif APP1 segments, deciding where new Exif should
/// be written.
///
/// Scanning stops at `SOS`, at `EOI`, or at the end of the input, whichever
/// comes first. Bytes past that point are never read.
///
/// # Errors
///
/// - [`GeotagError::UnsupportedFormat`] if the input doesn't start with
///   `SOI`.
/// - [`GeotagError::MalformedSegment`] if a segment's length is missing,
///   too small, or runs past the end of the input.
pub fn locate_insertion_point(input: &[u8]) -> Result<SegmentLayout, GeotagError> {
    if !input.starts_with(&[0xFF, SOI_MARKER_CODE]) {
        let found = MagicNumber::new(&input);
        log::error!("Input isn't a JPEG. It looks like: {found:?}");
        return Err(GeotagError::UnsupportedFormat { found });
    }

    let mut exif_segments: Vec<SegmentSpan> = Vec::new();
    let mut state = ScanState::SeekingMarker { offset: AFTER_SOI };
    loop {
        state = match state {
            ScanState::SeekingMarker { offset } => seek(input, offset)?,

            ScanState::FoundExif(span) => {
                if exif_segments.is_empty() {
                    log::debug!("Found Exif APP1 segment to replace: {span:?}");
                } else {
                    log::warn!("Found another Exif APP1 segment. It'll be dropped on write: {span:?}");
                }

                exif_segments.push(span);
                ScanState::SeekingMarker { offset: span.end() }
            }

            ScanState::FoundScanStart { offset } => {
                log::debug!("Hit `SOS` at `{offset}`.");
                ScanState::Done
            }

            ScanState::Done => break,
        };
    }

    let mut exif_segments = exif_segments.into_iter();
    Ok(SegmentLayout {
        exif: exif_segments.next(),
        duplicates: exif_segments.collect(),
    })
}

/// Takes one step from `offset`.
fn seek(input: &[u8], offset: usize) -> Result<ScanState, GeotagError> {
    let mut stream: &[u8] = input.get(offset..).unwrap_or_default();

    let Ok(found) = marker_code(&mut stream) else {
        log::warn!("Ran out of input at `{offset}` before finding `SOS`.");
        return Ok(ScanState::Done);
    };

    // anything that isn't a marker is skipped a byte at a time. that covers
    // fill bytes (`0xFF 0xFF`) and stray data too
    let Some(marker_code) = found else {
        return Ok(ScanState::SeekingMarker { offset: offset + 1 });
    };

    if marker_code == EOI_MARKER_CODE {
        log::warn!("Hit `EOI` at `{offset}` before finding `SOS`.");
        return Ok(ScanState::Done);
    }

    if STANDALONE_MARKERS.contains(&marker_code) {
        log::trace!("Skipping standalone marker `{marker_code:#04x}` at `{offset}`.");
        return Ok(ScanState::SeekingMarker { offset: offset + 2 });
    }

    if marker_code == SOS_MARKER_CODE {
        return Ok(ScanState::FoundScanStart { offset });
    }

    let payload: &[u8] = segment_payload(&mut stream).map_err(|defect| {
        log::error!("Segment `{marker_code:#04x}` at `{offset}` is malformed: {defect:?}");
        GeotagError::MalformedSegment {
            marker_code,
            offset,
            defect,
        }
    })?;

    let span = SegmentSpan {
        offset,
        len: 4 + payload.len(),
    };
    log::trace!("Found segment `{marker_code:#04x}`: {span:?}");

    if marker_code == APP1_MARKER_CODE && payload.starts_with(EXIF_SIG) {
        return Ok(ScanState::FoundExif(span));
    }

    Ok(ScanState::SeekingMarker {
        offset: span.end(),
    })
}

/// Reads a marker's `0xFF` and its code.
///
/// Gives `None` when those two bytes aren't a marker, since `0x00` and
/// `0xFF` aren't marker codes.
fn marker_code(input: &mut &[u8]) -> Result<Option<u8>, EmptyError> {
    (u8, u8)
        .map(|(first, code): (u8, u8)| (first == 0xFF && ![0x00, 0xFF].contains(&code)).then_some(code))
        .parse_next(input)
}

/// Reads a segment's length field, then takes the payload it describes.
fn segment_payload<'input>(input: &mut &'input [u8]) -> Result<&'input [u8], SegmentDefect> {
    let len: u16 = be_u16
        .parse_next(input)
        .map_err(|_: EmptyError| SegmentDefect::MissingLength)?;

    // the length counts its own two bytes
    let payload_len: u16 = len
        .checked_sub(2)
        .ok_or(SegmentDefect::LengthTooShort { len })?;

    let available = input.len() + 2;
    take(payload_len)
        .parse_next(input)
        .map_err(|_: EmptyError| SegmentDefect::PastEndOfInput { len, available })
}
