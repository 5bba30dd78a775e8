//! Splices an APP1 segment into a JPEG.

use super::scan::{APP1_MARKER_CODE, SegmentLayout, SegmentSpan};
use crate::error::{GeotagError, SegmentDefect};

/// The largest payload one APP1 segment can carry.
///
/// The length field is a `u16` that counts its own two bytes.
pub const MAX_APP1_PAYLOAD_LEN: usize = u16::MAX as usize - 2;

/// Wraps a payload in an APP1 marker and length field.
pub fn app1_segment(payload: &[u8]) -> Result<Vec<u8>, GeotagError> {
    if payload.len() > MAX_APP1_PAYLOAD_LEN {
        log::error!(
            "APP1 payload is too large. len: `{}`, max: `{MAX_APP1_PAYLOAD_LEN}`",
            payload.len()
        );
        return Err(GeotagError::EncodingOverflow {
            payload_len: payload.len(),
        });
    }

    // checked above
    let len_field = (payload.len() + 2) as u16;

    let mut segment = Vec::with_capacity(4 + payload.len());
    segment.extend_from_slice(&[0xFF, APP1_MARKER_CODE]);
    segment.extend_from_slice(&len_field.to_be_bytes());
    segment.extend_from_slice(payload);
    Ok(segment)
}

/// Builds a new JPEG with `payload` in an APP1 segment at the layout's
/// insertion offset.
///
/// If the layout has an Exif segment, it's replaced, and any duplicates are
/// dropped. Every other byte of the input comes through untouched.
pub fn assemble(
    input: &[u8],
    layout: &SegmentLayout,
    payload: &[u8],
) -> Result<Vec<u8>, GeotagError> {
    let segment = app1_segment(payload)?;
    let insertion_offset = layout.insertion_offset();

    let head = input
        .get(..insertion_offset)
        .ok_or_else(|| out_of_bounds(input, insertion_offset))?;

    log::debug!(
        "Splicing `{}`-byte APP1 segment at `{insertion_offset}`, dropping `{}` old bytes.",
        segment.len(),
        layout.resume_offset() - insertion_offset
    );

    let mut output = Vec::with_capacity(input.len() + segment.len());
    output.extend_from_slice(head);
    output.extend_from_slice(&segment);
    copy_skipping(input, layout.resume_offset(), &layout.duplicates, &mut output)?;
    Ok(output)
}

/// Copies the input, leaving out all of its Exif segments.
pub fn without_exif(input: &[u8], layout: &SegmentLayout) -> Result<Vec<u8>, GeotagError> {
    let Some(span) = layout.exif else {
        return Ok(input.to_vec());
    };

    let head = input
        .get(..span.offset)
        .ok_or_else(|| out_of_bounds(input, span.offset))?;

    log::debug!("Removing segment {span:?}.");

    let mut output = Vec::with_capacity(input.len() - span.len.min(input.len()));
    output.extend_from_slice(head);
    copy_skipping(input, span.end(), &layout.duplicates, &mut output)?;
    Ok(output)
}

/// Copies `input[from..]` onto `output`, minus the `skipped` spans.
///
/// The spans must be in file order, and start at or after `from`.
fn copy_skipping(
    input: &[u8],
    mut from: usize,
    skipped: &[SegmentSpan],
    output: &mut Vec<u8>,
) -> Result<(), GeotagError> {
    for span in skipped {
        let kept = input
            .get(from..span.offset)
            .ok_or_else(|| out_of_bounds(input, span.offset))?;
        output.extend_from_slice(kept);

        log::debug!("Dropping duplicate Exif segment {span:?}.");
        from = span.end();
    }

    let tail = input.get(from..).ok_or_else(|| out_of_bounds(input, from))?;
    output.extend_from_slice(tail);
    Ok(())
}

/// A layout that doesn't fit its input. It must've come from another file.
fn out_of_bounds(input: &[u8], offset: usize) -> GeotagError {
    log::error!(
        "Segment layout doesn't fit the input. offset: `{offset}`, len: `{}`",
        input.len()
    );
    GeotagError::MalformedSegment {
        marker_code: APP1_MARKER_CODE,
        offset,
        defect: SegmentDefect::PastEndOfInput {
            len: 0,
            available: input.len(),
        },
    }
}
