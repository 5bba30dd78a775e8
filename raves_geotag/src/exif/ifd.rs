use winnow::{
    Parser,
    binary::{u16, u32},
    error::EmptyError,
};

use super::{
    Stream,
    error::{ExifFatalError, ExifFieldError, ExifFieldResult, UnreadableField},
    value::{field_tag, parse_value},
};
use raves_geotag_types::exif::{Field, FieldTag, tags::KnownTag};

/// An image file directory found within Exif metadata.
///
/// These contain a number of fields - at least one - and end with a pointer
/// to the next IFD.
#[derive(Clone, Debug, Hash, PartialEq, PartialOrd)]
pub struct Ifd {
    /// A list of fields on this IFD, in the order they were stored.
    ///
    /// A field that failed to parse stays in the list as an error, in case
    /// the caller cares about it.
    pub fields: Vec<ExifFieldResult>,
}

impl Ifd {
    /// Finds the first well-formed field with the given tag.
    pub fn field(&self, tag: KnownTag) -> Option<&Field> {
        self.fields
            .iter()
            .filter_map(|f| f.as_ref().ok())
            .find(|f| f.tag == FieldTag::Known(tag))
    }

    /// Finds why a field with the given tag couldn't be decoded, if it
    /// couldn't.
    pub fn unreadable(&self, tag: KnownTag) -> Option<&ExifFieldError> {
        self.fields
            .iter()
            .filter_map(|f| f.as_ref().err())
            .find(|f| f.tag == Some(FieldTag::Known(tag)))
            .map(|f| &f.error)
    }

    /// Where the entry at `index` starts, given the IFD's own offset.
    pub const fn entry_offset(ifd_offset: usize, index: usize) -> usize {
        ifd_offset + 2 + index * IFD_ENTRY_LEN
    }

    /// How many bytes the IFD's table takes: its entry count, its entries,
    /// and the pointer to the next IFD.
    pub fn table_len(&self) -> usize {
        Self::entry_offset(0, self.fields.len()) + 4
    }
}

/// Each IFD entry takes 12 bytes: tag, type, count, and value-or-offset.
pub const IFD_ENTRY_LEN: usize = 12;

/// Parses out an entire IFD.
///
/// The pointer to the next IFD must be there, but it isn't followed. A
/// geotag only lives in IFD 0 and the GPS IFD.
pub fn parse_ifd(input: &mut Stream) -> Result<Ifd, ExifFatalError> {
    let endianness = input.state.endianness;

    let entry_count: u16 = u16(endianness).parse_next(input).map_err(|_: EmptyError| {
        log::error!("Couldn't find count on IFD - ran out of data!");
        ExifFatalError::IfdNoEntryCount
    })?;

    if entry_count == 0 {
        log::error!("IFD reported itself as having zero fields! This is fatal to parsing.");
        return Err(ExifFatalError::IfdHadZeroFields);
    }

    log::trace!("Parsing `{entry_count}` fields...");
    let ifd = Ifd {
        fields: (0..entry_count).map(|_| parse_entry(input)).collect(),
    };
    log::trace!("Completed field parsing!");

    let next_ifd_location: u32 = u32(endianness).parse_next(input).map_err(|_: EmptyError| {
        log::error!("IFD didn't contain a pointer to the next IFD!");
        ExifFatalError::IfdNoPointer
    })?;
    log::trace!("Next IFD pointer: `{next_ifd_location}`");

    Ok(ifd)
}

/// Parses one entry, keeping its tag around if the rest of it is bad.
fn parse_entry(input: &mut Stream) -> ExifFieldResult {
    let peeked: Result<(&[u8], u16), EmptyError> =
        u16(input.state.endianness).parse_peek(input.input);
    let tag: Option<FieldTag> = peeked
        .ok()
        .map(|(_, raw_tag)| field_tag(input.state.current_ifd, raw_tag));

    parse_value(input).map_err(|error| {
        log::warn!("Couldn't decode field {tag:?}. err: {error}");
        UnreadableField { tag, error }
    })
}
