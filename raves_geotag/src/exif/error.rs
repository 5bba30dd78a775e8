use raves_geotag_types::{
    exif::{Field, FieldTag, primitives::PrimitiveTy, tags::GpsIfdTag},
    geotag::CoordinateError,
};

/// This type describes the decoding result.
///
/// If it's the `Err` variant, decoding failed completely, and you aren't
/// getting a geotag at all.
pub type ExifFatalResult<T> = Result<T, ExifFatalError>;

/// Decoding a field may fail on its own, without ruining the rest of its IFD.
///
/// In that case, we'll report that inside the IFD's list of fields.
pub type ExifFieldResult = Result<Field, UnreadableField>;

/// An IFD entry that couldn't be decoded.
#[derive(Clone, Debug, PartialEq, PartialOrd, Hash)]
pub struct UnreadableField {
    /// The entry's tag, if the entry was long enough to hold one.
    pub tag: Option<FieldTag>,

    /// Why the entry couldn't be decoded.
    pub error: ExifFieldError,
}

#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum ExifFatalError {
    /// The input was too short to provide a byte order marker.
    NoByteOrderMarker { len: usize },

    /// The byte order marker was weird - it's not one of the two expected
    /// values (in ASCII, should be either `II` or `MM`).
    WeirdByteOrderMarker { found: [u8; 2] },

    /// Didn't find the TIFF magic number.
    NoTiffMagicNumber,

    /// The magic number indexes had a weird value. It's not TIFF's.
    MagicNumberWasntTiff { found: u16 },

    /// No TIFF header offset was found.
    NoTiffHeaderOffset,

    /// The header offset would place us inside the header! That doesn't make
    /// any sense, so we can't keep parsing.
    HeaderOffsetBeforeHeader,

    /// An IFD was said to start past the end of the blob.
    IfdOffsetOutOfBounds { offset: u32 },

    /// The IFD didn't say how many entries it has.
    IfdNoEntryCount,

    /// The IFD was completely blank.
    IfdHadZeroFields,

    /// The IFD didn't give a pointer to the next entry.
    IfdNoPointer,

    /// IFD 0 had a GPS IFD pointer, but it wasn't a single `Long`.
    GpsPointerMalformed,

    /// A GPS field needed for the geotag had the wrong shape, a reference
    /// character we don't know, or a zero denominator.
    GpsFieldMalformed { tag: GpsIfdTag },

    /// A GPS field needed for the geotag couldn't be read at all.
    GpsFieldUnreadable {
        tag: GpsIfdTag,
        error: ExifFieldError,
    },

    /// The decoded coordinates weren't a valid geotag.
    InvalidCoordinate(CoordinateError),
}

#[derive(Clone, Debug, PartialEq, PartialOrd, Hash)]
pub enum ExifFieldError {
    //
    // field stuff
    /// The field did not provide a tag.
    FieldNoTag,

    /// The field didn't provide a primitive type.
    FieldNoTy,

    /// Encountered an unknown type while parsing a field.
    FieldUnknownType { got: u16 },

    /// The field didn't specify how many primitives it contains.
    FieldNoCount,

    /// The field didn't provide an offset or value.
    FieldNoOffsetOrValue,

    /// The field's count was so large its size overflowed.
    FieldTooLarge { count: u32, ty: PrimitiveTy },

    //
    // value parsing stuff
    /// Couldn't parse to offset. It was likely too far (malformed).
    OffsetTooFar { offset: u32 },

    /// Couldn't parse primitive - no more data.
    OuttaData { ty: PrimitiveTy },
}

impl core::fmt::Display for ExifFatalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoByteOrderMarker { len } => {
                write!(f, "No byte order marker was found. len: `{len}`")
            }
            Self::WeirdByteOrderMarker { found } => match core::str::from_utf8(found.as_slice()) {
                Ok(found_utf8_bom) => {
                    write!(f, "Got a weird byte-order marker: `{found_utf8_bom}`")
                }
                Err(_) => write!(f, "Got a weird byte-order marker - wasn't ASCII: {found:?}"),
            },

            Self::NoTiffMagicNumber => {
                f.write_str("No TIFF magic number found - the slice was likely cut short.")
            }
            Self::MagicNumberWasntTiff { found } => {
                write!(f, "Magic number was not TIFF! got: `{found}`")
            }
            Self::NoTiffHeaderOffset => f.write_str("No TIFF header offset was found."),
            Self::HeaderOffsetBeforeHeader => f.write_str(
                "TIFF header offset asked us to move into the header. Likely a \
                broken file - cannot continue parsing.",
            ),
            Self::IfdOffsetOutOfBounds { offset } => write!(
                f,
                "An IFD was said to start past the end of the Exif blob. offset: `{offset}`"
            ),
            Self::IfdNoEntryCount => f.write_str("The IFD didn't say how many entries it has."),
            Self::IfdHadZeroFields => {
                f.write_str("The IFD told us it had zero fields, which is invalid.")
            }
            Self::IfdNoPointer => f.write_str("The IFD didn't give a pointer to the next entry."),
            Self::GpsPointerMalformed => {
                f.write_str("The GPS IFD pointer in IFD 0 wasn't a single `Long` value.")
            }
            Self::GpsFieldMalformed { tag } => write!(
                f,
                "The GPS field `{}` (tag ID: `{}`) was malformed.",
                tag.tag_name(),
                tag.tag_id()
            ),
            Self::GpsFieldUnreadable { tag, error } => write!(
                f,
                "The GPS field `{}` couldn't be read. err: {error}",
                tag.tag_name()
            ),
            Self::InvalidCoordinate(e) => {
                write!(f, "The stored coordinates aren't a valid geotag. err: {e}")
            }
        }
    }
}

impl core::fmt::Display for ExifFieldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ExifFieldError::FieldNoTag => f.write_str("The field did not provide a tag."),
            ExifFieldError::FieldNoTy => f.write_str("The field didn't provide a primitive type."),
            ExifFieldError::FieldNoCount => {
                f.write_str("The field didn't specify how many primitives it contains.")
            }
            ExifFieldError::FieldNoOffsetOrValue => {
                f.write_str("The field didn't provide an offset or value.")
            }
            ExifFieldError::FieldUnknownType { got } => write!(
                f,
                "Encountered an unknown type while parsing a field! got: {got}"
            ),
            ExifFieldError::FieldTooLarge { count, ty } => write!(
                f,
                "The field's size overflowed. count: `{count}`, ty: `{ty:?}`"
            ),

            ExifFieldError::OuttaData { ty } => write!(
                f,
                "Couldn't parse primitive - no more data in blob. ty: `{ty:?}`"
            ),
            ExifFieldError::OffsetTooFar { offset } => write!(
                f,
                "Couldn't skip to offset - no more data in blob. offset: `{offset}`"
            ),
        }
    }
}

impl core::error::Error for ExifFatalError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::GpsFieldUnreadable { error, .. } => Some(error),
            Self::InvalidCoordinate(e) => Some(e),
            _ => None,
        }
    }
}

impl core::error::Error for ExifFieldError {}
