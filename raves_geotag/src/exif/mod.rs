//! Exif is a media metadata format primarily used by cameras.
//!
//! It's a structured binary format: a TIFF header, then a chain of IFDs
//! (Image File Directories). Each field on an IFD contains a tag ID,
//! primitive data type, and count saying how many primitives are stored.
//!
//! A geotag lives in the GPS IFD, which IFD 0 points to. This module writes
//! that structure ([`build_exif_payload`]) and reads it back
//! ([`Exif::new`], then [`Exif::geotag`]).

use raves_geotag_types::{
    exif::{
        Endianness, Field,
        ifd::IfdGroup,
        primitives::Primitive,
        tags::{GpsIfdTag, Ifd0Tag, KnownTag},
    },
    geotag::{Geotag, LatitudeRef, LongitudeRef},
};
use winnow::{
    Parser as _, Stateful,
    binary::{Endianness as WinnowEndianness, u16, u32},
    error::EmptyError,
    token::take,
};

use self::{
    dms::Dms,
    error::{ExifFatalError, ExifFatalResult},
    ifd::{Ifd, parse_ifd},
    writer::{TIFF_MAGIC_NUMBER, build_tiff},
};
use crate::error::GeotagError;

pub mod dms;
pub mod error;
mod ifd;
mod strip;
mod value;
mod writer;

pub use strip::GpsRemoval;

/// Every Exif APP1 payload starts with these six bytes.
pub const EXIF_SIG: &[u8] = b"Exif\0\0";

/// The TIFF header is eight bytes, so no IFD can start before this.
const TIFF_HEADER_LEN: u32 = 8;

/// The GPS fields a geotag is read from.
const GEOTAG_TAGS: [GpsIfdTag; 4] = [
    GpsIfdTag::GPSLatitudeRef,
    GpsIfdTag::GPSLatitude,
    GpsIfdTag::GPSLongitudeRef,
    GpsIfdTag::GPSLongitude,
];

/// Encodes a geotag as a full Exif APP1 payload: [`EXIF_SIG`], then a
/// little-endian TIFF structure holding IFD 0 and the GPS IFD.
///
/// The result is ready to follow an APP1 marker and its length field.
pub fn build_exif_payload(geotag: &Geotag) -> Result<Vec<u8>, GeotagError> {
    let tiff = build_tiff(geotag)?;

    let mut payload = Vec::with_capacity(EXIF_SIG.len() + tiff.len());
    payload.extend_from_slice(EXIF_SIG);
    payload.extend_from_slice(&tiff);

    log::debug!("Built Exif payload of `{}` bytes.", payload.len());
    Ok(payload)
}

/// Extracted information from an Exif metadata block.
///
/// Only the parts a geotag needs are kept.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Exif {
    /// The endianness of the Exif block.
    pub endianness: Endianness,

    /// IFD 0, which is always present.
    pub ifd0: Ifd,

    /// Where IFD 0 starts, from the start of the TIFF header.
    pub ifd0_offset: u32,

    /// The GPS IFD, if IFD 0 pointed to one.
    pub gps: Option<Ifd>,

    /// Where the GPS IFD starts, if there is one.
    pub gps_offset: Option<u32>,
}

impl Exif {
    /// Parses the given TIFF structure into our `Exif` structure.
    ///
    /// `blob` starts at the TIFF header, after the APP1 payload's
    /// [`EXIF_SIG`].
    pub fn new(blob: &[u8]) -> ExifFatalResult<Self> {
        let mut input: &[u8] = blob;

        // parse the endianness
        let endianness: Endianness = parse_blob_endianness(&mut input)?;

        let winnow_endianness: WinnowEndianness = match endianness {
            Endianness::Little => WinnowEndianness::Little,
            Endianness::Big => WinnowEndianness::Big,
        };

        // from here on out, everything depends on the endianness, so our
        // input is wrapped in `Stateful`
        let stateful_input = &mut Stream {
            input,
            state: State {
                endianness: winnow_endianness,
                blob,
                current_ifd: IfdGroup::_0, // we always start with IFD 0
            },
        };

        parse_tiff_magic_number(stateful_input)?;
        let ifd0_offset: u32 = parse_tiff_header_offset(stateful_input)?;

        stateful_input.input = ifd_slice(blob, ifd0_offset)?;
        let ifd0 = parse_ifd(stateful_input).inspect_err(|e| {
            log::error!("Failed to parse Exif! IFD 0 failed to parse! err: {e}")
        })?;
        log::trace!("Completed IFD 0!");

        // follow the GPS pointer, if there is one
        let Some(gps_pointer) = ifd0.field(KnownTag::Ifd0Tag(Ifd0Tag::GpsInfoIfdPointer)) else {
            log::debug!("IFD 0 has no GPS pointer.");
            return Ok(Self {
                endianness,
                ifd0,
                ifd0_offset,
                gps: None,
                gps_offset: None,
            });
        };

        let gps_offset: u32 = match gps_pointer.primitives() {
            [Primitive::Long(offset)] => *offset,
            other => {
                log::error!("GPS pointer wasn't a single `Long`. got: {other:?}");
                return Err(ExifFatalError::GpsPointerMalformed);
            }
        };
        log::trace!("Following GPS pointer to offset `{gps_offset}`.");

        stateful_input.state.current_ifd = IfdGroup::Gps;
        stateful_input.input = ifd_slice(blob, gps_offset)?;
        let gps = parse_ifd(stateful_input)?;

        Ok(Self {
            endianness,
            ifd0,
            ifd0_offset,
            gps: Some(gps),
            gps_offset: Some(gps_offset),
        })
    }

    /// Reads the geotag out of the GPS IFD.
    ///
    /// Returns `Ok(None)` when there's no GPS IFD, or when it lacks either
    /// coordinate or its reference. Other GPS fields are never looked at, so
    /// they can't stop a geotag from being read.
    pub fn geotag(&self) -> ExifFatalResult<Option<Geotag>> {
        let Some(ref gps) = self.gps else {
            return Ok(None);
        };

        for tag in GEOTAG_TAGS {
            if let Some(error) = gps.unreadable(KnownTag::GpsIfdTag(tag)) {
                log::error!("GPS field `{}` couldn't be read. err: {error}", tag.tag_name());
                return Err(ExifFatalError::GpsFieldUnreadable {
                    tag,
                    error: error.clone(),
                });
            }
        }

        let field = |tag: GpsIfdTag| gps.field(KnownTag::GpsIfdTag(tag));
        let (Some(lat_ref), Some(lat), Some(lng_ref), Some(lng)) = (
            field(GpsIfdTag::GPSLatitudeRef),
            field(GpsIfdTag::GPSLatitude),
            field(GpsIfdTag::GPSLongitudeRef),
            field(GpsIfdTag::GPSLongitude),
        ) else {
            log::debug!("GPS IFD doesn't hold a full coordinate pair.");
            return Ok(None);
        };

        let lat_ref: LatitudeRef = reference(lat_ref, GpsIfdTag::GPSLatitudeRef)?
            .try_into()
            .map_err(|_| malformed(GpsIfdTag::GPSLatitudeRef))?;
        let lng_ref: LongitudeRef = reference(lng_ref, GpsIfdTag::GPSLongitudeRef)?
            .try_into()
            .map_err(|_| malformed(GpsIfdTag::GPSLongitudeRef))?;

        let latitude = lat_ref.sign() * decimal(lat, GpsIfdTag::GPSLatitude)?;
        let longitude = lng_ref.sign() * decimal(lng, GpsIfdTag::GPSLongitude)?;
        log::trace!("Decoded coordinates: ({latitude}, {longitude})");

        Geotag::new(latitude, longitude).map(Some).map_err(|e| {
            log::error!("Stored coordinates were out of range. err: {e}");
            ExifFatalError::InvalidCoordinate(e)
        })
    }
}

fn malformed(tag: GpsIfdTag) -> ExifFatalError {
    log::error!("GPS field `{}` was malformed.", tag.tag_name());
    ExifFatalError::GpsFieldMalformed { tag }
}

/// Grabs a field's primitives, if it holds as many as its tag should.
fn shaped(field: &Field, tag: GpsIfdTag) -> ExifFatalResult<&[Primitive]> {
    if !tag.count().allows(field.count()) {
        log::error!(
            "`{}` held `{}` primitives. expected: {:?}",
            tag.tag_name(),
            field.count(),
            tag.count()
        );
        return Err(malformed(tag));
    }

    Ok(field.primitives())
}

/// Grabs the reference character of an ASCII field.
fn reference(field: &Field, tag: GpsIfdTag) -> ExifFatalResult<u8> {
    match shaped(field, tag)? {
        [Primitive::Ascii(ch), ..] => Ok(*ch),
        _ => Err(malformed(tag)),
    }
}

/// Turns a field of three rationals into absolute decimal degrees.
fn decimal(field: &Field, tag: GpsIfdTag) -> ExifFatalResult<f64> {
    let [
        Primitive::Rational(degrees),
        Primitive::Rational(minutes),
        Primitive::Rational(seconds),
    ] = shaped(field, tag)?
    else {
        return Err(malformed(tag));
    };

    Dms::decimal_from_rationals(&[*degrees, *minutes, *seconds]).ok_or_else(|| malformed(tag))
}

/// Slices the blob from an IFD's offset onward.
fn ifd_slice(blob: &[u8], offset: u32) -> ExifFatalResult<&[u8]> {
    if offset < TIFF_HEADER_LEN {
        log::error!("An IFD was placed inside the TIFF header. offset: `{offset}`");
        return Err(ExifFatalError::HeaderOffsetBeforeHeader);
    }

    blob.get(offset as usize..).ok_or_else(|| {
        log::error!(
            "IFD offset is past the end of the blob. offset: `{offset}`, len: `{}`",
            blob.len()
        );
        ExifFatalError::IfdOffsetOutOfBounds { offset }
    })
}

/// Finds the endianness of the Exif blob.
fn parse_blob_endianness(input: &mut &[u8]) -> ExifFatalResult<Endianness> {
    let input_len = input.len();

    log::trace!("Looking for the BOM bytes...");
    let bom: &[u8] = take(2_usize).parse_next(input).map_err(|_: EmptyError| {
        log::error!("Couldn't find endianness marker!");
        ExifFatalError::NoByteOrderMarker { len: input_len }
    })?;

    match *bom {
        [b'I', b'I'] => Ok(Endianness::Little).inspect(|f| log::trace!("It's LE: {f:?}")),
        [b'M', b'M'] => Ok(Endianness::Big).inspect(|f| log::trace!("It's BE: {f:?}")),

        // found a weird bom!
        [a, b] => {
            let e = ExifFatalError::WeirdByteOrderMarker { found: [a, b] };
            log::error!("Couldn't parse out Exif! err: {e}");
            Err(e)
        }

        _ => unreachable!("winnow took exactly two bytes"),
    }
}

/*
  all parsers from here on out need to know the endianness. it's stored
  inside a state struct that rides along with the stream, so there's no
  global to pass around.
*/

#[derive(Clone, Debug)]
struct State<'a> {
    current_ifd: IfdGroup,
    endianness: WinnowEndianness,
    blob: &'a [u8],
}

/// A stream of the blob wrapped with our endianness.
type Stream<'s> = Stateful<&'s [u8], State<'s>>;

/// Ensures we're working with the correct kind of file.
fn parse_tiff_magic_number(input: &mut Stream) -> ExifFatalResult<()> {
    let endianness = input.state.endianness;

    log::trace!("Getting magic number...");
    let magic_number: u16 = u16(endianness)
        .parse_next(input)
        .map_err(|_: EmptyError| {
            log::error!("Couldn't find TIFF magic number!");
            ExifFatalError::NoTiffMagicNumber
        })?;

    if magic_number != TIFF_MAGIC_NUMBER {
        log::error!("Magic number wasn't for TIFF. got: `{magic_number}`");
        return Err(ExifFatalError::MagicNumberWasntTiff {
            found: magic_number,
        });
    }

    log::trace!("Magic number was good!");
    Ok(())
}

/// Grabs the offset of IFD 0, measured from the start of the TIFF header.
///
/// It can't point back into the header itself.
fn parse_tiff_header_offset(input: &mut Stream) -> ExifFatalResult<u32> {
    let endianness = input.state.endianness;

    let offset = u32(endianness)
        .parse_next(&mut input.input)
        .map_err(|_: EmptyError| {
            log::error!("Didn't find a TIFF header offset!");
            ExifFatalError::NoTiffHeaderOffset
        })
        .inspect(|offset| log::trace!("found offset: `{offset}`"))?;

    if offset < TIFF_HEADER_LEN {
        log::error!("Exif blob placed IFD 0 inside the header! Can't continue parsing.");
        return Err(ExifFatalError::HeaderOffsetBeforeHeader);
    }

    Ok(offset)
}

#[cfg(test)]
mod tests {
    use raves_geotag_types::{
        exif::{Endianness, ifd::IfdGroup, tags::GpsIfdTag},
        geotag::Geotag,
    };
    use winnow::binary::Endianness as WinnowEndianness;

    use super::{
        EXIF_SIG, Exif, State, Stream, build_exif_payload,
        error::{ExifFatalError, ExifFieldError},
        parse_blob_endianness, parse_tiff_header_offset, parse_tiff_magic_number,
    };
    use crate::util::logger;

    /// Checks that we're able to parse endianness properly.
    #[test]
    fn endianness() {
        logger();

        assert_eq!(
            parse_blob_endianness(&mut b"II".as_slice()),
            Ok(Endianness::Little)
        );
        assert_eq!(
            parse_blob_endianness(&mut b"MM".as_slice()),
            Ok(Endianness::Big)
        );
        assert_eq!(
            parse_blob_endianness(&mut b"other".as_slice()),
            Err(ExifFatalError::WeirdByteOrderMarker { found: *b"ot" }),
            "other strings aren't indicative of endianness"
        );
        assert_eq!(
            parse_blob_endianness(&mut b"I".as_slice()),
            Err(ExifFatalError::NoByteOrderMarker { len: 1 })
        );
    }

    #[test]
    fn tiff_header_and_offset() {
        logger();

        let mut backing_bytes = Vec::new();
        backing_bytes.extend_from_slice(&42_u16.to_be_bytes());
        backing_bytes.extend_from_slice(&8_u32.to_be_bytes());

        let stream = &mut Stream {
            input: &backing_bytes,
            state: State {
                current_ifd: IfdGroup::_0,
                endianness: WinnowEndianness::Big,
                blob: &backing_bytes,
            },
        };
        assert_eq!(parse_tiff_magic_number(stream), Ok(()));
        assert_eq!(parse_tiff_header_offset(stream), Ok(8_u32));

        // offsets into the header (i.e. < 8) fail to parse
        for bad in [0_u32, 7] {
            assert_eq!(
                parse_tiff_header_offset(&mut Stream {
                    input: &bad.to_le_bytes(),
                    state: State {
                        current_ifd: IfdGroup::_0,
                        endianness: WinnowEndianness::Little,
                        blob: &backing_bytes,
                    },
                }),
                Err(ExifFatalError::HeaderOffsetBeforeHeader),
            );
        }
    }

    #[test]
    fn wrong_magic_number() {
        logger();

        assert_eq!(
            Exif::new(b"II\x2b\x00\x08\x00\x00\x00"),
            Err(ExifFatalError::MagicNumberWasntTiff { found: 43 })
        );
    }

    #[test]
    fn ifd0_past_the_end() {
        logger();

        let mut blob = Vec::new();
        blob.extend_from_slice(b"II");
        blob.extend_from_slice(&42_u16.to_le_bytes());
        blob.extend_from_slice(&500_u32.to_le_bytes());

        assert_eq!(
            Exif::new(&blob),
            Err(ExifFatalError::IfdOffsetOutOfBounds { offset: 500 })
        );
    }

    /// What we write, we can read.
    #[test]
    fn reads_back_written_payload() {
        logger();

        for (lat, lng) in [(-33.8568, 151.2153), (0.0, 0.0), (40.7128, -74.006)] {
            let payload = build_exif_payload(&Geotag::new(lat, lng).unwrap()).unwrap();
            assert!(payload.starts_with(EXIF_SIG));

            let exif = Exif::new(&payload[EXIF_SIG.len()..]).unwrap();
            assert_eq!(exif.endianness, Endianness::Little);

            let geotag = exif.geotag().unwrap().expect("geotag should be present");
            assert!((geotag.latitude() - lat).abs() < 1e-6, "{lat} vs {geotag:?}");
            assert!((geotag.longitude() - lng).abs() < 1e-6, "{lng} vs {geotag:?}");
        }
    }

    /// IFD 0 with no GPS pointer means no geotag.
    #[test]
    fn no_gps_pointer() {
        logger();

        let mut blob = Vec::new();
        blob.extend_from_slice(b"MM");
        blob.extend_from_slice(&42_u16.to_be_bytes());
        blob.extend_from_slice(&8_u32.to_be_bytes());
        blob.extend_from_slice(&1_u16.to_be_bytes());
        blob.extend_from_slice(&0x0112_u16.to_be_bytes()); // orientation
        blob.extend_from_slice(&3_u16.to_be_bytes());
        blob.extend_from_slice(&1_u32.to_be_bytes());
        blob.extend_from_slice(&[0, 1, 0, 0]);
        blob.extend_from_slice(&0_u32.to_be_bytes());

        let exif = Exif::new(&blob).unwrap();
        assert_eq!(exif.gps, None);
        assert_eq!(exif.geotag(), Ok(None));
    }

    /// A zero denominator can't become a coordinate.
    #[test]
    fn zero_denominator() {
        logger();

        let mut payload = build_exif_payload(&Geotag::new(10.0, 20.0).unwrap()).unwrap();
        let tiff_start = EXIF_SIG.len();

        // latitude's degrees denominator sits at TIFF offset 92 + 4
        payload[tiff_start + 96..tiff_start + 100].copy_from_slice(&0_u32.to_le_bytes());

        let exif = Exif::new(&payload[tiff_start..]).unwrap();
        assert_eq!(
            exif.geotag(),
            Err(ExifFatalError::GpsFieldMalformed {
                tag: GpsIfdTag::GPSLatitude
            })
        );
    }

    /// An unknown reference letter is malformed.
    #[test]
    fn bad_reference() {
        logger();

        let mut payload = build_exif_payload(&Geotag::new(10.0, 20.0).unwrap()).unwrap();
        let tiff_start = EXIF_SIG.len();

        // latitude ref is the GPS IFD's second entry; its value is inline
        let lat_ref_value = tiff_start + 26 + 2 + 12 + 8;
        assert_eq!(payload[lat_ref_value], b'N');
        payload[lat_ref_value] = b'Q';

        let exif = Exif::new(&payload[tiff_start..]).unwrap();
        assert_eq!(
            exif.geotag(),
            Err(ExifFatalError::GpsFieldMalformed {
                tag: GpsIfdTag::GPSLatitudeRef
            })
        );
    }

    /// Fields a geotag doesn't need can't stop it from being read.
    #[test]
    fn unrelated_unreadable_field() {
        logger();

        let mut payload = build_exif_payload(&Geotag::new(10.0, 20.0).unwrap()).unwrap();
        let tiff_start = EXIF_SIG.len();

        // the GPS IFD sits at 26. its first entry is `GPSVersionID`, whose
        // type we swap for `Float`, which isn't decoded
        let version_ty = tiff_start + 26 + 2 + 2;
        payload[version_ty..version_ty + 2].copy_from_slice(&11_u16.to_le_bytes());

        let exif = Exif::new(&payload[tiff_start..]).unwrap();
        let geotag = exif.geotag().unwrap().expect("coordinates are intact");
        assert!((geotag.latitude() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn unreadable_coordinate() {
        logger();

        let mut payload = build_exif_payload(&Geotag::new(10.0, 20.0).unwrap()).unwrap();
        let tiff_start = EXIF_SIG.len();

        // `GPSLatitude` is the third entry
        let lat_ty = tiff_start + 26 + 2 + 2 * 12 + 2;
        payload[lat_ty..lat_ty + 2].copy_from_slice(&11_u16.to_le_bytes());

        let exif = Exif::new(&payload[tiff_start..]).unwrap();
        assert_eq!(
            exif.geotag(),
            Err(ExifFatalError::GpsFieldUnreadable {
                tag: GpsIfdTag::GPSLatitude,
                error: ExifFieldError::FieldUnknownType { got: 11 },
            })
        );
    }

    /// A coordinate needs exactly three rationals.
    #[test]
    fn wrong_coordinate_count() {
        logger();

        let mut payload = build_exif_payload(&Geotag::new(10.0, 20.0).unwrap()).unwrap();
        let tiff_start = EXIF_SIG.len();

        // `GPSLongitude` is the fifth entry
        let lng_count = tiff_start + 26 + 2 + 4 * 12 + 4;
        payload[lng_count..lng_count + 4].copy_from_slice(&2_u32.to_le_bytes());

        let exif = Exif::new(&payload[tiff_start..]).unwrap();
        assert_eq!(
            exif.geotag(),
            Err(ExifFatalError::GpsFieldMalformed {
                tag: GpsIfdTag::GPSLongitude
            })
        );
    }
}
