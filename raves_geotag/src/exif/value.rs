use winnow::{
    Parser as _, Stateful,
    binary::{Endianness as WinnowEndianness, i32, u8, u16, u32},
    error::EmptyError,
    token::take,
};

use super::{Stream, error::ExifFieldError};
use raves_geotag_types::exif::{
    Field, FieldData, FieldTag, ifd::IfdGroup, primitives::*, tags::KnownTag,
};

/// Values of up to four bytes sit inside the entry instead of behind an
/// offset.
const INLINE_VALUE_LEN: u32 = 4;

/// Names a raw tag ID, given the IFD it was found in.
pub fn field_tag(group: IfdGroup, raw_tag: u16) -> FieldTag {
    KnownTag::try_from((group, raw_tag))
        .map(FieldTag::Known)
        .unwrap_or(FieldTag::Unknown(raw_tag))
}

/// Parses out one entry from an IFD.
///
/// All 12 bytes of the entry are consumed before anything is validated, so a
/// bad entry never knocks the rest of its IFD out of alignment.
pub fn parse_value(input: &mut Stream) -> Result<Field, ExifFieldError> {
    let endianness = input.state.endianness;

    // tag (2 bytes)
    let raw_tag: u16 = u16(endianness)
        .parse_next(&mut input.input)
        .map_err(|_: EmptyError| ExifFieldError::FieldNoTag)?;

    // type (2 bytes)
    let raw_ty: u16 = u16(endianness)
        .parse_next(&mut input.input)
        .map_err(|_: EmptyError| ExifFieldError::FieldNoTy)?;

    // count (4 bytes)
    let count: u32 = u32(endianness)
        .parse_next(&mut input.input)
        .map_err(|_: EmptyError| ExifFieldError::FieldNoCount)?;

    // value or offset (4 bytes). we'll figure out which in a sec
    let raw_value: &[u8] = take(INLINE_VALUE_LEN as usize)
        .parse_next(&mut input.input)
        .map_err(|_: EmptyError| ExifFieldError::FieldNoOffsetOrValue)?;

    let tag: FieldTag = field_tag(input.state.current_ifd, raw_tag);

    let ty: PrimitiveTy = PrimitiveTy::try_from(raw_ty).map_err(|_| {
        log::error!("Encountered unknown field type on {tag}: `{raw_ty}`");
        ExifFieldError::FieldUnknownType { got: raw_ty }
    })?;

    log::trace!("(field info... tag: {tag}, ty: {ty:?}, count: {count}, raw value: {raw_value:x?})");

    // warn if the real type isn't an expected type
    if let FieldTag::Known(known_tag) = tag
        && !known_tag.types().contains(&ty)
    {
        log::warn!(
            "Field `{known_tag:?}` had a type mismatch! \
            Continuing parsing with wrong type anyway... \
            got: `{ty:?}`, \
            expected: {:?}",
            known_tag.types()
        );
    }

    let total_size: u32 = (ty.size_bytes() as u32).checked_mul(count).ok_or_else(|| {
        log::error!("Field size overflowed! count: `{count}`, ty: `{ty:?}`");
        ExifFieldError::FieldTooLarge { count, ty }
    })?;

    // if the data doesn't fit in the entry, the raw value is an offset from
    // the start of the TIFF header
    let data: &[u8] = if total_size > INLINE_VALUE_LEN {
        let offset: u32 = u32(endianness)
            .parse_next(&mut &*raw_value)
            .map_err(|_: EmptyError| ExifFieldError::FieldNoOffsetOrValue)?;
        log::trace!("Field data lives at offset `{offset}`.");

        // checking the full range here also keeps the list allocation below
        // bounded by the blob's size
        let start = offset as usize;
        input
            .state
            .blob
            .get(start..start.saturating_add(total_size as usize))
            .ok_or_else(|| {
                log::error!(
                    "Field said its data is stored outside the blob! \
                    offset: `{offset}`, size: `{total_size}`, blob len: `{}`",
                    input.state.blob.len()
                );
                ExifFieldError::OffsetTooFar { offset }
            })?
    } else {
        raw_value
    };

    let prim_stream = &mut PrimitiveStream {
        input: data,
        state: PrimitiveState {
            tag,
            endianness,
            count,
            ty,
        },
    };

    let field_data = match count {
        0_u32 => FieldData::None(ty),
        1_u32 => FieldData::Primitive(parse_primitive(prim_stream)?),
        _ => FieldData::List {
            list: parse_primitive_list(prim_stream)?,
            ty,
        },
    };

    Ok(Field {
        tag,
        data: field_data,
    })
}

#[derive(Clone, Debug)]
struct PrimitiveState {
    tag: FieldTag,
    endianness: WinnowEndianness,
    count: u32,
    ty: PrimitiveTy,
}
type PrimitiveStream<'s> = Stateful<&'s [u8], PrimitiveState>;

/// Parses a list of primitives.
fn parse_primitive_list(input: &mut PrimitiveStream) -> Result<Vec<Primitive>, ExifFieldError> {
    let mut v: Vec<Primitive> = Vec::with_capacity(input.state.count as usize);

    for i in 0..input.state.count {
        v.push(parse_primitive(input).inspect_err(|e| {
            log::error!(
                "Failed to create primitive #{i} on {}. err: {e}",
                input.state.tag
            )
        })?);
    }

    Ok(v)
}

/// Parses a single primitive.
fn parse_primitive(input: &mut PrimitiveStream) -> Result<Primitive, ExifFieldError> {
    let endianness = input.state.endianness;
    let ty = input.state.ty;
    let outta_data = |_: EmptyError| ExifFieldError::OuttaData { ty };

    Ok(match ty {
        PrimitiveTy::Byte => Primitive::Byte(u8.parse_next(input).map_err(outta_data)?),
        PrimitiveTy::Ascii => Primitive::Ascii(u8.parse_next(input).map_err(outta_data)?),
        PrimitiveTy::Short => {
            Primitive::Short(u16(endianness).parse_next(input).map_err(outta_data)?)
        }
        PrimitiveTy::Long => Primitive::Long(u32(endianness).parse_next(input).map_err(outta_data)?),
        PrimitiveTy::Rational => Primitive::Rational(Rational {
            numerator: u32(endianness).parse_next(input).map_err(outta_data)?,
            denominator: u32(endianness).parse_next(input).map_err(outta_data)?,
        }),
        PrimitiveTy::Undefined => {
            Primitive::Undefined(u8.parse_next(input).map_err(outta_data)?)
        }
        PrimitiveTy::SLong => {
            Primitive::SLong(i32(endianness).parse_next(input).map_err(outta_data)?)
        }
        PrimitiveTy::SRational => Primitive::SRational(SRational {
            numerator: i32(endianness).parse_next(input).map_err(outta_data)?,
            denominator: i32(endianness).parse_next(input).map_err(outta_data)?,
        }),
        PrimitiveTy::Utf8 => Primitive::Utf8(u8.parse_next(input).map_err(outta_data)?),
    })
}

#[cfg(test)]
mod tests {
    use raves_geotag_types::exif::{
        Field, FieldData, FieldTag,
        ifd::IfdGroup,
        primitives::{Primitive, PrimitiveTy, Rational},
        tags::{GpsIfdTag, KnownTag},
    };
    use winnow::binary::Endianness as WinnowEndianness;

    use crate::{
        exif::{State, Stream, error::ExifFieldError},
        util::logger,
    };

    fn stream<'a>(input: &'a [u8], blob: &'a [u8], endianness: WinnowEndianness) -> Stream<'a> {
        Stream {
            input,
            state: State {
                current_ifd: IfdGroup::Gps,
                endianness,
                blob,
            },
        }
    }

    fn entry(tag: u16, ty: u16, count: u32, value: [u8; 4]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&tag.to_le_bytes());
        v.extend_from_slice(&ty.to_le_bytes());
        v.extend_from_slice(&count.to_le_bytes());
        v.extend_from_slice(&value);
        v
    }

    /// Unknown types are rejected, but the whole entry is still consumed.
    #[test]
    fn unknown_type_consumes_the_entry() {
        logger();

        let mut bytes = entry(0, 0, 1, [0; 4]);
        bytes.extend_from_slice(b"next");

        let mut s = stream(&bytes, &bytes, WinnowEndianness::Little);
        assert_eq!(
            super::parse_value(&mut s),
            Err(ExifFieldError::FieldUnknownType { got: 0_u16 })
        );
        assert_eq!(s.input, b"next");
    }

    #[test]
    fn inline_ascii_ref() {
        logger();

        let bytes = entry(1, 2, 2, *b"S\0\0\0");
        assert_eq!(
            super::parse_value(&mut stream(&bytes, &bytes, WinnowEndianness::Little)),
            Ok(Field {
                tag: FieldTag::Known(KnownTag::GpsIfdTag(GpsIfdTag::GPSLatitudeRef)),
                data: FieldData::List {
                    list: vec![Primitive::Ascii(b'S'), Primitive::Ascii(0)],
                    ty: PrimitiveTy::Ascii,
                },
            })
        );
    }

    /// Rationals are eight bytes apiece, so they're always behind an offset.
    #[test]
    fn big_endian_rationals_behind_an_offset() {
        logger();

        let mut blob = vec![0_u8; 8];
        let mut entry = Vec::new();
        entry.extend_from_slice(&2_u16.to_be_bytes());
        entry.extend_from_slice(&5_u16.to_be_bytes());
        entry.extend_from_slice(&3_u32.to_be_bytes());
        entry.extend_from_slice(&8_u32.to_be_bytes());
        for word in [48_u32, 1, 51, 1, 296, 10] {
            blob.extend_from_slice(&word.to_be_bytes());
        }

        assert_eq!(
            super::parse_value(&mut stream(&entry, &blob, WinnowEndianness::Big)),
            Ok(Field {
                tag: FieldTag::Known(KnownTag::GpsIfdTag(GpsIfdTag::GPSLatitude)),
                data: FieldData::List {
                    list: vec![
                        Primitive::Rational(Rational::new(48, 1)),
                        Primitive::Rational(Rational::new(51, 1)),
                        Primitive::Rational(Rational::new(296, 10)),
                    ],
                    ty: PrimitiveTy::Rational,
                },
            })
        );
    }

    /// Data that starts inside the blob but runs off its end is rejected.
    #[test]
    fn offset_past_the_blob() {
        logger();

        let blob = vec![0_u8; 30];
        let bytes = entry(2, 5, 3, 20_u32.to_le_bytes());
        assert_eq!(
            super::parse_value(&mut stream(&bytes, &blob, WinnowEndianness::Little)),
            Err(ExifFieldError::OffsetTooFar { offset: 20 })
        );
    }

    /// A huge count must fail cleanly instead of allocating.
    #[test]
    fn absurd_count() {
        logger();

        let bytes = entry(666, 5, u32::MAX, 0_u32.to_le_bytes());
        assert_eq!(
            super::parse_value(&mut stream(&bytes, &bytes, WinnowEndianness::Little)),
            Err(ExifFieldError::FieldTooLarge {
                count: u32::MAX,
                ty: PrimitiveTy::Rational
            })
        );

        let bytes = entry(666, 1, u32::MAX, 0_u32.to_le_bytes());
        assert_eq!(
            super::parse_value(&mut stream(&bytes, &bytes, WinnowEndianness::Little)),
            Err(ExifFieldError::OffsetTooFar { offset: 0 })
        );
    }

    #[test]
    fn truncated_entry() {
        logger();

        let bytes = entry(1, 2, 2, *b"N\0\0\0");
        assert_eq!(
            super::parse_value(&mut stream(&bytes[..10], &bytes, WinnowEndianness::Little)),
            Err(ExifFieldError::FieldNoOffsetOrValue)
        );
    }

    #[test]
    fn zero_count() {
        logger();

        let bytes = entry(0, 1, 0, [0; 4]);
        assert_eq!(
            super::parse_value(&mut stream(&bytes, &bytes, WinnowEndianness::Little)),
            Ok(Field {
                tag: FieldTag::Known(KnownTag::GpsIfdTag(GpsIfdTag::GPSVersionID)),
                data: FieldData::None(PrimitiveTy::Byte),
            })
        );
    }
}
