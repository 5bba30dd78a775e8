//! Encodes a geotag as a little-endian TIFF structure.
//!
//! Everything is written in one pass by [`TiffWriter`]. Offsets inside a TIFF
//! structure are measured from the first byte of its header, which is also
//! the first byte of the writer's buffer, so the writer's length is always
//! the offset of whatever it writes next.
//!
//! Pointers that refer forward (the header's IFD 0 offset, and IFD 0's
//! pointer to the GPS IFD) are written as zero, then patched once their
//! target has actually been placed.

use raves_geotag_types::{
    exif::{
        Endianness,
        primitives::{PrimitiveTy, Rational},
        tags::{GpsIfdTag, Ifd0Tag, KnownTag},
    },
    geotag::{Geotag, LatitudeRef, LongitudeRef},
};

use super::{dms::Dms, ifd::IFD_ENTRY_LEN};
use crate::error::GeotagError;

/// The TIFF magic number, `42`.
pub const TIFF_MAGIC_NUMBER: u16 = 42;

/// Where the header stores the offset to IFD 0.
const HEADER_IFD0_OFFSET_POSITION: usize = 4;

/// Values of up to four bytes are stored inside the entry itself.
const INLINE_VALUE_LEN: usize = 4;

/// The version of the GPS tags we write, `2.3.0.0`.
pub const GPS_VERSION_ID: [u8; 4] = [2, 3, 0, 0];

/// One IFD entry, ready to be written.
///
/// `data` holds the entry's primitives, already encoded as little-endian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IfdEntry {
    tag: KnownTag,
    ty: PrimitiveTy,
    count: u32,
    data: Vec<u8>,
}

impl IfdEntry {
    /// Creates an entry from encoded primitives of type `ty`.
    fn new(tag: KnownTag, ty: PrimitiveTy, data: Vec<u8>) -> Result<Self, GeotagError> {
        debug_assert!(
            tag.types().contains(&ty),
            "`{}` can't hold `{ty:?}`",
            tag.tag_name()
        );
        debug_assert_eq!(
            data.len() % ty.size_bytes() as usize,
            0,
            "data should be a whole number of primitives"
        );

        let count = u32::try_from(data.len() / ty.size_bytes() as usize).map_err(|_| {
            log::error!("Entry `{}` has too many primitives to count.", tag.tag_name());
            GeotagError::EncodingOverflow {
                payload_len: data.len(),
            }
        })?;

        debug_assert!(
            tag.count().allows(count),
            "`{}` can't hold `{count}` primitives",
            tag.tag_name()
        );

        Ok(Self {
            tag,
            ty,
            count,
            data,
        })
    }

    fn bytes(tag: KnownTag, bytes: &[u8]) -> Result<Self, GeotagError> {
        Self::new(tag, PrimitiveTy::Byte, bytes.to_vec())
    }

    /// A single ASCII character plus its `NUL` terminator.
    fn ascii_char(tag: KnownTag, ch: u8) -> Result<Self, GeotagError> {
        Self::new(tag, PrimitiveTy::Ascii, vec![ch, 0])
    }

    fn long(tag: KnownTag, value: u32) -> Result<Self, GeotagError> {
        Self::new(tag, PrimitiveTy::Long, value.to_le_bytes().to_vec())
    }

    fn rationals(tag: KnownTag, rationals: &[Rational]) -> Result<Self, GeotagError> {
        let data = rationals
            .iter()
            .flat_map(|r| {
                let [a, b, c, d] = r.numerator.to_le_bytes();
                let [e, f, g, h] = r.denominator.to_le_bytes();
                [a, b, c, d, e, f, g, h]
            })
            .collect();

        Self::new(tag, PrimitiveTy::Rational, data)
    }

    /// Whether this entry's value is too large to sit inside the entry.
    fn is_out_of_line(&self) -> bool {
        self.data.len() > INLINE_VALUE_LEN
    }
}

/// IFD 0 of a geotag's Exif: one pointer to the GPS IFD, and nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MainIfd {
    /// Offset of the GPS IFD, from the start of the TIFF header.
    pub gps_ifd_offset: u32,
}

impl MainIfd {
    /// Index of the GPS pointer within the entries.
    pub const GPS_POINTER_INDEX: usize = 0;

    fn entries(&self) -> Result<[IfdEntry; 1], GeotagError> {
        Ok([IfdEntry::long(
            KnownTag::Ifd0Tag(Ifd0Tag::GpsInfoIfdPointer),
            self.gps_ifd_offset,
        )?])
    }
}

/// The GPS IFD of a geotag.
///
/// This is a fixed record, not a tag map: it always holds exactly these five
/// tags, written in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpsIfd {
    pub version_id: [u8; 4],
    pub latitude_ref: LatitudeRef,
    pub latitude: Dms,
    pub longitude_ref: LongitudeRef,
    pub longitude: Dms,
}

impl GpsIfd {
    /// Splits a geotag into the values its GPS tags hold.
    pub fn new(geotag: &Geotag) -> Self {
        Self {
            version_id: GPS_VERSION_ID,
            latitude_ref: geotag.latitude_ref(),
            latitude: Dms::from_decimal(geotag.latitude().abs()),
            longitude_ref: geotag.longitude_ref(),
            longitude: Dms::from_decimal(geotag.longitude().abs()),
        }
    }

    fn entries(&self) -> Result<[IfdEntry; 5], GeotagError> {
        let gps = KnownTag::GpsIfdTag;

        Ok([
            IfdEntry::bytes(gps(GpsIfdTag::GPSVersionID), &self.version_id)?,
            IfdEntry::ascii_char(gps(GpsIfdTag::GPSLatitudeRef), self.latitude_ref.ascii())?,
            IfdEntry::rationals(gps(GpsIfdTag::GPSLatitude), &self.latitude.to_rationals())?,
            IfdEntry::ascii_char(gps(GpsIfdTag::GPSLongitudeRef), self.longitude_ref.ascii())?,
            IfdEntry::rationals(gps(GpsIfdTag::GPSLongitude), &self.longitude.to_rationals())?,
        ])
    }
}

/// Where an IFD landed in the writer's buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrittenIfd {
    /// Offset of the IFD's entry count, from the start of the TIFF header.
    pub offset: u32,

    entry_count: usize,
}

impl WrittenIfd {
    /// Position of the value-or-offset field of the entry at `index`.
    fn value_field_position(&self, index: usize) -> usize {
        debug_assert!(index < self.entry_count, "entry index out of range");
        self.offset as usize + 2 + index * IFD_ENTRY_LEN + 8
    }
}

/// Writes a little-endian TIFF structure from front to back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TiffWriter {
    buf: Vec<u8>,
}

impl TiffWriter {
    /// Starts a new structure by writing its 8-byte header.
    ///
    /// The header's IFD 0 offset stays zero until [`TiffWriter::point_header_at`]
    /// is called.
    pub fn new() -> Self {
        let mut buf = Vec::with_capacity(160);
        buf.extend_from_slice(&Endianness::Little.byte_order_marker());
        buf.extend_from_slice(&TIFF_MAGIC_NUMBER.to_le_bytes());
        buf.extend_from_slice(&0_u32.to_le_bytes());
        Self { buf }
    }

    /// The offset the next written byte will have.
    pub fn cursor(&self) -> Result<u32, GeotagError> {
        u32::try_from(self.buf.len()).map_err(|_| {
            log::error!("TIFF structure grew past what a `u32` offset can address.");
            GeotagError::EncodingOverflow {
                payload_len: self.buf.len(),
            }
        })
    }

    /// Writes an IFD at the cursor, followed by any values that didn't fit
    /// inline.
    ///
    /// The IFD's next-IFD offset is always zero.
    pub fn write_ifd(&mut self, entries: &[IfdEntry]) -> Result<WrittenIfd, GeotagError> {
        let offset = self.cursor()?;
        let entry_count = u16::try_from(entries.len()).map_err(|_| {
            log::error!("Too many entries for one IFD. got: `{}`", entries.len());
            GeotagError::EncodingOverflow {
                payload_len: entries.len() * IFD_ENTRY_LEN,
            }
        })?;

        // out-of-line data starts right after the entry count, the entries,
        // and the next-IFD offset
        let table_len = 2 + entries.len() * IFD_ENTRY_LEN + 4;
        let mut out_of_line: Vec<u8> = Vec::new();

        log::trace!("Writing IFD with `{entry_count}` entries at offset `{offset}`.");
        self.buf.extend_from_slice(&entry_count.to_le_bytes());

        for entry in entries {
            self.buf.extend_from_slice(&entry.tag.tag_id().to_le_bytes());
            self.buf.extend_from_slice(&entry.ty.type_id().to_le_bytes());
            self.buf.extend_from_slice(&entry.count.to_le_bytes());

            if entry.is_out_of_line() {
                let data_offset = offset as usize + table_len + out_of_line.len();
                let data_offset = u32::try_from(data_offset).map_err(|_| {
                    GeotagError::EncodingOverflow {
                        payload_len: data_offset,
                    }
                })?;
                log::trace!(
                    "`{}` stored out of line at offset `{data_offset}`.",
                    entry.tag.tag_name()
                );

                self.buf.extend_from_slice(&data_offset.to_le_bytes());
                out_of_line.extend_from_slice(&entry.data);

                // values must start on a word boundary
                if out_of_line.len() % 2 == 1 {
                    out_of_line.push(0);
                }
            } else {
                let mut inline = [0_u8; INLINE_VALUE_LEN];
                inline[..entry.data.len()].copy_from_slice(&entry.data);
                self.buf.extend_from_slice(&inline);
            }
        }

        self.buf.extend_from_slice(&0_u32.to_le_bytes());
        self.buf.extend_from_slice(&out_of_line);

        Ok(WrittenIfd {
            offset,
            entry_count: entries.len(),
        })
    }

    /// Writes IFD 0 at the cursor. Its GPS pointer is left as zero.
    pub fn write_main_ifd(&mut self) -> Result<WrittenIfd, GeotagError> {
        let placeholder = MainIfd { gps_ifd_offset: 0 };
        self.write_ifd(&placeholder.entries()?)
    }

    /// Writes the GPS IFD at the cursor.
    pub fn write_gps_ifd(&mut self, gps_ifd: &GpsIfd) -> Result<WrittenIfd, GeotagError> {
        self.write_ifd(&gps_ifd.entries()?)
    }

    /// Sets the header's IFD 0 offset.
    pub fn point_header_at(&mut self, ifd0: &WrittenIfd) {
        self.patch_u32(HEADER_IFD0_OFFSET_POSITION, ifd0.offset);
    }

    /// Sets IFD 0's GPS pointer.
    pub fn point_main_ifd_at(&mut self, main_ifd: &WrittenIfd, gps_ifd: &WrittenIfd) {
        self.patch_u32(
            main_ifd.value_field_position(MainIfd::GPS_POINTER_INDEX),
            gps_ifd.offset,
        );
    }

    fn patch_u32(&mut self, position: usize, value: u32) {
        match self.buf.get_mut(position..position + 4) {
            Some(slot) => slot.copy_from_slice(&value.to_le_bytes()),
            None => unreachable!("patched positions always point into already-written IFDs"),
        }
    }

    /// Returns the finished structure.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for TiffWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes a geotag as a complete TIFF structure: header, IFD 0, then the
/// GPS IFD.
pub fn build_tiff(geotag: &Geotag) -> Result<Vec<u8>, GeotagError> {
    let gps_ifd = GpsIfd::new(geotag);
    log::debug!("Encoding GPS IFD: {gps_ifd:?}");

    let mut writer = TiffWriter::new();

    let main_ifd = writer.write_main_ifd()?;
    writer.point_header_at(&main_ifd);

    let written_gps_ifd = writer.write_gps_ifd(&gps_ifd)?;
    writer.point_main_ifd_at(&main_ifd, &written_gps_ifd);

    Ok(writer.finish())
}
