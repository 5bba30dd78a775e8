//! Takes a geotag back out of existing Exif, leaving everything else alone.
//!
//! Only IFD 0's GPS pointer entry is removed from the table, so nothing else
//! moves and every other offset in the blob stays valid. The GPS IFD and the
//! data it points to are zeroed where they sit.

use core::ops::Range;

use raves_geotag_types::exif::{
    Endianness, FieldTag,
    primitives::PrimitiveTy,
    tags::{Ifd0Tag, KnownTag},
};
use winnow::{
    Parser as _,
    binary::{Endianness as WinnowEndianness, u16, u32},
    error::EmptyError,
};

use super::{
    Exif,
    error::{ExifFatalError, ExifFatalResult},
    ifd::{IFD_ENTRY_LEN, Ifd},
};

/// Values of up to four bytes sit inside their entry.
const INLINE_VALUE_LEN: usize = 4;

/// What removing a geotag does to an Exif blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpsRemoval {
    /// There's no GPS IFD, so the blob stays as it is.
    NothingToRemove,

    /// IFD 0 held nothing but the GPS pointer, so the whole blob can go.
    RemoveBlob,

    /// A copy of the blob without its GPS pointer. It's the same length as
    /// the original.
    Rewritten(Vec<u8>),
}

impl Exif {
    /// Works out how to remove the geotag from `blob`, the TIFF structure
    /// this was parsed from.
    pub fn without_gps(&self, blob: &[u8]) -> ExifFatalResult<GpsRemoval> {
        let (Some(gps), Some(gps_offset)) = (&self.gps, self.gps_offset) else {
            log::debug!("No GPS IFD to remove.");
            return Ok(GpsRemoval::NothingToRemove);
        };

        let pointer_tag = FieldTag::Known(KnownTag::Ifd0Tag(Ifd0Tag::GpsInfoIfdPointer));
        let Some(pointer_index) = self
            .ifd0
            .fields
            .iter()
            .position(|f| f.as_ref().is_ok_and(|f| f.tag == pointer_tag))
        else {
            log::error!("Found a GPS IFD, but IFD 0 has no pointer to it.");
            return Err(ExifFatalError::GpsPointerMalformed);
        };

        if self.ifd0.fields.len() == 1 {
            log::debug!("IFD 0 only holds the GPS pointer. Removing the whole blob.");
            return Ok(GpsRemoval::RemoveBlob);
        }

        let mut rewritten = blob.to_vec();

        let gps_start = gps_offset as usize;
        let mut scrubbed: Vec<Range<usize>> = vec![gps_start..gps_start + gps.table_len()];
        scrubbed.extend(out_of_line_ranges(blob, gps_start, gps, self.endianness));
        for range in scrubbed {
            log::trace!("Zeroing GPS bytes {range:?}.");
            match rewritten.get_mut(range.clone()) {
                Some(bytes) => bytes.fill(0),
                None => log::warn!("GPS bytes {range:?} are past the end of the blob."),
            }
        }

        remove_entry(
            &mut rewritten,
            self.ifd0_offset,
            &self.ifd0,
            pointer_index,
            self.endianness,
        )?;

        Ok(GpsRemoval::Rewritten(rewritten))
    }
}

/// Finds the data an IFD's entries store outside of its table.
///
/// Entries with a type we don't know are skipped, since their size can't be
/// known.
fn out_of_line_ranges(
    blob: &[u8],
    ifd_offset: usize,
    ifd: &Ifd,
    endianness: Endianness,
) -> Vec<Range<usize>> {
    let endianness = match endianness {
        Endianness::Little => WinnowEndianness::Little,
        Endianness::Big => WinnowEndianness::Big,
    };

    (0..ifd.fields.len())
        .filter_map(|index| {
            let start = Ifd::entry_offset(ifd_offset, index);
            let mut entry: &[u8] = blob.get(start..start + IFD_ENTRY_LEN)?;

            let parsed: Result<(u16, u16, u32, u32), EmptyError> = (
                u16(endianness),
                u16(endianness),
                u32(endianness),
                u32(endianness),
            )
                .parse_next(&mut entry);
            let (_tag, raw_ty, count, offset) = parsed.ok()?;

            let size = (PrimitiveTy::try_from(raw_ty).ok()?.size_bytes() as usize)
                .checked_mul(count as usize)?;

            (size > INLINE_VALUE_LEN).then(|| {
                let offset = offset as usize;
                offset..offset.saturating_add(size)
            })
        })
        .collect()
}

/// Takes one entry out of an IFD's table, moving the ones after it up.
///
/// The table's last twelve bytes are left zeroed.
fn remove_entry(
    blob: &mut [u8],
    ifd_offset: u32,
    ifd: &Ifd,
    index: usize,
    endianness: Endianness,
) -> ExifFatalResult<()> {
    let start = ifd_offset as usize;
    let table = blob
        .get_mut(start..start + ifd.table_len())
        .ok_or_else(|| {
            log::error!("IFD at `{ifd_offset}` doesn't fit in the blob.");
            ExifFatalError::IfdOffsetOutOfBounds { offset: ifd_offset }
        })?;

    // the fields came from a `u16` count, so one fewer always fits
    let remaining = (ifd.fields.len() - 1) as u16;
    let count_bytes = match endianness {
        Endianness::Little => remaining.to_le_bytes(),
        Endianness::Big => remaining.to_be_bytes(),
    };
    table[..2].copy_from_slice(&count_bytes);

    let entry = Ifd::entry_offset(0, index);
    table.copy_within(entry + IFD_ENTRY_LEN.., entry);

    let freed = table.len() - IFD_ENTRY_LEN;
    table[freed..].fill(0);

    log::debug!("Removed entry #{index} from IFD at `{ifd_offset}`. `{remaining}` left.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use raves_geotag_types::{
        exif::tags::{Ifd0Tag, KnownTag},
        geotag::Geotag,
    };

    use super::GpsRemoval;
    use crate::{
        exif::{EXIF_SIG, Exif, build_exif_payload},
        util::logger,
    };

    /// Camera Exif with `Make`, `Orientation`, and a geotag near Sydney.
    const CAMERA_WITH_GPS: &[u8] = include_bytes!("../../assets/jpeg/camera_exif_gps.jpg");

    /// Where the TIFF structure starts in that file: after `SOI`, the APP1
    /// marker and length, and the Exif signature.
    const TIFF_START: usize = 2 + 4 + 6;
    const TIFF_LEN: usize = 170;

    fn camera_tiff() -> &'static [u8] {
        &CAMERA_WITH_GPS[TIFF_START..TIFF_START + TIFF_LEN]
    }

    #[test]
    fn keeps_other_ifd0_fields() {
        logger();

        let blob = camera_tiff();
        let exif = Exif::new(blob).unwrap();
        let geotag = exif.geotag().unwrap().expect("fixture is geotagged");
        assert!((geotag.latitude() + 33.8568).abs() < 1e-6);

        let Ok(GpsRemoval::Rewritten(rewritten)) = exif.without_gps(blob) else {
            panic!("expected a rewrite");
        };
        assert_eq!(rewritten.len(), blob.len());

        let cleared = Exif::new(&rewritten).unwrap();
        assert_eq!(cleared.gps, None);
        assert_eq!(cleared.geotag(), Ok(None));
        assert_eq!(cleared.ifd0.fields.len(), 2);
        assert_eq!(
            cleared.ifd0.field(KnownTag::Ifd0Tag(Ifd0Tag::GpsInfoIfdPointer)),
            None
        );

        // one fewer entry, the next-IFD pointer moved up, and `Make` still
        // pointing at its string
        let mut expected_ifd0 = blob[..50].to_vec();
        expected_ifd0[9] = 2;
        expected_ifd0.copy_within(46..50, 34);
        expected_ifd0[38..50].fill(0);
        assert_eq!(&rewritten[..50], expected_ifd0.as_slice());
        assert_eq!(&rewritten[50..56], b"Canon\0");

        // the GPS IFD and its rationals are gone
        assert!(rewritten[56..].iter().all(|b| *b == 0));
    }

    #[test]
    fn nothing_to_remove() {
        logger();

        let camera = include_bytes!("../../assets/jpeg/camera_exif.jpg");
        let blob = &camera[TIFF_START..2 + 54];
        let exif = Exif::new(blob).unwrap();
        assert_eq!(exif.without_gps(blob), Ok(GpsRemoval::NothingToRemove));
    }

    /// What we write holds nothing but the geotag.
    #[test]
    fn geotag_only_blob_goes_away() {
        logger();

        let payload = build_exif_payload(&Geotag::new(1.0, 2.0).unwrap()).unwrap();
        let blob = &payload[EXIF_SIG.len()..];
        let exif = Exif::new(blob).unwrap();
        assert_eq!(exif.without_gps(blob), Ok(GpsRemoval::RemoveBlob));
    }
}
