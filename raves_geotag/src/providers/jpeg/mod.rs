//! JPEG is an older image format designed with old-school compression in mind.
//!
//! Its metadata lives in marker segments before the compressed image data.
//! Exif goes in an APP1 segment, so geotagging a JPEG means building a new
//! APP1 segment and splicing it in where the old one was (or right after
//! `SOI`, if there wasn't one). Everything else is copied byte for byte.

use parking_lot::RwLock;
use raves_geotag_types::geotag::Geotag;

use crate::{
    GeotagProvider,
    error::GeotagError,
    exif::{EXIF_SIG, Exif, GpsRemoval, build_exif_payload, error::ExifFatalError},
};

use self::scan::{SegmentLayout, locate_insertion_point};

mod assemble;
mod scan;

pub use assemble::MAX_APP1_PAYLOAD_LEN;
pub use scan::SegmentSpan;

/// A JPEG file.
///
/// It borrows the input and never changes it. Writing builds a new buffer.
#[derive(Debug)]
pub struct Jpeg<'input> {
    input: &'input [u8],
    layout: SegmentLayout,

    /// The decoded Exif, once someone has asked for it.
    exif: RwLock<Option<Result<Exif, ExifFatalError>>>,
}

impl<'input> Jpeg<'input> {
    /// The existing Exif APP1 segment, if any.
    pub fn exif_segment(&self) -> Option<SegmentSpan> {
        self.layout.exif
    }

    /// The raw TIFF structure inside the existing Exif segment, after its
    /// `Exif\0\0` signature.
    pub fn exif_raw(&self) -> Option<&'input [u8]> {
        self.layout
            .exif?
            .payload(self.input)?
            .strip_prefix(EXIF_SIG)
    }

    /// Decodes the existing Exif segment.
    ///
    /// This returns `None` if the file has no Exif. Decoding only happens
    /// once; later calls get the cached result.
    pub fn exif(&self) -> Option<Result<Exif, ExifFatalError>> {
        let raw = self.exif_raw()?;

        if let Some(cached) = &*self.exif.read() {
            log::trace!("Cached Exif found! Returning...");
            return Some(cached.clone());
        }

        // another thread may have decoded it between our read and write, so
        // `get_or_insert_with` only decodes when it's still empty
        let mut locked = self.exif.write();
        let decoded = locked.get_or_insert_with(|| {
            Exif::new(raw).inspect_err(|e| log::error!("Failed to parse Exif! err: {e}"))
        });
        Some(decoded.clone())
    }
}

impl<'input> GeotagProvider<'input> for Jpeg<'input> {
    fn new(input: &'input [u8]) -> Result<Self, GeotagError> {
        let layout = locate_insertion_point(input)?;
        log::trace!("JPEG layout: {layout:?}");

        Ok(Self {
            input,
            layout,
            exif: RwLock::new(None),
        })
    }

    fn geotag(&self) -> Result<Option<Geotag>, GeotagError> {
        match self.exif() {
            Some(exif) => Ok(exif?.geotag()?),
            None => {
                log::debug!("JPEG has no Exif, so it has no geotag.");
                Ok(None)
            }
        }
    }

    fn with_geotag(&self, geotag: &Geotag) -> Result<Vec<u8>, GeotagError> {
        let payload = build_exif_payload(geotag)?;
        assemble::assemble(self.input, &self.layout, &payload)
    }

    fn without_geotag(&self) -> Result<Vec<u8>, GeotagError> {
        let (Some(raw), Some(exif)) = (self.exif_raw(), self.exif()) else {
            log::debug!("JPEG has no Exif to remove. Copying it as-is.");
            return Ok(self.input.to_vec());
        };

        match exif?.without_gps(raw)? {
            GpsRemoval::NothingToRemove => {
                log::debug!("JPEG's Exif has no geotag. Copying it as-is.");
                Ok(self.input.to_vec())
            }
            GpsRemoval::RemoveBlob => assemble::without_exif(self.input, &self.layout),
            GpsRemoval::Rewritten(tiff) => {
                let mut payload = Vec::with_capacity(EXIF_SIG.len() + tiff.len());
                payload.extend_from_slice(EXIF_SIG);
                payload.extend_from_slice(&tiff);
                assemble::assemble(self.input, &self.layout, &payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use raves_geotag_types::geotag::Geotag;

    use super::{Jpeg, SegmentSpan};
    use crate::{
        GeotagProvider as _,
        exif::{EXIF_SIG, error::ExifFatalError},
        util::logger,
    };

    const NO_EXIF: &[u8] = include_bytes!("../../../assets/jpeg/jfif_no_exif.jpg");
    const CAMERA: &[u8] = include_bytes!("../../../assets/jpeg/camera_exif.jpg");
    const GPS_AND_XMP: &[u8] = include_bytes!("../../../assets/jpeg/jfif_gps_and_xmp.jpg");
    const CAMERA_WITH_GPS: &[u8] = include_bytes!("../../../assets/jpeg/camera_exif_gps.jpg");

    #[test]
    fn real_jpeg_no_meta() {
        logger();

        let jpeg = Jpeg::new(NO_EXIF).unwrap();
        assert_eq!(jpeg.exif_segment(), None);
        assert!(jpeg.exif().is_none());
        assert_eq!(jpeg.geotag(), Ok(None));
    }

    /// Camera Exif without a GPS IFD decodes fine, but has no geotag.
    #[test]
    fn camera_exif_without_gps() {
        logger();

        let jpeg = Jpeg::new(CAMERA).unwrap();
        let exif = jpeg.exif().unwrap().unwrap();
        assert_eq!(exif.gps, None);
        assert_eq!(exif.ifd0.fields.len(), 2);
        assert_eq!(jpeg.geotag(), Ok(None));
    }

    #[test]
    fn existing_big_endian_geotag() {
        logger();

        let jpeg = Jpeg::new(GPS_AND_XMP).unwrap();
        let geotag = jpeg.geotag().unwrap().unwrap();
        assert!((geotag.latitude() - 48.858_222).abs() < 1e-5);
        assert!((geotag.longitude() - 2.2945).abs() < 1e-5);

        // the second call is served from the cache
        assert_eq!(jpeg.geotag(), Ok(Some(geotag)));
    }

    #[test]
    fn writing_replaces_the_old_segment() {
        logger();

        let jpeg = Jpeg::new(CAMERA).unwrap();
        let old = jpeg.exif_segment().unwrap();

        let output = jpeg
            .with_geotag(&Geotag::new(-33.8568, 151.2153).unwrap())
            .unwrap();

        let written = Jpeg::new(&output).unwrap();
        let new = written.exif_segment().unwrap();
        assert_eq!(new.offset, old.offset);
        assert_eq!(new.len, 4 + EXIF_SIG.len() + 140);
        assert_eq!(output.len(), CAMERA.len() - old.len + new.len);
        assert_eq!(&output[new.end()..], &CAMERA[old.end()..]);

        let geotag = written.geotag().unwrap().unwrap();
        assert!((geotag.latitude() + 33.8568).abs() < 1e-6);
        assert!((geotag.longitude() - 151.2153).abs() < 1e-6);
    }

    #[test]
    fn writing_inserts_after_soi() {
        logger();

        let output = Jpeg::new(NO_EXIF)
            .unwrap()
            .with_geotag(&Geotag::new(0.0, 0.0).unwrap())
            .unwrap();

        let written = Jpeg::new(&output).unwrap();
        assert_eq!(
            written.exif_segment(),
            Some(SegmentSpan {
                offset: 2,
                len: 150
            })
        );
        assert_eq!(&output[..2], &NO_EXIF[..2]);
        assert_eq!(&output[152..], &NO_EXIF[2..]);
    }

    #[test]
    fn clearing() {
        logger();

        let jpeg = Jpeg::new(GPS_AND_XMP).unwrap();
        let cleared = jpeg.without_geotag().unwrap();
        assert_eq!(cleared.len(), GPS_AND_XMP.len() - 150);
        assert_eq!(Jpeg::new(&cleared).unwrap().geotag(), Ok(None));

        // nothing to remove
        let jpeg = Jpeg::new(NO_EXIF).unwrap();
        assert_eq!(jpeg.without_geotag().unwrap(), NO_EXIF);
    }

    /// Camera Exif without a geotag is left exactly as it was.
    #[test]
    fn clearing_keeps_camera_exif() {
        logger();

        let jpeg = Jpeg::new(CAMERA).unwrap();
        assert_eq!(jpeg.without_geotag().unwrap(), CAMERA);
    }

    /// Only the geotag goes. The rest of the Exif stays in place.
    #[test]
    fn clearing_a_geotagged_camera_jpeg() {
        logger();

        let jpeg = Jpeg::new(CAMERA_WITH_GPS).unwrap();
        assert!(jpeg.geotag().unwrap().is_some());
        let old = jpeg.exif_segment().unwrap();

        let cleared = jpeg.without_geotag().unwrap();
        assert_eq!(cleared.len(), CAMERA_WITH_GPS.len());
        assert_eq!(&cleared[..old.offset + 4], &CAMERA_WITH_GPS[..old.offset + 4]);
        assert_eq!(&cleared[old.end()..], &CAMERA_WITH_GPS[old.end()..]);

        let cleared = Jpeg::new(&cleared).unwrap();
        assert_eq!(cleared.exif_segment(), Some(old));
        assert_eq!(cleared.geotag(), Ok(None));

        let exif = cleared.exif().unwrap().unwrap();
        assert_eq!(exif.gps, None);
        assert_eq!(exif.ifd0.fields.len(), 2);
    }

    /// Broken Exif can't be cleared safely, so it's reported.
    #[test]
    fn clearing_broken_exif() {
        logger();

        let mut broken = CAMERA_WITH_GPS.to_vec();
        broken[2 + 4 + EXIF_SIG.len()] = b'X';

        let jpeg = Jpeg::new(&broken).unwrap();
        assert!(jpeg.without_geotag().is_err());
    }

    /// Broken Exif is reported, not treated as missing.
    #[test]
    fn broken_exif() {
        logger();

        let mut broken = CAMERA.to_vec();
        // the TIFF byte order marker sits after the marker, length, and sig
        broken[2 + 4 + EXIF_SIG.len()] = b'X';

        let jpeg = Jpeg::new(&broken).unwrap();
        assert_eq!(
            jpeg.exif(),
            Some(Err(ExifFatalError::WeirdByteOrderMarker { found: *b"XM" }))
        );
        assert!(jpeg.geotag().is_err());
    }
}
