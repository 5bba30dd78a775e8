//! # `raves_geotag`
//!
//! A library to write GPS geotags into JPEG files, and read them back out.
//!
//! A geotag is stored as Exif: a GPS IFD holding the latitude and longitude
//! as degrees, minutes, and seconds, pointed to by IFD 0. This crate builds
//! that Exif block from scratch and splices it into the JPEG's APP1 segment,
//! replacing any Exif that was already there. All other bytes in the file,
//! including XMP and the compressed image data, are copied as-is.
//!
//! ## Usage
//!
//! ```
//! use raves_geotag::Geotag;
//!
//! # let jpeg: &[u8] = &[0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9];
//! let sydney = Geotag::new(-33.8568, 151.2153).unwrap();
//! let tagged: Vec<u8> = raves_geotag::write_geotag(jpeg, &sydney).unwrap();
//!
//! let read = raves_geotag::read_geotag(&tagged).unwrap().unwrap();
//! assert!((read.latitude() - sydney.latitude()).abs() < 1e-4);
//! ```
//!
//! ## License
//!
//! This project is dual-licensed under either the Apache License 2.0 or the MIT License at your option.

#![forbid(unsafe_code)]

use crate::{error::GeotagError, magic_number::MagicNumber, providers::jpeg::Jpeg};

pub use raves_geotag_types::geotag::{CoordinateError, Geotag, LatitudeRef, LongitudeRef};

pub mod error;
pub mod exif;
pub mod magic_number;
pub mod providers;

/// A media file that can hold a geotag.
///
/// Each file format is a "provider". It borrows the file's bytes and never
/// modifies them; writing produces a new buffer.
pub trait GeotagProvider<'input>: core::fmt::Debug + Sized + Send + Sync {
    /// Scans a media file's structure.
    ///
    /// # Errors
    ///
    /// This fails if the input isn't in this provider's format, or its
    /// structure is too broken to edit safely.
    fn new(input: &'input [u8]) -> Result<Self, GeotagError>;

    /// Reads the file's geotag.
    ///
    /// This returns `Ok(None)` if the file has no geotag.
    ///
    /// # Errors
    ///
    /// This will return an error if the file's metadata is malformed or
    /// corrupted.
    fn geotag(&self) -> Result<Option<Geotag>, GeotagError>;

    /// Builds a copy of the file carrying the given geotag.
    ///
    /// Any existing Exif is replaced.
    fn with_geotag(&self, geotag: &Geotag) -> Result<Vec<u8>, GeotagError>;

    /// Builds a copy of the file without its geotag.
    ///
    /// Other metadata is kept. A file without a geotag comes back unchanged.
    fn without_geotag(&self) -> Result<Vec<u8>, GeotagError>;
}

/// Finds the format of a media file from its leading bytes.
pub fn get(input: &impl AsRef<[u8]>) -> Option<MagicNumber> {
    MagicNumber::new(input)
}

/// Writes a geotag into a JPEG, returning the new file.
///
/// The input isn't modified. On error, nothing is written anywhere.
///
/// # Errors
///
/// - [`GeotagError::UnsupportedFormat`] if the input isn't a JPEG.
/// - [`GeotagError::MalformedSegment`] if the JPEG's segments can't be
///   walked safely.
/// - [`GeotagError::EncodingOverflow`] if the Exif wouldn't fit in APP1.
pub fn write_geotag(input: &[u8], geotag: &Geotag) -> Result<Vec<u8>, GeotagError> {
    provider(input)?.with_geotag(geotag)
}

/// Reads the geotag from a JPEG.
///
/// Returns `Ok(None)` if the JPEG has no Exif, or its Exif has no complete
/// coordinate pair.
pub fn read_geotag(input: &[u8]) -> Result<Option<Geotag>, GeotagError> {
    provider(input)?.geotag()
}

/// Removes the geotag from a JPEG, returning the new file.
///
/// Only the GPS data goes. If IFD 0 held nothing but the pointer to it, the
/// whole Exif segment is removed instead. A JPEG without a geotag comes back
/// unchanged.
///
/// # Errors
///
/// Fails if the JPEG's segments or its existing Exif are too broken to edit
/// safely.
pub fn clear_geotag(input: &[u8]) -> Result<Vec<u8>, GeotagError> {
    provider(input)?.without_geotag()
}

/// Picks the provider for an input.
fn provider(input: &[u8]) -> Result<Jpeg<'_>, GeotagError> {
    match get(&input) {
        Some(magic_number) if magic_number.supports_geotags() => Jpeg::new(input),
        found => {
            log::error!("Can't geotag this file. Its format is: {found:?}");
            Err(GeotagError::UnsupportedFormat { found })
        }
    }
}

/// Internal utility methods.
pub(crate) mod util {
    /// Helper function to initialize the logger for testing.
    #[cfg(test)]
    pub fn logger() {
        _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::max())
            .format_file(true)
            .format_line_number(true)
            .try_init();
    }
}
