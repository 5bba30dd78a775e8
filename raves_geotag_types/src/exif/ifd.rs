//! Contains stuff related to IFDs.
//!
//! For more info, see the [`IfdGroup`] enumeration.

/// An IFD is a set of keys found within a media file's Exif metadata.
///
/// IFD 0 is always present when Exif is present. Other groups hang off of it
/// through pointer tags, which work like offsets into the Exif blob rather
/// than direct embeds.
///
/// A geotag only ever needs two groups: IFD 0, to hold the pointer, and the
/// GPS IFD it points at.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub enum IfdGroup {
    /// Refers to "IFD 0", the first IFD in the blob.
    #[doc(alias = "IFD0")]
    #[doc(alias = "TIFF")]
    _0,

    /// The GPS IFD contains location metadata.
    #[doc(alias = "GPSIFD")]
    Gps,
}
