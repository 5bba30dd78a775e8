//! Definitions for the tags a geotag touches.
//!
//! Each IFD group gets its own key list. A geotag only needs one key from
//! IFD 0 (the pointer to the GPS IFD) and the first five keys of the GPS IFD,
//! so that's all that's listed here.
//!
//! ## Adding new tags
//!
//! Under the `make_key_list_for_group` macro for the group, add a new
//! listing:
//!
//! ```no_compile
//! make_key_list_for_group!(enum GpsIfdTag,
//!     // ...snip!
//!
//!     GPSAltitudeRef = 5 => {
//!         name: "Altitude reference",
//!         types: &[Pt::Byte],
//!         count: Pc::Known(1),
//!     },
//! );
//! ```
//!
//! Then add the tag's writer in `raves_geotag`'s GPS IFD, if it should be
//! written.

use crate::exif::{
    ifd::IfdGroup,
    primitives::{PrimitiveCount, PrimitiveTy},
};

/// Creates a "key list" for an IFD group.
///
/// These may include duplicate tag IDs from other groups.
macro_rules! make_key_list_for_group {
    (enum $enum_name:ident,
        $( $key_ident:ident = $key_tag:literal => {
            name: $tag_name:expr,
            types: $types:expr,
            count: $count:expr,
        },
    )+) => {
        #[doc = "A list of all keys known in one IFD group."]
        #[repr(u16)]
        #[non_exhaustive]
        #[derive(Clone, Copy, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
        pub enum $enum_name {
            $(
              $key_ident = $key_tag,
            )+
        }

        impl $enum_name {
            /// Returns the number of primitives this key's value may store.
            pub const fn count(&self) -> PrimitiveCount {
                match self {
                    $( Self::$key_ident => $count, )+
                }
            }

            /// Returns this key's tag ID.
            pub const fn tag_id(&self) -> u16 {
                *self as u16
            }

            /// Grabs a key's tag name as defined in the standard.
            pub const fn tag_name(&self) -> &'static str {
                match self {
                    $( Self::$key_ident => $tag_name, )+
                }
            }

            /// Returns the type(s) this key's value may have.
            pub const fn types(&self) -> &'static [PrimitiveTy] {
                match self {
                    $( Self::$key_ident => $types, )+
                }
            }
        }

        impl core::convert::TryFrom<u16> for $enum_name {
            type Error = ();

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $( $key_tag => Ok($enum_name::$key_ident), )+
                    _ => Err(()),
                }
            }
        }
    }
}

use {PrimitiveCount as Pc, PrimitiveTy as Pt};

/// A set of all known tags and their IFD groups.
#[derive(Copy, Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum KnownTag {
    Ifd0Tag(Ifd0Tag),
    GpsIfdTag(GpsIfdTag),
}

impl KnownTag {
    /// Returns the number of primitives this tag's value may store.
    pub const fn count(&self) -> PrimitiveCount {
        match self {
            KnownTag::Ifd0Tag(k) => k.count(),
            KnownTag::GpsIfdTag(k) => k.count(),
        }
    }

    /// Returns this tag's ID.
    pub const fn tag_id(&self) -> u16 {
        match self {
            KnownTag::Ifd0Tag(k) => k.tag_id(),
            KnownTag::GpsIfdTag(k) => k.tag_id(),
        }
    }

    /// Grabs the tag's name as defined in the standard.
    pub const fn tag_name(&self) -> &'static str {
        match self {
            KnownTag::Ifd0Tag(k) => k.tag_name(),
            KnownTag::GpsIfdTag(k) => k.tag_name(),
        }
    }

    /// Returns the type(s) this tag's value may have.
    pub const fn types(&self) -> &'static [PrimitiveTy] {
        match self {
            KnownTag::Ifd0Tag(k) => k.types(),
            KnownTag::GpsIfdTag(k) => k.types(),
        }
    }
}

impl TryFrom<(IfdGroup, u16)> for KnownTag {
    type Error = ();

    fn try_from((group, tag_id): (IfdGroup, u16)) -> Result<Self, Self::Error> {
        match group {
            IfdGroup::_0 => Ifd0Tag::try_from(tag_id).map(KnownTag::Ifd0Tag),
            IfdGroup::Gps => GpsIfdTag::try_from(tag_id).map(KnownTag::GpsIfdTag),
        }
    }
}

make_key_list_for_group!(enum Ifd0Tag,
    // this pointer is placed with the GPS attributes in the Exif standard,
    // but it's written into IFD 0.
    GpsInfoIfdPointer = 34853 => {
        name: "GPSInfo IFD Pointer",
        types: &[Pt::Long],
        count: Pc::Known(1),
    },
);

make_key_list_for_group!(enum GpsIfdTag,
    GPSVersionID = 0 => {
        name: "GPS tag version",
        types: &[Pt::Byte],
        count: Pc::Known(4),
    },
    GPSLatitudeRef = 1 => {
        name: "North or South Latitude",
        types: &[Pt::Ascii],
        count: Pc::Known(2),
    },
    GPSLatitude = 2 => {
        name: "Latitude",
        types: &[Pt::Rational],
        count: Pc::Known(3),
    },
    GPSLongitudeRef = 3 => {
        name: "East or West Longitude",
        types: &[Pt::Ascii],
        count: Pc::Known(2),
    },
    GPSLongitude = 4 => {
        name: "Longitude",
        types: &[Pt::Rational],
        count: Pc::Known(3),
    },
);
