use crate::exif::{
    primitives::{Primitive, PrimitiveTy},
    tags::KnownTag,
};

pub mod ifd;
pub mod primitives;
pub mod tags;

/// One entry in an image file directory (IFD).
///
/// It pairs a tag with the primitive(s) stored under it.
#[repr(C)]
#[derive(Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub struct Field {
    /// A number to identify the field we're talking about.
    pub tag: FieldTag,

    /// Data stored with this tag.
    ///
    /// The data also specifies the type of primitive used, and how many we're
    /// storing.
    pub data: FieldData,
}

impl Field {
    /// How many primitives are present in the field.
    pub fn count(&self) -> u32 {
        match self.data {
            FieldData::None(_) => 0_u32,
            FieldData::Primitive(_) => 1_u32,
            FieldData::List { ref list, .. } => list.len() as u32,
        }
    }

    /// Describes which primitive is stored inside.
    pub fn ty(&self) -> PrimitiveTy {
        match self.data {
            FieldData::None(primitive_ty) => primitive_ty,
            FieldData::Primitive(primitive) => primitive.ty(),
            FieldData::List { ty, .. } => ty,
        }
    }

    /// Returns the stored primitives as a slice, regardless of how many
    /// there are.
    pub fn primitives(&self) -> &[Primitive] {
        match self.data {
            FieldData::None(_) => &[],
            FieldData::Primitive(ref p) => core::slice::from_ref(p),
            FieldData::List { ref list, .. } => list.as_slice(),
        }
    }
}

/// Data associated with a field.
#[repr(C)]
#[derive(Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum FieldData {
    /// There's no primitive stored here.
    None(PrimitiveTy),

    /// Stores one primitive.
    Primitive(Primitive),

    /// Stores a number of primitives.
    List {
        /// The actual list of primitives.
        list: Vec<Primitive>,

        /// The type of primitive we're storing.
        ty: PrimitiveTy,
    },
}

/// Each blob of Exif will start with a byte order marker - its endianness.
///
/// It's either `II` (Intel, for little-endian) or `MM` (Motorola, for
/// big-endian).
///
/// `raves_geotag` always writes `II`, but it reads both.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum Endianness {
    /// `II` for Intel, little-endian.
    Little,

    /// `MM` for Motorola. Big-endian.
    Big,
}

impl Endianness {
    /// The two ASCII bytes that open a TIFF header in this byte order.
    pub const fn byte_order_marker(&self) -> [u8; 2] {
        match self {
            Endianness::Little => *b"II",
            Endianness::Big => *b"MM",
        }
    }
}

/// A tag might be known by the parser, but others may not be.
#[repr(C)]
#[derive(Copy, Clone, Debug, Hash, PartialEq, PartialOrd, Eq, Ord)]
pub enum FieldTag {
    Known(KnownTag),
    Unknown(u16),
}

impl core::fmt::Display for FieldTag {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            FieldTag::Known(known_tag) => {
                write!(
                    f,
                    "known field with name: `{}` and tag ID: `{}`",
                    known_tag.tag_name(),
                    known_tag.tag_id()
                )
            }
            FieldTag::Unknown(raw_tag) => write!(f, "unknown field with tag ID: `{raw_tag}`"),
        }
    }
}
