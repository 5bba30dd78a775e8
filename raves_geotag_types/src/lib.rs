//! # `raves_geotag_types`
//!
//! Shared types for `raves_geotag`.
//!
//! These don't do any parsing or writing themselves. Instead, they describe
//! the geotag value users hand to the codec, plus the small slice of the
//! Exif tag tables the codec needs to speak.

#![forbid(unsafe_code)]

pub mod exif;
pub mod geotag;
